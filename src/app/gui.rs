use std::sync::mpsc::channel;
use std::cell::Cell;
use crate::app::App;
use crate::app::file_dialogs;
use crate::app::converter;
use crate::app::{ConversionUpdate, FileDetail};
use crate::utils::{get_memory_usage, Logger};
use egui::{Color32, Frame, ProgressBar, Rounding, Stroke, RichText};

pub fn render(app: &mut App, ctx: &egui::Context) {
    let frame = Frame {
        fill: Color32::from_rgb(30, 30, 40),
        rounding: Rounding::same(10.0),
        stroke: Stroke::new(1.0, Color32::from_rgb(100, 200, 250)),
        inner_margin: egui::style::Margin::same(20.0),
        ..Default::default()
    };

    egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
        ui.heading(RichText::new("HEIC to JPG Converter").size(28.0).color(Color32::from_rgb(100, 200, 250)));
        ui.add_space(20.0);

        let button_width = 200.0;
        let converting = app.is_converting();
        let mut clicked = false;
        ui.add_enabled_ui(!converting, |ui| {
            clicked = ui.add_sized([button_width, 30.0], egui::Button::new("Select HEIC Files")).clicked();
        });
        if clicked {
            if let Some(files) = file_dialogs::select_heic_files() {
                app.input_files = files.clone();
                app.last_summary = None;
                let file_details: Vec<FileDetail> = files.iter().map(|path| {
                    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                    FileDetail {
                        name: path.file_name().unwrap_or_default().to_string_lossy().into_owned(),
                        original_size: size,
                        status: "Queued".to_string(),
                        output_name: None,
                        error_message: None,
                    }
                }).collect();
                *app.file_details.lock() = file_details;
                app.log_messages.lock().push(format!(
                    "[{}] {} files selected, starting conversion.",
                    chrono::Local::now().format("%H:%M:%S"),
                    files.len()
                ));
                // Selecting files starts the batch right away; the button
                // stays disabled until it completes.
                start_conversion(app);
            }
        }

        ui.add_space(10.0);

        // Selected files (scrollable table)
        ui.group(|ui| {
            ui.set_min_width(ui.available_width());
            ui.set_min_height(ui.available_height() - 220.0);
            ui.label(RichText::new("Selected Files:").size(16.0).color(Color32::from_rgb(100, 200, 250)));

            egui::ScrollArea::vertical().auto_shrink([false; 2]).show(ui, |ui| {
                egui::Grid::new("file_details_grid")
                    .num_columns(5)
                    .striped(true)
                    .show(ui, |ui| {
                        ui.label(RichText::new("#").strong());
                        ui.label(RichText::new("Name").strong());
                        ui.label(RichText::new("Size").strong());
                        ui.label(RichText::new("Output").strong());
                        ui.label(RichText::new("Status").strong());
                        ui.end_row();

                        let file_details = app.file_details.lock();
                        for (index, detail) in file_details.iter().enumerate() {
                            ui.label(format!("{}", index + 1));
                            ui.label(&detail.name);
                            ui.label(format!("{:.2} MB", detail.original_size as f64 / (1024.0 * 1024.0)));
                            ui.label(detail.output_name.as_deref().unwrap_or("-"));

                            let status_color = match detail.status.as_str() {
                                "Converted" => Color32::GREEN,
                                "Failed" => Color32::RED,
                                _ => Color32::WHITE,
                            };
                            match &detail.error_message {
                                Some(message) => {
                                    ui.label(RichText::new(&detail.status).color(status_color))
                                        .on_hover_text(message);
                                }
                                None => {
                                    ui.label(RichText::new(&detail.status).color(status_color));
                                }
                            }
                            ui.end_row();
                        }
                        drop(file_details);
                    });
            });
        });

        ui.add_space(10.0);

        // Progress and status
        ui.group(|ui| {
            ui.set_min_width(ui.available_width());

            let progress = app.conversion_progress.lock();
            if progress.total > 0 {
                let progress_ratio = progress.completed as f32 / progress.total as f32;
                ui.add(ProgressBar::new(progress_ratio).text(format!("{}/{}", progress.completed, progress.total)));
            }
            ui.label(RichText::new(&progress.status).size(16.0).color(Color32::from_rgb(200, 200, 200)));
            drop(progress);
        });

        ui.add_space(10.0);

        // Conversion Log
        ui.group(|ui| {
            ui.set_min_width(ui.available_width());
            ui.label(RichText::new("Conversion Log").size(16.0).color(Color32::from_rgb(100, 200, 250)));

            egui::ScrollArea::vertical()
                .max_height(120.0)
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    let logs = app.log_messages.lock();
                    for log in logs.iter() {
                        if log.contains("error") || log.contains("Failed") {
                            ui.label(RichText::new(log).color(Color32::RED));
                        } else {
                            ui.label(log);
                        }
                    }
                });
        });
    });
}

fn start_conversion(app: &mut App) {
    let input_files = app.input_files.clone();
    let conversion_progress = app.conversion_progress.clone();
    let log_messages = app.log_messages.clone();

    {
        let mut progress = conversion_progress.lock();
        progress.total = input_files.len();
        progress.completed = 0;
        progress.status = "Starting conversion...".to_string();
    }

    let (sender, receiver) = channel();
    app.conversion_receiver = Some(receiver);

    std::thread::spawn(move || {
        let logger = Logger::new(log_messages);
        logger.log(format!("Starting batch of {} files", input_files.len()));
        logger.log(get_memory_usage());

        // The error callback fires before the progress callback for the
        // same file, so `processed` still holds that file's index when an
        // error comes in.
        let processed = Cell::new(0usize);
        let failed = Cell::new(false);

        let progress_sender = sender.clone();
        let error_sender = sender.clone();

        let summary = converter::convert_batch(
            &input_files,
            Some(&logger),
            |done, total| {
                let index = done - 1;
                if !failed.get() {
                    let output = converter::output_path(&input_files[index]);
                    progress_sender
                        .send(ConversionUpdate::FileConverted(index, output))
                        .unwrap_or_default();
                }
                failed.set(false);
                processed.set(done);
                progress_sender
                    .send(ConversionUpdate::Progress(done, total))
                    .unwrap_or_default();
            },
            |_path, message| {
                failed.set(true);
                error_sender
                    .send(ConversionUpdate::FileFailed(processed.get(), message.to_string()))
                    .unwrap_or_default();
            },
        );

        logger.log(format!(
            "Batch complete: {} of {} files converted",
            summary.converted, summary.total
        ));
        sender
            .send(ConversionUpdate::Completed(summary.converted))
            .unwrap_or_default();
    });
}

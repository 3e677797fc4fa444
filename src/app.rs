// app.rs
pub mod gui;
pub mod converter;
pub mod file_dialogs;

use eframe::egui;
use eframe::App as EframeApp;
use std::path::PathBuf;
use std::sync::Arc;
use parking_lot::Mutex;
use std::sync::mpsc::Receiver;


pub struct App {
    // Application state
    pub input_files: Vec<PathBuf>,
    pub file_details: Arc<Mutex<Vec<FileDetail>>>,
    pub conversion_progress: Arc<Mutex<ConversionProgress>>,
    pub log_messages: Arc<Mutex<Vec<String>>>,
    pub last_summary: Option<usize>,
    pub conversion_receiver: Option<Receiver<ConversionUpdate>>,
}

#[derive(Clone)]
pub enum ConversionUpdate {
    Progress(usize, usize),            // (completed, total)
    FileConverted(usize, PathBuf),     // (index, output path)
    FileFailed(usize, String),         // (index, error message)
    Completed(usize),                  // converted count
}

pub struct ConversionProgress {
    pub total: usize,
    pub completed: usize,
    pub status: String,
}

#[derive(Clone, Debug)]
pub struct FileDetail {
    pub name: String,
    pub original_size: u64,
    pub status: String,
    pub output_name: Option<String>,
    pub error_message: Option<String>,
}

impl Default for App {
    fn default() -> Self {
        Self {
            input_files: Vec::new(),
            file_details: Arc::new(Mutex::new(Vec::new())),
            conversion_progress: Arc::new(Mutex::new(ConversionProgress {
                total: 0,
                completed: 0,
                status: String::from("Ready"),
            })),
            log_messages: Arc::new(Mutex::new(Vec::new())),
            last_summary: None,
            conversion_receiver: None,
        }
    }
}

impl App {
    /// True while a batch is running; the select button stays disabled.
    pub fn is_converting(&self) -> bool {
        self.conversion_receiver.is_some()
    }
}

impl EframeApp for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut completed = false;
        let mut needs_redraw = false;

        if let Some(receiver) = &self.conversion_receiver {
            while let Ok(update) = receiver.try_recv() {
                match update {
                    ConversionUpdate::Progress(done, total) => {
                        let mut progress = self.conversion_progress.lock();
                        progress.completed = done;
                        progress.total = total;
                        progress.status = format!("Converting: {}/{}", done, total);
                        drop(progress); // Release the lock as soon as possible
                        needs_redraw = true;
                    }
                    ConversionUpdate::FileConverted(index, output) => {
                        let mut file_details = self.file_details.lock();
                        if let Some(detail) = file_details.get_mut(index) {
                            detail.status = "Converted".to_string();
                            detail.output_name =
                                Some(output.file_name().unwrap_or_default().to_string_lossy().into_owned());
                        }
                        drop(file_details);
                        needs_redraw = true;
                    }
                    ConversionUpdate::FileFailed(index, message) => {
                        let mut file_details = self.file_details.lock();
                        if let Some(detail) = file_details.get_mut(index) {
                            detail.status = "Failed".to_string();
                            detail.error_message = Some(message);
                        }
                        drop(file_details);
                        needs_redraw = true;
                    }
                    ConversionUpdate::Completed(converted) => {
                        self.last_summary = Some(converted);
                        completed = true;
                        needs_redraw = true;
                    }
                }
            }
        }

        if completed {
            // Batch done: drop the receiver (re-enables the select button)
            // and show the final summary.
            self.conversion_receiver = None;
            let mut progress = self.conversion_progress.lock();
            let converted = self.last_summary.unwrap_or(0);
            progress.status = format!(
                "Successfully converted {} of {} files",
                converted, progress.total
            );
        }

        // Render the GUI
        gui::render(self, ctx);

        // Force a redraw if needed
        if needs_redraw {
            ctx.request_repaint();
        }
    }
}

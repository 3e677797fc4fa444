// file_dialogs.rs
use rfd::FileDialog;
use std::path::PathBuf;

pub fn select_heic_files() -> Option<Vec<PathBuf>> {
    FileDialog::new()
        .add_filter("HEIC files", &["heic", "heif"])
        .add_filter("All files", &["*"])
        .pick_files()
}

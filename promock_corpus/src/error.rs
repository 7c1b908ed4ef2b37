use std::path::PathBuf;
use thiserror::Error;

/// Why a refresh could not produce a new corpus. The previous corpus keeps
/// serving in every case.
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("Directory {} unreadable: {source}", path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No '.{extension}' snapshot files in {}", path.display())]
    NoSnapshots { path: PathBuf, extension: String },

    #[error("No valid samples in {files} snapshot file(s) under {}", path.display())]
    NoSeries { path: PathBuf, files: usize },
}

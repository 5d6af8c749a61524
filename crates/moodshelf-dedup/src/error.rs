use std::path::PathBuf;

use moodshelf_core::MoodshelfError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DedupError {
    #[error("backup of {} failed: {source}", path.display())]
    BackupFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open catalog: {0}")]
    ConnectionFailure(#[source] MoodshelfError),

    #[error("catalog query failed: {0}")]
    QueryFailure(#[source] MoodshelfError),

    #[error("deletion failed, batch rolled back: {0}")]
    DeletionFailure(String),

    #[error("failed to write report {}: {message}", path.display())]
    ReportWriteFailure { path: PathBuf, message: String },
}

impl DedupError {
    /// Everything except a report write aborts the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ReportWriteFailure { .. })
    }
}

pub type Result<T> = std::result::Result<T, DedupError>;

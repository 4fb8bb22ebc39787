use std::path::PathBuf;

use thiserror::Error;

/// Run-level failures that prevent any file from being attempted.
#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid target path: {0}")]
    InvalidTarget(String),

    #[error("Invalid tree label: {0}")]
    InvalidLabel(String),

    #[error("Could not create output tree under {path}: {source}")]
    TreeRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Audit log error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The audit record could not be written. Never reverses a materialization.
#[derive(Error, Debug)]
#[error("failed to write audit log in {}: {error}", dir.display())]
pub struct LogFailure {
    pub dir: PathBuf,
    pub error: String,
}

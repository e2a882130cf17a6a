use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that abort an analysis run.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("file not found: '{}'", path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image: {0}")]
    DecodeError(String),

    #[error("unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to write '{}': {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AnalysisError {
    pub(crate) fn decode(path: &std::path::Path, message: impl std::fmt::Display) -> Self {
        AnalysisError::DecodeError(format!("'{}': {}", path.display(), message))
    }
}

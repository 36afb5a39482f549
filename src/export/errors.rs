//! Error types of the export pipeline

use std::io;
use thiserror::Error;

use crate::codec::CodecError;

/// Failure of one unit of export work
#[derive(Debug, Error)]
pub enum ExportError {
    /// The run was stopped by the user
    #[error("Export cancelled")]
    Cancelled,
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The output frame could not be laid out
    #[error("Assembly error: {0}")]
    Assembly(String),
    /// A worker pool could not be built or a worker died
    #[error("Worker pool error: {0}")]
    Pool(String),
}

impl ExportError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExportError::Cancelled)
    }
}

pub type ExportResult<T> = Result<T, ExportError>;

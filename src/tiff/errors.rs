//! Custom error types for TIFF processing

use std::io;
use thiserror::Error;

/// TIFF-specific error types
#[derive(Debug, Error)]
pub enum TiffError {
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    /// Invalid byte order marker
    #[error("Invalid byte order marker: {0:#06x}")]
    InvalidByteOrder(u16),
    /// Invalid BigTIFF header
    #[error("Invalid BigTIFF header")]
    InvalidBigTIFFHeader,
    /// Unsupported TIFF version
    #[error("Unsupported TIFF version: {0}")]
    UnsupportedVersion(u16),
    /// Tag not found
    #[error("Tag not found: {0}")]
    TagNotFound(u16),
    /// Unsupported field type
    #[error("Unsupported field type: {0}")]
    UnsupportedFieldType(u16),
    /// Unsupported compression method
    #[error("Unsupported compression method: {0}")]
    UnsupportedCompression(u64),
    /// Unknown compression name
    #[error("Unknown compression type: {0}")]
    UnknownCompressionName(String),
    /// Pixel layout the decoder does not handle
    #[error("Unsupported sample layout: {0}")]
    UnsupportedLayout(String),
    /// Image dimensions not found
    #[error("Image dimensions not found")]
    MissingDimensions,
    /// Declared dimensions that cannot describe a real image
    #[error("Invalid image dimensions: {0}")]
    InvalidDimensions(String),
    /// Requested sub-image does not exist
    #[error("Sub-image {index} not found ({available} available)")]
    SubImageNotFound { index: usize, available: usize },
    /// Requested channel does not exist
    #[error("Channel '{0}' not found")]
    ChannelNotFound(String),
    /// Generic error with message
    #[error("TIFF error: {0}")]
    GenericError(String),
}

/// Result type for TIFF operations
pub type TiffResult<T> = Result<T, TiffError>;

impl From<String> for TiffError {
    fn from(msg: String) -> Self {
        TiffError::GenericError(msg)
    }
}

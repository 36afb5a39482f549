//! Compression handler trait definition

use crate::tiff::errors::TiffResult;

/// Strategy trait for handling different compression methods
pub trait CompressionHandler: Send + Sync {
    /// Decompress the data
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>>;

    /// Compress the data
    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>>;

    /// Canonical lowercase name, as reported by probes
    fn name(&self) -> &'static str;

    /// TIFF compression code written for this method
    fn code(&self) -> u16;
}

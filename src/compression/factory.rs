//! Factory for creating compression handlers

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;
use super::uncompressed::UncompressedHandler;
use super::deflate::AdobeDeflateHandler;
use super::zstd::ZstdHandler;

/// Factory for creating compression handlers
pub struct CompressionFactory;

impl CompressionFactory {
    /// Create a compression handler for the given TIFF compression code
    pub fn create_handler(code: u64) -> TiffResult<Box<dyn CompressionHandler>> {
        match u16::try_from(code) {
            Ok(compression::NONE) => Ok(Box::new(UncompressedHandler)),
            Ok(compression::DEFLATE) | Ok(compression::DEFLATE_OLD) => Ok(Box::new(AdobeDeflateHandler)),
            Ok(compression::ZSTD) => Ok(Box::new(ZstdHandler::new())),
            _ => Err(TiffError::UnsupportedCompression(code))
        }
    }

    /// Get a handler by user-facing name (case-insensitive, with aliases)
    pub fn get_handler_by_name(name: &str) -> TiffResult<Box<dyn CompressionHandler>> {
        match name.to_lowercase().as_str() {
            "uncompressed" | "none" => Ok(Box::new(UncompressedHandler)),
            "deflate" | "zip" | "adobe deflate" => Ok(Box::new(AdobeDeflateHandler)),
            "zstd" => Ok(Box::new(ZstdHandler::new())),
            _ => Err(TiffError::UnknownCompressionName(name.to_string()))
        }
    }

    /// Canonical name for a compression code, or `None` if unsupported
    pub fn name_for_code(code: u64) -> Option<&'static str> {
        Self::create_handler(code).ok().map(|handler| handler.name())
    }
}

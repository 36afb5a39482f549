//! Handler for Adobe Deflate compressed data

use std::io::{Read, Write};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use crate::tiff::constants::compression;
use crate::tiff::errors::TiffResult;
use super::handler::CompressionHandler;

/// Adobe Deflate (Zlib) compression handler (compression code 8)
pub struct AdobeDeflateHandler;

impl CompressionHandler for AdobeDeflateHandler {
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(data);
        let mut decompressed_data = Vec::new();
        decoder.read_to_end(&mut decompressed_data)?;
        Ok(decompressed_data)
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn name(&self) -> &'static str {
        "deflate"
    }

    fn code(&self) -> u16 {
        compression::DEFLATE
    }
}

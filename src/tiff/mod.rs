//! TIFF file format support
//!
//! Parsing, decoding and writing of classic TIFF and BigTIFF files, and the
//! `TiffCodec` that exposes them to the export pipeline.

pub mod constants;
pub mod errors;
pub mod ifd;
pub mod reader;
pub mod types;
pub mod validation;
pub mod writer;
pub mod codec;

pub use codec::TiffCodec;
pub use errors::{TiffError, TiffResult};
pub use reader::TiffReader;
pub use writer::TiffWriter;

#[cfg(test)]
mod tests;

//! Image codec abstraction
//!
//! The export pipeline never touches a file format directly; it probes,
//! reads single channel planes, writes assembled images and copies
//! containers through an `ImageCodec`. Implementations must be callable
//! from many threads at once for reads. Writes are serialized by the
//! caller (see `export::write_serializer`).

use std::io;
use std::path::Path;
use thiserror::Error;

use crate::model::{AttributeSet, ChannelFormat, FileProbe};
use crate::tiff::errors::TiffError;

/// Errors reported by codecs
#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Tiff(#[from] TiffError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Other(String),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// One decoded channel, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPlane {
    pub width: usize,
    pub height: usize,
    pub format: ChannelFormat,
    pub data: Vec<f32>,
}

/// An assembled image ready to be written
#[derive(Debug, Clone)]
pub struct OutputImage {
    pub width: usize,
    pub height: usize,
    pub channel_names: Vec<String>,
    /// Effective storage format of each channel
    pub channel_formats: Vec<ChannelFormat>,
    /// Interleaved samples, `[row][col][channel]`
    pub pixels: Vec<f32>,
    pub attributes: AttributeSet,
    pub compression: String,
}

/// File format collaborator of the export pipeline
pub trait ImageCodec: Send + Sync {
    /// Reads the metadata of a file
    fn probe(&self, path: &Path) -> CodecResult<FileProbe>;

    /// Decodes one named channel of a sub-image
    fn read_channel(&self, path: &Path, subimage: usize, channel: &str) -> CodecResult<ChannelPlane>;

    /// Encodes and writes an image, replacing any existing file
    fn write_image(&self, path: &Path, image: &OutputImage) -> CodecResult<()>;

    /// Copies the primary image of `source` to `dest` without re-encoding
    fn copy_image(&self, source: &Path, dest: &Path) -> CodecResult<()>;

    /// Whether images can be written with the named compression
    fn supports_compression(&self, name: &str) -> bool;
}

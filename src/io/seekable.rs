//! Seekable reader trait
//!
//! Combines `Read` and `Seek` so the TIFF reader can work on files and on
//! in-memory cursors alike.

use std::io::{Read, Seek};

/// Trait for readers that can both read and seek
pub trait SeekableReader: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}

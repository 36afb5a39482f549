//! I/O utilities for file handling
//!
//! Byte order strategies and the seekable reader abstraction shared by the
//! TIFF reader and the sample decoder.

pub mod seekable;
pub mod byte_order;

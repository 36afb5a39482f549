//! Core TIFF data structures

use std::fmt;

use crate::io::byte_order::ByteOrder;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;

/// A parsed TIFF file: its directories plus the container properties
#[derive(Debug)]
pub struct TiffFile {
    /// Image File Directories, one per sub-image
    pub ifds: Vec<IFD>,
    /// Whether this is a BigTIFF format
    pub is_big_tiff: bool,
    /// Byte order of the file
    pub byte_order: ByteOrder,
}

impl TiffFile {
    /// Returns the main (first) IFD if available
    pub fn main_ifd(&self) -> Option<&IFD> {
        self.ifds.first()
    }

    /// Returns the IFD for a sub-image index
    pub fn subimage(&self, index: usize) -> TiffResult<&IFD> {
        self.ifds.get(index).ok_or(TiffError::SubImageNotFound {
            index,
            available: self.ifds.len(),
        })
    }

    /// Returns the number of IFDs in the TIFF file
    pub fn ifd_count(&self) -> usize {
        self.ifds.len()
    }
}

impl fmt::Display for TiffFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TIFF File:")?;
        writeln!(f, "  Format: {}", if self.is_big_tiff { "BigTIFF" } else { "TIFF" })?;
        writeln!(f, "  Byte order: {}", self.byte_order.name())?;
        writeln!(f, "  Number of IFDs: {}", self.ifds.len())?;

        for ifd in &self.ifds {
            write!(f, "{}", ifd)?;
        }

        Ok(())
    }
}

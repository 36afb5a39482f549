//! TIFF writing
//!
//! Writing a valid TIFF requires careful management of offsets, ordering,
//! and alignment. The writer lays the file out in a single pass plan:
//! header, all IFDs, out-of-line tag data, then the image data blocks, each
//! region aligned to 4 bytes. Once every position is known the block
//! offset tags are filled in and the file is streamed out front to back.

use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::tiff::constants::{header, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{TagValue, IFD};

/// Writes TIFF and BigTIFF files, always little-endian
pub struct TiffWriter {
    is_big_tiff: bool,
}

/// Position plan of one IFD within the output file
struct IfdLayout {
    offset: u64,
    external: Vec<(u16, u64)>,
    block_offsets: Vec<u64>,
}

impl TiffWriter {
    /// Creates a writer for classic TIFF (`false`) or BigTIFF (`true`)
    pub fn new(is_big_tiff: bool) -> Self {
        TiffWriter { is_big_tiff }
    }

    /// Creates a writer whose container can hold `payload_bytes` of data
    pub fn for_payload(payload_bytes: u64) -> Self {
        // Leave headroom for directories and tag data
        Self::new(payload_bytes >= header::CLASSIC_TIFF_LIMIT - (1 << 20))
    }

    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    /// Writes `ifds` with their data `blocks` (strips or tiles) to `path`
    ///
    /// `blocks[i]` holds the encoded blocks of `ifds[i]`. The offset and byte
    /// count tags of each IFD are (re)generated from the blocks.
    pub fn write(&self, path: &Path, ifds: &[IFD], blocks: &[Vec<Vec<u8>>]) -> TiffResult<()> {
        if ifds.len() != blocks.len() {
            return Err(TiffError::GenericError(format!(
                "{} IFDs but {} block lists", ifds.len(), blocks.len())));
        }
        info!("Writing {} to {}", if self.is_big_tiff { "BigTIFF" } else { "TIFF" }, path.display());

        let mut prepared: Vec<IFD> = ifds
            .iter()
            .zip(blocks.iter())
            .map(|(ifd, ifd_blocks)| self.prepare_ifd(ifd, ifd_blocks))
            .collect();

        let layouts = self.plan_layout(&prepared, blocks)?;

        for (ifd, layout) in prepared.iter_mut().zip(layouts.iter()) {
            let offsets_tag = Self::offsets_tag(ifd);
            ifd.set(offsets_tag, self.offset_value(&layout.block_offsets));
        }

        let file = File::create(path)?;
        let mut writer = BufWriter::with_capacity(1024 * 1024, file);
        let mut position = self.write_header(&mut writer, layouts.first().map(|l| l.offset).unwrap_or(0))?;

        for (i, (ifd, layout)) in prepared.iter().zip(layouts.iter()).enumerate() {
            let next_offset = layouts.get(i + 1).map(|l| l.offset).unwrap_or(0);
            position += self.write_ifd(&mut writer, ifd, layout, next_offset)?;
        }

        for (ifd, layout) in prepared.iter().zip(layouts.iter()) {
            for (tag, offset) in &layout.external {
                position += write_padding_to(&mut writer, position, *offset)?;
                let data = ifd.get(*tag).map(TagValue::to_le_bytes).unwrap_or_default();
                writer.write_all(&data)?;
                position += data.len() as u64;
            }
        }

        for (ifd_blocks, layout) in blocks.iter().zip(layouts.iter()) {
            for (block, offset) in ifd_blocks.iter().zip(layout.block_offsets.iter()) {
                position += write_padding_to(&mut writer, position, *offset)?;
                writer.write_all(block)?;
                position += block.len() as u64;
            }
        }

        writer.flush()?;
        debug!("Wrote {} bytes to {}", position, path.display());
        Ok(())
    }

    /// Copies an IFD and installs placeholder offsets plus real byte counts
    fn prepare_ifd(&self, ifd: &IFD, ifd_blocks: &[Vec<u8>]) -> IFD {
        let mut prepared = ifd.clone();
        let offsets_tag = Self::offsets_tag(ifd);
        let counts_tag = if offsets_tag == tags::TILE_OFFSETS {
            tags::TILE_BYTE_COUNTS
        } else {
            tags::STRIP_BYTE_COUNTS
        };

        let counts: Vec<u64> = ifd_blocks.iter().map(|b| b.len() as u64).collect();
        prepared.set(counts_tag, self.offset_value(&counts));
        prepared.set(offsets_tag, self.offset_value(&vec![0; ifd_blocks.len()]));
        prepared
    }

    fn offsets_tag(ifd: &IFD) -> u16 {
        if ifd.is_tiled() { tags::TILE_OFFSETS } else { tags::STRIP_OFFSETS }
    }

    /// Offset-sized value: LONG in classic TIFF, LONG8 in BigTIFF
    fn offset_value(&self, values: &[u64]) -> TagValue {
        if self.is_big_tiff {
            TagValue::Long8s(values.to_vec())
        } else {
            TagValue::Longs(values.iter().map(|v| *v as u32).collect())
        }
    }

    fn field_len(&self) -> u64 {
        if self.is_big_tiff { 8 } else { 4 }
    }

    fn header_size(&self) -> u64 {
        if self.is_big_tiff { 16 } else { 8 }
    }

    /// Size of an IFD: entry count, entries and next IFD offset
    fn ifd_size(&self, ifd: &IFD) -> u64 {
        let entries = ifd.entry_count() as u64;
        if self.is_big_tiff {
            8 + 20 * entries + 8
        } else {
            2 + 12 * entries + 4
        }
    }

    /// Computes where every IFD, tag payload and data block goes
    fn plan_layout(&self, ifds: &[IFD], blocks: &[Vec<Vec<u8>>]) -> TiffResult<Vec<IfdLayout>> {
        let mut current = self.header_size();
        let mut layouts: Vec<IfdLayout> = ifds
            .iter()
            .map(|ifd| {
                let layout = IfdLayout { offset: current, external: Vec::new(), block_offsets: Vec::new() };
                current = align_to_4_bytes(current + self.ifd_size(ifd));
                layout
            })
            .collect();

        for (ifd, layout) in ifds.iter().zip(layouts.iter_mut()) {
            for (tag, value) in ifd.entries() {
                let len = value.to_le_bytes().len() as u64;
                if len > self.field_len() {
                    layout.external.push((tag, current));
                    current = align_to_4_bytes(current + len);
                }
            }
        }

        for (ifd_blocks, layout) in blocks.iter().zip(layouts.iter_mut()) {
            for block in ifd_blocks {
                layout.block_offsets.push(current);
                current = align_to_4_bytes(current + block.len() as u64);
            }
        }

        if !self.is_big_tiff && current > header::CLASSIC_TIFF_LIMIT {
            return Err(TiffError::GenericError(format!(
                "{} bytes exceed the classic TIFF limit; BigTIFF required", current)));
        }

        Ok(layouts)
    }

    /// Writes the header and returns the number of bytes written
    fn write_header(&self, writer: &mut impl Write, first_ifd_offset: u64) -> TiffResult<u64> {
        writer.write_all(&header::LITTLE_ENDIAN_MARKER)?;

        if self.is_big_tiff {
            writer.write_all(&header::BIG_TIFF_VERSION.to_le_bytes())?;
            writer.write_all(&header::BIGTIFF_OFFSET_SIZE.to_le_bytes())?;
            writer.write_all(&[0u8, 0])?;
            writer.write_all(&first_ifd_offset.to_le_bytes())?;
        } else {
            writer.write_all(&header::TIFF_VERSION.to_le_bytes())?;
            writer.write_all(&(first_ifd_offset as u32).to_le_bytes())?;
        }

        Ok(self.header_size())
    }

    /// Writes one IFD (padded to 4 bytes) and returns the bytes written
    fn write_ifd(&self, writer: &mut impl Write, ifd: &IFD, layout: &IfdLayout, next_offset: u64) -> TiffResult<u64> {
        let field_len = self.field_len() as usize;

        if self.is_big_tiff {
            writer.write_all(&(ifd.entry_count() as u64).to_le_bytes())?;
        } else {
            writer.write_all(&(ifd.entry_count() as u16).to_le_bytes())?;
        }

        for (tag, value) in ifd.entries() {
            writer.write_all(&tag.to_le_bytes())?;
            writer.write_all(&value.field_type().to_le_bytes())?;
            if self.is_big_tiff {
                writer.write_all(&value.count().to_le_bytes())?;
            } else {
                writer.write_all(&(value.count() as u32).to_le_bytes())?;
            }

            let mut field = match layout.external.iter().find(|(t, _)| *t == tag) {
                Some((_, offset)) => offset.to_le_bytes().to_vec(),
                None => value.to_le_bytes(),
            };
            field.resize(field_len, 0);
            writer.write_all(&field)?;
        }

        if self.is_big_tiff {
            writer.write_all(&next_offset.to_le_bytes())?;
        } else {
            writer.write_all(&(next_offset as u32).to_le_bytes())?;
        }

        let size = self.ifd_size(ifd);
        let padding = align_to_4_bytes(size) - size;
        writer.write_all(&vec![0u8; padding as usize])?;
        Ok(size + padding)
    }
}

fn align_to_4_bytes(offset: u64) -> u64 {
    (offset + 3) & !3
}

/// Pads with zeros from `position` up to `target`, returning the pad length
fn write_padding_to(writer: &mut impl Write, position: u64, target: u64) -> TiffResult<u64> {
    if target < position {
        return Err(TiffError::GenericError(format!(
            "Layout error: position {} is past target offset {}", position, target)));
    }
    let padding = target - position;
    writer.write_all(&vec![0u8; padding as usize])?;
    Ok(padding)
}

//! TIFF file reader implementation
//!
//! This module implements the TIFF/BigTIFF file reader that uses the
//! Strategy pattern to handle different byte orders. Besides parsing the
//! directory chain it can hand out the encoded strip/tile blocks of an IFD
//! verbatim (for container copies) or decode them into `f32` samples.

use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufReader, Cursor, SeekFrom};
use std::path::Path;

use crate::compression::CompressionFactory;
use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{compression, field_types, header, planar_config, predictor, sample_format, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{TagValue, IFD};
use crate::tiff::types::TiffFile;
use crate::tiff::validation;

/// Upper bound on the IFD chain length, guards against offset loops
const MAX_IFDS: usize = 100;

/// Supported pixel sample encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    /// 8-bit unsigned integer
    U8,
    /// 16-bit unsigned integer
    U16,
    /// 32-bit IEEE float
    F32,
}

impl SampleKind {
    /// Bytes used by one sample
    pub fn byte_size(&self) -> usize {
        match self {
            SampleKind::U8 => 1,
            SampleKind::U16 => 2,
            SampleKind::F32 => 4,
        }
    }

    /// Determines the sample encoding of an IFD
    ///
    /// All samples must share one bit depth; mixed depths are rejected.
    pub fn of_ifd(ifd: &IFD) -> TiffResult<Self> {
        let bits = ifd.get_tag_values(tags::BITS_PER_SAMPLE).unwrap_or_else(|| vec![1]);
        let first = bits.first().copied().unwrap_or(1);
        if bits.iter().any(|b| *b != first) {
            return Err(TiffError::UnsupportedLayout(format!("mixed bits per sample {:?}", bits)));
        }

        let format = ifd
            .get_tag_value(tags::SAMPLE_FORMAT)
            .unwrap_or(sample_format::UNSIGNED as u64);

        match (first, format) {
            (8, f) if f == sample_format::UNSIGNED as u64 => Ok(SampleKind::U8),
            (16, f) if f == sample_format::UNSIGNED as u64 => Ok(SampleKind::U16),
            (32, f) if f == sample_format::IEEEFP as u64 => Ok(SampleKind::F32),
            _ => Err(TiffError::UnsupportedLayout(format!(
                "{} bits per sample with sample format {}",
                first, format
            ))),
        }
    }
}

/// Pixel samples decoded from one IFD, interleaved per pixel
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: usize,
    pub height: usize,
    pub samples_per_pixel: usize,
    pub samples: Vec<f32>,
}

impl DecodedImage {
    /// Extracts one sample plane (row-major) from the interleaved samples
    pub fn plane(&self, sample_index: usize) -> Vec<f32> {
        self.samples
            .iter()
            .skip(sample_index)
            .step_by(self.samples_per_pixel.max(1))
            .copied()
            .collect()
    }
}

/// Reader for TIFF and BigTIFF files
pub struct TiffReader {
    /// Current byte order handler
    byte_order_handler: Option<Box<dyn ByteOrderHandler>>,
    /// Byte order of the current file
    byte_order: ByteOrder,
    /// Whether currently reading BigTIFF format
    is_big_tiff: bool,
}

impl Default for TiffReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TiffReader {
    /// Creates a new TIFF reader
    pub fn new() -> Self {
        TiffReader {
            byte_order_handler: None,
            byte_order: ByteOrder::LittleEndian,
            is_big_tiff: false,
        }
    }

    /// Opens a buffered handle on a file
    ///
    /// Every caller gets its own handle; handles are never shared.
    pub fn open_file(filepath: &Path) -> TiffResult<BufReader<File>> {
        let file = File::open(filepath)?;
        Ok(BufReader::with_capacity(1024 * 1024, file))
    }

    fn handler(&self) -> TiffResult<&dyn ByteOrderHandler> {
        self.byte_order_handler
            .as_deref()
            .ok_or_else(|| TiffError::GenericError("Byte order not yet determined".to_string()))
    }

    /// Loads the directory structure of a TIFF file from the given path
    pub fn load(&mut self, filepath: &Path) -> TiffResult<TiffFile> {
        debug!("Loading TIFF file: {}", filepath.display());
        let mut reader = Self::open_file(filepath)?;
        self.read(&mut reader)
    }

    /// Reads a TIFF file from the given reader
    ///
    /// 1. Detect byte order (little/big endian)
    /// 2. Check for TIFF or BigTIFF format
    /// 3. Read all IFDs (Image File Directories)
    pub fn read(&mut self, reader: &mut dyn SeekableReader) -> TiffResult<TiffFile> {
        reader.seek(SeekFrom::Start(0))?;

        self.byte_order = ByteOrder::detect(reader)?;
        debug!("Detected byte order: {}", self.byte_order.name());
        self.byte_order_handler = Some(self.byte_order.create_handler());

        let version = self.handler()?.read_u16(reader)?;
        self.is_big_tiff = match version {
            header::BIG_TIFF_VERSION => {
                validation::validate_bigtiff_header(reader, self.handler()?)?;
                true
            }
            header::TIFF_VERSION => false,
            _ => return Err(TiffError::UnsupportedVersion(version)),
        };

        let first_ifd_offset = self.read_offset(reader)?;
        let file_size = validation::get_file_size(reader)?;
        validation::validate_ifd_offset(first_ifd_offset, file_size)?;

        let ifds = self.read_ifd_chain(reader, first_ifd_offset, file_size)?;
        if ifds.is_empty() {
            return Err(TiffError::GenericError("No IFDs found in TIFF file".to_string()));
        }

        debug!("Read {} IFDs ({})", ifds.len(), if self.is_big_tiff { "BigTIFF" } else { "TIFF" });
        Ok(TiffFile {
            ifds,
            is_big_tiff: self.is_big_tiff,
            byte_order: self.byte_order,
        })
    }

    /// Reads an offset field (4 bytes in TIFF, 8 in BigTIFF)
    fn read_offset(&self, reader: &mut dyn SeekableReader) -> TiffResult<u64> {
        let handler = self.handler()?;
        if self.is_big_tiff {
            Ok(handler.read_u64(reader)?)
        } else {
            Ok(handler.read_u32(reader)? as u64)
        }
    }

    /// Reads a chain of IFDs starting from the given offset
    fn read_ifd_chain(&self, reader: &mut dyn SeekableReader, first_ifd_offset: u64, file_size: u64) -> TiffResult<Vec<IFD>> {
        let mut ifds = Vec::new();
        let mut ifd_offset = first_ifd_offset;

        while ifd_offset != 0 && ifds.len() < MAX_IFDS {
            if ifd_offset >= file_size {
                warn!("IFD offset {} exceeds file size {}, stopping IFD chain", ifd_offset, file_size);
                break;
            }

            let (ifd, next_offset) = match self.read_ifd(reader, ifd_offset, ifds.len(), file_size) {
                Ok(result) => result,
                Err(e) if !ifds.is_empty() => {
                    warn!("Error reading IFD {}: {}", ifds.len(), e);
                    break;
                }
                Err(e) => return Err(e),
            };

            ifds.push(ifd);

            if next_offset != 0 && (next_offset >= file_size || next_offset < 8) {
                warn!("Invalid next IFD offset: {}, stopping IFD chain", next_offset);
                break;
            }
            ifd_offset = next_offset;
        }

        Ok(ifds)
    }

    /// Reads one IFD and the offset of the next one
    ///
    /// Entries are first collected with their raw value fields, then values
    /// stored out of line are fetched, so the directory is read front to back.
    pub fn read_ifd(&self, reader: &mut dyn SeekableReader, offset: u64, number: usize, file_size: u64) -> TiffResult<(IFD, u64)> {
        reader.seek(SeekFrom::Start(offset))?;
        let handler = self.handler()?;

        let entry_count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u16(reader)? as u64
        };
        let field_len = if self.is_big_tiff { 8 } else { 4 };
        let entry_len = if self.is_big_tiff { 20 } else { 12 };
        validation::validate_data_range(offset, entry_count * entry_len, file_size, "IFD")?;

        let mut raw_entries = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let tag = handler.read_u16(reader)?;
            let field_type = handler.read_u16(reader)?;
            let count = self.read_offset(reader)?;
            let mut field = vec![0u8; field_len];
            reader.read_exact(&mut field)?;
            raw_entries.push((tag, field_type, count, field));
        }
        let next_offset = self.read_offset(reader)?;

        let mut ifd = IFD::new(number, offset);
        for (tag, field_type, count, field) in raw_entries {
            let Some(type_size) = field_type_size(field_type) else {
                warn!("Skipping tag {} with unsupported field type {}", tag, field_type);
                continue;
            };
            let total_size = type_size as u64 * count;

            let value = if total_size <= field_len as u64 {
                let mut inline = Cursor::new(field);
                self.read_value(&mut inline, field_type, count)?
            } else {
                let mut field_cursor = Cursor::new(field);
                let value_offset = self.read_offset(&mut field_cursor)?;
                validation::validate_data_range(value_offset, total_size, file_size, "Tag data")?;
                reader.seek(SeekFrom::Start(value_offset))?;
                self.read_value(reader, field_type, count)?
            };
            ifd.set(tag, value);
        }

        debug!("Read IFD #{} with {} entries", number, ifd.entry_count());
        Ok((ifd, next_offset))
    }

    /// Reads `count` values of the given field type at the current position
    fn read_value(&self, reader: &mut dyn SeekableReader, field_type: u16, count: u64) -> TiffResult<TagValue> {
        let handler = self.handler()?;
        let n = count as usize;

        let value = match field_type {
            field_types::BYTE | field_types::UNDEFINED | field_types::SBYTE | field_types::ASCII => {
                let mut buffer = vec![0u8; n];
                reader.read_exact(&mut buffer)?;
                match field_type {
                    field_types::BYTE => TagValue::Bytes(buffer),
                    field_types::UNDEFINED => TagValue::Undefined(buffer),
                    field_types::SBYTE => TagValue::SBytes(buffer.into_iter().map(|b| b as i8).collect()),
                    _ => {
                        while buffer.last() == Some(&0) {
                            buffer.pop();
                        }
                        TagValue::Ascii(String::from_utf8_lossy(&buffer).into_owned())
                    }
                }
            }
            field_types::SHORT => TagValue::Shorts(collect(n, || handler.read_u16(reader))?),
            field_types::SSHORT => TagValue::SShorts(collect(n, || handler.read_i16(reader))?),
            field_types::LONG => TagValue::Longs(collect(n, || handler.read_u32(reader))?),
            field_types::SLONG => TagValue::SLongs(collect(n, || handler.read_i32(reader))?),
            field_types::RATIONAL => TagValue::Rationals(collect(n, || handler.read_rational(reader))?),
            field_types::SRATIONAL => TagValue::SRationals(collect(n, || handler.read_srational(reader))?),
            field_types::FLOAT => TagValue::Floats(collect(n, || handler.read_f32(reader))?),
            field_types::DOUBLE => TagValue::Doubles(collect(n, || handler.read_f64(reader))?),
            field_types::LONG8 | field_types::IFD8 => TagValue::Long8s(collect(n, || handler.read_u64(reader))?),
            field_types::SLONG8 => TagValue::SLong8s(collect(n, || handler.read_u64(reader).map(|v| v as i64))?),
            other => return Err(TiffError::UnsupportedFieldType(other)),
        };

        Ok(value)
    }

    /// Returns the encoded data blocks (strips or tiles) of an IFD, untouched
    pub fn read_blocks(&self, reader: &mut dyn SeekableReader, ifd: &IFD) -> TiffResult<Vec<Vec<u8>>> {
        let (offsets_tag, counts_tag) = if ifd.is_tiled() {
            (tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)
        } else {
            (tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
        };

        let offsets = ifd.get_tag_values(offsets_tag).ok_or(TiffError::TagNotFound(offsets_tag))?;
        let counts = ifd.get_tag_values(counts_tag).ok_or(TiffError::TagNotFound(counts_tag))?;
        if offsets.len() != counts.len() {
            return Err(TiffError::GenericError(
                "Mismatch between block offsets and byte counts".to_string()));
        }

        let file_size = validation::get_file_size(reader)?;
        let mut blocks = Vec::with_capacity(offsets.len());
        for (offset, count) in offsets.iter().zip(counts.iter()) {
            validation::validate_data_range(*offset, *count, file_size, "Image block")?;
            reader.seek(SeekFrom::Start(*offset))?;
            let mut block = vec![0u8; *count as usize];
            reader.read_exact(&mut block)?;
            blocks.push(block);
        }

        Ok(blocks)
    }

    /// Decodes all pixel samples of a strip-organised, chunky IFD to `f32`
    pub fn decode_samples(&self, reader: &mut dyn SeekableReader, ifd: &IFD) -> TiffResult<DecodedImage> {
        let (width, height) = ifd.get_dimensions().ok_or(TiffError::MissingDimensions)?;
        let samples_per_pixel = ifd.get_samples_per_pixel() as usize;

        if ifd.is_tiled() {
            return Err(TiffError::UnsupportedLayout("tiled images cannot be decoded".to_string()));
        }
        let planar = ifd.get_tag_value(tags::PLANAR_CONFIGURATION).unwrap_or(planar_config::CHUNKY as u64);
        if samples_per_pixel > 1 && planar != planar_config::CHUNKY as u64 {
            return Err(TiffError::UnsupportedLayout("planar (separate) sample storage".to_string()));
        }
        let predictor = ifd.get_tag_value(tags::PREDICTOR).unwrap_or(predictor::NONE as u64);
        if predictor != predictor::NONE as u64 {
            return Err(TiffError::UnsupportedLayout(format!("predictor {}", predictor)));
        }

        let kind = SampleKind::of_ifd(ifd)?;
        let compression = ifd.get_tag_value(tags::COMPRESSION).unwrap_or(1);
        let handler = CompressionFactory::create_handler(compression)?;

        let (width, height) = (width as usize, height as usize);
        let expected = decoded_size(width, height, samples_per_pixel, kind.byte_size())?;

        // Blocks are bounded by the file size; the header values are not
        let blocks = self.read_blocks(reader, ifd)?;
        let stored: usize = blocks.iter().map(Vec::len).sum();
        if handler.code() == compression::NONE && stored < expected {
            return Err(TiffError::GenericError(format!(
                "Image data truncated: {} of {} bytes", stored, expected)));
        }

        let mut data = Vec::new();
        for block in blocks {
            data.extend_from_slice(&handler.decompress(&block)?);
            if data.len() >= expected {
                break;
            }
        }

        if data.len() < expected {
            return Err(TiffError::GenericError(format!(
                "Image data truncated: {} of {} bytes", data.len(), expected)));
        }
        data.truncate(expected);

        let samples = match kind {
            SampleKind::U8 => data.iter().map(|b| *b as f32).collect(),
            SampleKind::U16 => self.byte_order.decode_u16_samples(&data).into_iter().map(|v| v as f32).collect(),
            SampleKind::F32 => self.byte_order.decode_f32_samples(&data),
        };

        info!("Decoded {}x{} image, {} samples per pixel ({:?}, {})",
              width, height, samples_per_pixel, kind, handler.name());

        Ok(DecodedImage {
            width,
            height,
            samples_per_pixel,
            samples,
        })
    }

    /// Returns whether the current file is a BigTIFF
    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }
}

/// Byte size of a decoded image, an error if it does not fit in `usize`
pub fn decoded_size(width: usize, height: usize, samples_per_pixel: usize, sample_bytes: usize) -> TiffResult<usize> {
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(samples_per_pixel))
        .and_then(|n| n.checked_mul(sample_bytes))
        .ok_or_else(|| TiffError::InvalidDimensions(format!(
            "{}x{} with {} samples of {} bytes overflows", width, height, samples_per_pixel, sample_bytes)))
}

/// Size in bytes of one value of a field type, `None` if unknown
fn field_type_size(field_type: u16) -> Option<usize> {
    match field_type {
        field_types::BYTE | field_types::ASCII | field_types::SBYTE | field_types::UNDEFINED => Some(1),
        field_types::SHORT | field_types::SSHORT => Some(2),
        field_types::LONG | field_types::SLONG | field_types::FLOAT => Some(4),
        field_types::RATIONAL | field_types::SRATIONAL | field_types::DOUBLE => Some(8),
        field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => Some(8),
        _ => None,
    }
}

fn collect<T>(n: usize, mut read_one: impl FnMut() -> std::io::Result<T>) -> TiffResult<Vec<T>> {
    let mut values = Vec::with_capacity(n);
    for _ in 0..n {
        values.push(read_one()?);
    }
    Ok(values)
}

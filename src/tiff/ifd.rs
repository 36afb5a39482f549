//! Image File Directory (IFD) structures and methods
//!
//! An IFD describes one sub-image of a TIFF file as a set of tag entries.
//! Entries are decoded eagerly into typed `TagValue`s when read, so the
//! rest of the codec never deals with inline-vs-offset storage or the
//! byte order of the source file.

use std::collections::BTreeMap;
use std::fmt;

use log::trace;

use crate::tiff::constants::{field_types, tags};

/// A decoded tag value
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// BYTE values
    Bytes(Vec<u8>),
    /// SBYTE values
    SBytes(Vec<i8>),
    /// UNDEFINED values
    Undefined(Vec<u8>),
    /// ASCII string, without the trailing NUL
    Ascii(String),
    /// SHORT values
    Shorts(Vec<u16>),
    /// SSHORT values
    SShorts(Vec<i16>),
    /// LONG values
    Longs(Vec<u32>),
    /// SLONG values
    SLongs(Vec<i32>),
    /// RATIONAL values
    Rationals(Vec<(u32, u32)>),
    /// SRATIONAL values
    SRationals(Vec<(i32, i32)>),
    /// FLOAT values
    Floats(Vec<f32>),
    /// DOUBLE values
    Doubles(Vec<f64>),
    /// LONG8 / IFD8 values
    Long8s(Vec<u64>),
    /// SLONG8 values
    SLong8s(Vec<i64>),
}

impl TagValue {
    /// TIFF field type code for this value
    pub fn field_type(&self) -> u16 {
        match self {
            TagValue::Bytes(_) => field_types::BYTE,
            TagValue::SBytes(_) => field_types::SBYTE,
            TagValue::Undefined(_) => field_types::UNDEFINED,
            TagValue::Ascii(_) => field_types::ASCII,
            TagValue::Shorts(_) => field_types::SHORT,
            TagValue::SShorts(_) => field_types::SSHORT,
            TagValue::Longs(_) => field_types::LONG,
            TagValue::SLongs(_) => field_types::SLONG,
            TagValue::Rationals(_) => field_types::RATIONAL,
            TagValue::SRationals(_) => field_types::SRATIONAL,
            TagValue::Floats(_) => field_types::FLOAT,
            TagValue::Doubles(_) => field_types::DOUBLE,
            TagValue::Long8s(_) => field_types::LONG8,
            TagValue::SLong8s(_) => field_types::SLONG8,
        }
    }

    /// Number of values, as stored in the entry's count field
    pub fn count(&self) -> u64 {
        let count = match self {
            TagValue::Bytes(v) | TagValue::Undefined(v) => v.len(),
            TagValue::SBytes(v) => v.len(),
            // ASCII counts include the terminating NUL
            TagValue::Ascii(s) => s.len() + 1,
            TagValue::Shorts(v) => v.len(),
            TagValue::SShorts(v) => v.len(),
            TagValue::Longs(v) => v.len(),
            TagValue::SLongs(v) => v.len(),
            TagValue::Rationals(v) => v.len(),
            TagValue::SRationals(v) => v.len(),
            TagValue::Floats(v) => v.len(),
            TagValue::Doubles(v) => v.len(),
            TagValue::Long8s(v) => v.len(),
            TagValue::SLong8s(v) => v.len(),
        };
        count as u64
    }

    /// Encodes the value as little-endian bytes
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            TagValue::Bytes(v) | TagValue::Undefined(v) => out.extend_from_slice(v),
            TagValue::SBytes(v) => out.extend(v.iter().map(|b| *b as u8)),
            TagValue::Ascii(s) => {
                out.extend_from_slice(s.as_bytes());
                out.push(0);
            }
            TagValue::Shorts(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TagValue::SShorts(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TagValue::Longs(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TagValue::SLongs(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TagValue::Rationals(v) => v.iter().for_each(|(n, d)| {
                out.extend_from_slice(&n.to_le_bytes());
                out.extend_from_slice(&d.to_le_bytes());
            }),
            TagValue::SRationals(v) => v.iter().for_each(|(n, d)| {
                out.extend_from_slice(&n.to_le_bytes());
                out.extend_from_slice(&d.to_le_bytes());
            }),
            TagValue::Floats(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TagValue::Doubles(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TagValue::Long8s(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TagValue::SLong8s(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
        }
        out
    }

    /// Unsigned integer view of the value, if it is an unsigned integer type
    pub fn as_u64_vec(&self) -> Option<Vec<u64>> {
        match self {
            TagValue::Bytes(v) => Some(v.iter().map(|x| *x as u64).collect()),
            TagValue::Shorts(v) => Some(v.iter().map(|x| *x as u64).collect()),
            TagValue::Longs(v) => Some(v.iter().map(|x| *x as u64).collect()),
            TagValue::Long8s(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// String view of an ASCII value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::Ascii(s) => Some(s),
            _ => None,
        }
    }
}

/// Represents an Image File Directory (IFD) in a TIFF file
///
/// Entries are kept sorted by tag number, which is also the order the
/// TIFF format requires when the directory is written back out.
#[derive(Debug, Clone, Default)]
pub struct IFD {
    /// IFD number (0-based)
    pub number: usize,
    /// Offset to this IFD in the file it was read from (0 when built in memory)
    pub offset: u64,
    entries: BTreeMap<u16, TagValue>,
}

impl IFD {
    /// Creates a new, empty IFD
    pub fn new(number: usize, offset: u64) -> Self {
        Self {
            number,
            offset,
            entries: BTreeMap::new(),
        }
    }

    /// Sets (or replaces) the value of a tag
    pub fn set(&mut self, tag: u16, value: TagValue) {
        trace!("IFD #{}: set tag {} ({} values)", self.number, tag, value.count());
        self.entries.insert(tag, value);
    }

    /// Removes a tag, returning its previous value
    pub fn remove(&mut self, tag: u16) -> Option<TagValue> {
        self.entries.remove(&tag)
    }

    /// Gets the decoded value of a tag
    pub fn get(&self, tag: u16) -> Option<&TagValue> {
        self.entries.get(&tag)
    }

    /// Checks if this IFD has a specific tag
    pub fn has_tag(&self, tag: u16) -> bool {
        self.entries.contains_key(&tag)
    }

    /// Gets the first value of an unsigned integer tag
    pub fn get_tag_value(&self, tag: u16) -> Option<u64> {
        self.get_tag_values(tag).and_then(|values| values.first().copied())
    }

    /// Gets all values of an unsigned integer tag
    pub fn get_tag_values(&self, tag: u16) -> Option<Vec<u64>> {
        self.entries.get(&tag).and_then(TagValue::as_u64_vec)
    }

    /// Gets the value of an ASCII tag
    pub fn get_ascii(&self, tag: u16) -> Option<&str> {
        self.entries.get(&tag).and_then(TagValue::as_str)
    }

    /// Gets the dimensions of the image described by this IFD
    pub fn get_dimensions(&self) -> Option<(u64, u64)> {
        let width = self.get_tag_value(tags::IMAGE_WIDTH)?;
        let height = self.get_tag_value(tags::IMAGE_LENGTH)?;
        Some((width, height))
    }

    /// Returns number of samples per pixel (default 1 if not specified)
    pub fn get_samples_per_pixel(&self) -> u64 {
        self.get_tag_value(tags::SAMPLES_PER_PIXEL).unwrap_or(1)
    }

    /// Whether image data is organised in tiles rather than strips
    pub fn is_tiled(&self) -> bool {
        self.has_tag(tags::TILE_OFFSETS)
    }

    /// Iterates over entries in ascending tag order
    pub fn entries(&self) -> impl Iterator<Item = (u16, &TagValue)> {
        self.entries.iter().map(|(tag, value)| (*tag, value))
    }

    /// Gets the number of entries in this IFD
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for IFD {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD #{} (offset: {})", self.number, self.offset)?;
        writeln!(f, "  Number of entries: {}", self.entries.len())?;

        if let Some((width, height)) = self.get_dimensions() {
            writeln!(f, "  Dimensions: {}x{}", width, height)?;
        }

        writeln!(f, "  Samples per pixel: {}", self.get_samples_per_pixel())
    }
}

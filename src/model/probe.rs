//! Probed metadata of an image file
//!
//! A probe describes what a file contains without holding any pixel data:
//! the channels of each sub-image, the container attributes and the
//! compression of the primary sub-image.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::attributes::AttributeSet;

/// Storage format of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelFormat {
    Uint8,
    Uint16,
    Float,
}

impl ChannelFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ChannelFormat::Uint8 => "uint8",
            ChannelFormat::Uint16 => "uint16",
            ChannelFormat::Float => "float",
        }
    }

    /// Bytes per sample
    pub fn byte_size(&self) -> usize {
        match self {
            ChannelFormat::Uint8 => 1,
            ChannelFormat::Uint16 => 2,
            ChannelFormat::Float => 4,
        }
    }

    /// The format able to hold every format in `formats`
    ///
    /// Variants are declared narrowest first, so this is the maximum.
    /// An empty input yields `Float`.
    pub fn widest(formats: impl IntoIterator<Item = ChannelFormat>) -> ChannelFormat {
        formats.into_iter().max().unwrap_or(ChannelFormat::Float)
    }
}

impl fmt::Display for ChannelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChannelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uint8" | "u8" => Ok(ChannelFormat::Uint8),
            "uint16" | "u16" => Ok(ChannelFormat::Uint16),
            "float" | "f32" => Ok(ChannelFormat::Float),
            other => Err(format!("Unknown channel format: {}", other)),
        }
    }
}

/// One channel of a sub-image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub name: String,
    pub format: ChannelFormat,
}

/// Dimensions and channel list of one sub-image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubImageProbe {
    pub width: usize,
    pub height: usize,
    pub channels: Vec<ChannelSpec>,
}

impl SubImageProbe {
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelSpec> {
        self.channels.iter().find(|c| c.name == name)
    }
}

/// Metadata of one probed file
#[derive(Debug, Clone, PartialEq)]
pub struct FileProbe {
    pub path: PathBuf,
    pub subimages: Vec<SubImageProbe>,
    pub attributes: AttributeSet,
    /// Canonical compression name of the primary sub-image
    pub compression: String,
}

impl FileProbe {
    /// The primary (first) sub-image
    pub fn main_subimage(&self) -> Option<&SubImageProbe> {
        self.subimages.first()
    }

    pub fn subimage(&self, index: usize) -> Option<&SubImageProbe> {
        self.subimages.get(index)
    }
}

impl fmt::Display for FileProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File: {}", self.path.display())?;
        writeln!(f, "Compression: {}", self.compression)?;
        for (index, sub) in self.subimages.iter().enumerate() {
            writeln!(f, "Sub-image {}: {}x{}", index, sub.width, sub.height)?;
            for channel in &sub.channels {
                writeln!(f, "  {} ({})", channel.name, channel.format)?;
            }
        }
        if !self.attributes.is_empty() {
            writeln!(f, "Attributes:")?;
            write!(f, "{}", self.attributes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widest_format() {
        assert_eq!(ChannelFormat::widest([ChannelFormat::Uint8, ChannelFormat::Uint16]), ChannelFormat::Uint16);
        assert_eq!(ChannelFormat::widest([ChannelFormat::Float, ChannelFormat::Uint8]), ChannelFormat::Float);
        assert_eq!(ChannelFormat::widest([]), ChannelFormat::Float);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("UINT16".parse::<ChannelFormat>(), Ok(ChannelFormat::Uint16));
        assert!("half".parse::<ChannelFormat>().is_err());
    }
}

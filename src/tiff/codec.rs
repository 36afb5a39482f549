//! `ImageCodec` implementation backed by the TIFF reader and writer

use log::{debug, warn};
use std::path::Path;

use crate::codec::{ChannelPlane, CodecError, CodecResult, ImageCodec, OutputImage};
use crate::compression::CompressionFactory;
use crate::io::byte_order::ByteOrder;
use crate::model::{AttributeSet, ChannelFormat, ChannelSpec, FileProbe, SubImageProbe};
use crate::tiff::constants::{compression, extra_samples, photometric, planar_config, sample_format, tags};
use crate::tiff::errors::TiffError;
use crate::tiff::ifd::{TagValue, IFD};
use crate::tiff::reader::{decoded_size, SampleKind, TiffReader};
use crate::tiff::writer::TiffWriter;

/// ASCII tags exposed as container attributes
const ATTRIBUTE_TAGS: [(u16, &str); 10] = [
    (tags::DOCUMENT_NAME, "DocumentName"),
    (tags::IMAGE_DESCRIPTION, "ImageDescription"),
    (tags::MAKE, "Make"),
    (tags::MODEL, "Model"),
    (tags::PAGE_NAME, "PageName"),
    (tags::SOFTWARE, "Software"),
    (tags::DATE_TIME, "DateTime"),
    (tags::ARTIST, "Artist"),
    (tags::HOST_COMPUTER, "HostComputer"),
    (tags::COPYRIGHT, "Copyright"),
];

/// Tags holding offsets into the source file that a copy cannot carry over
const POINTER_TAGS: [u16; 3] = [tags::SUB_IFDS, tags::EXIF_IFD, tags::GPS_IFD];

/// Reads and writes strip-organised TIFF/BigTIFF files
#[derive(Debug, Default, Clone, Copy)]
pub struct TiffCodec;

impl TiffCodec {
    pub fn new() -> Self {
        TiffCodec
    }

    /// Channel names stored in the file, or derived from the sample count
    fn channel_names(ifd: &IFD) -> Vec<String> {
        let samples = ifd.get_samples_per_pixel() as usize;
        if let Some(stored) = ifd.get_ascii(tags::CHANNEL_NAMES) {
            let names: Vec<String> = stored.split(',').map(|n| n.trim().to_string()).collect();
            if names.len() == samples {
                return names;
            }
            warn!("Channel name tag lists {} names for {} samples, using defaults", names.len(), samples);
        }
        Self::default_channel_names(samples)
    }

    fn default_channel_names(samples: usize) -> Vec<String> {
        let names: &[&str] = match samples {
            1 => &["Y"],
            2 => &["Y", "A"],
            3 => &["R", "G", "B"],
            4 => &["R", "G", "B", "A"],
            _ => &[],
        };
        if names.is_empty() {
            (0..samples).map(|i| format!("channel{}", i)).collect()
        } else {
            names.iter().map(|n| n.to_string()).collect()
        }
    }

    fn probe_subimage(ifd: &IFD) -> CodecResult<SubImageProbe> {
        let (width, height) = ifd.get_dimensions().ok_or(TiffError::MissingDimensions)?;
        let format = match SampleKind::of_ifd(ifd)? {
            SampleKind::U8 => ChannelFormat::Uint8,
            SampleKind::U16 => ChannelFormat::Uint16,
            SampleKind::F32 => ChannelFormat::Float,
        };
        let channels = Self::channel_names(ifd)
            .into_iter()
            .map(|name| ChannelSpec { name, format })
            .collect();

        Ok(SubImageProbe {
            width: width as usize,
            height: height as usize,
            channels,
        })
    }

    fn attributes(ifd: &IFD) -> AttributeSet {
        ATTRIBUTE_TAGS
            .iter()
            .filter_map(|(tag, name)| ifd.get_ascii(*tag).map(|value| (*name, value)))
            .collect()
    }

    /// Encodes interleaved samples in the given format, little-endian
    fn encode_samples(pixels: &[f32], format: ChannelFormat) -> Vec<u8> {
        let mut out = Vec::with_capacity(pixels.len() * format.byte_size());
        match format {
            ChannelFormat::Uint8 => {
                out.extend(pixels.iter().map(|v| v.clamp(0.0, u8::MAX as f32).round() as u8));
            }
            ChannelFormat::Uint16 => {
                for v in pixels {
                    let sample = v.clamp(0.0, u16::MAX as f32).round() as u16;
                    out.extend_from_slice(&sample.to_le_bytes());
                }
            }
            ChannelFormat::Float => {
                for v in pixels {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            }
        }
        out
    }

    /// Builds the directory describing an output image
    fn build_ifd(image: &OutputImage, format: ChannelFormat, compression_code: u16) -> IFD {
        let samples = image.channel_names.len();
        let mut ifd = IFD::new(0, 0);

        let (photometric, base) = if samples >= 3 {
            (photometric::RGB, 3)
        } else {
            (photometric::BLACK_IS_ZERO, 1)
        };
        let (bits, sample_format) = match format {
            ChannelFormat::Uint8 => (8, sample_format::UNSIGNED),
            ChannelFormat::Uint16 => (16, sample_format::UNSIGNED),
            ChannelFormat::Float => (32, sample_format::IEEEFP),
        };

        ifd.set(tags::NEW_SUBFILE_TYPE, TagValue::Longs(vec![0]));
        ifd.set(tags::IMAGE_WIDTH, TagValue::Longs(vec![image.width as u32]));
        ifd.set(tags::IMAGE_LENGTH, TagValue::Longs(vec![image.height as u32]));
        ifd.set(tags::BITS_PER_SAMPLE, TagValue::Shorts(vec![bits; samples]));
        ifd.set(tags::COMPRESSION, TagValue::Shorts(vec![compression_code]));
        ifd.set(tags::PHOTOMETRIC_INTERPRETATION, TagValue::Shorts(vec![photometric]));
        ifd.set(tags::SAMPLES_PER_PIXEL, TagValue::Shorts(vec![samples as u16]));
        ifd.set(tags::ROWS_PER_STRIP, TagValue::Longs(vec![image.height.max(1) as u32]));
        ifd.set(tags::PLANAR_CONFIGURATION, TagValue::Shorts(vec![planar_config::CHUNKY]));
        ifd.set(tags::SAMPLE_FORMAT, TagValue::Shorts(vec![sample_format; samples]));

        if samples > base {
            let extras = image.channel_names[base..]
                .iter()
                .map(|name| match name.to_lowercase().as_str() {
                    "a" | "alpha" => extra_samples::UNASSOCIATED_ALPHA,
                    _ => extra_samples::UNSPECIFIED,
                })
                .collect();
            ifd.set(tags::EXTRA_SAMPLES, TagValue::Shorts(extras));
        }

        ifd.set(tags::CHANNEL_NAMES, TagValue::Ascii(image.channel_names.join(",")));

        for (name, value) in image.attributes.iter() {
            match ATTRIBUTE_TAGS.iter().find(|(_, tag_name)| *tag_name == name) {
                Some((tag, _)) => ifd.set(*tag, TagValue::Ascii(value.to_string())),
                None => debug!("Attribute '{}' has no TIFF tag, not written", name),
            }
        }

        ifd
    }
}

impl ImageCodec for TiffCodec {
    fn probe(&self, path: &Path) -> CodecResult<FileProbe> {
        let file = TiffReader::new().load(path)?;
        let main = file.subimage(0)?;

        let subimages = file
            .ifds
            .iter()
            .map(Self::probe_subimage)
            .collect::<CodecResult<Vec<_>>>()?;

        let code = main.get_tag_value(tags::COMPRESSION).unwrap_or(compression::NONE as u64);
        let compression = CompressionFactory::name_for_code(code)
            .map(str::to_string)
            .unwrap_or_else(|| format!("unknown({})", code));

        Ok(FileProbe {
            path: path.to_path_buf(),
            subimages,
            attributes: Self::attributes(main),
            compression,
        })
    }

    fn read_channel(&self, path: &Path, subimage: usize, channel: &str) -> CodecResult<ChannelPlane> {
        let mut handle = TiffReader::open_file(path)?;
        let mut reader = TiffReader::new();
        let file = reader.read(&mut handle)?;
        let ifd = file.subimage(subimage)?;

        let index = Self::channel_names(ifd)
            .iter()
            .position(|name| name == channel)
            .ok_or_else(|| TiffError::ChannelNotFound(channel.to_string()))?;
        let format = Self::probe_subimage(ifd)?.channels[index].format;

        let decoded = reader.decode_samples(&mut handle, ifd)?;
        debug!("Read channel '{}' (sample {}) of {}", channel, index, path.display());

        Ok(ChannelPlane {
            width: decoded.width,
            height: decoded.height,
            format,
            data: decoded.plane(index),
        })
    }

    fn write_image(&self, path: &Path, image: &OutputImage) -> CodecResult<()> {
        let samples = image.channel_names.len();
        let expected = decoded_size(image.width, image.height, samples, 1)?;
        if samples == 0 || image.pixels.len() != expected {
            return Err(CodecError::Other(format!(
                "Image buffer holds {} samples, expected {} ({}x{}x{})",
                image.pixels.len(), expected, image.width, image.height, samples)));
        }

        let format = ChannelFormat::widest(image.channel_formats.iter().copied());
        let handler = CompressionFactory::get_handler_by_name(&image.compression)?;
        let raw = Self::encode_samples(&image.pixels, format);
        let strip = handler.compress(&raw)?;

        let ifd = Self::build_ifd(image, format, handler.code());
        let writer = TiffWriter::for_payload(strip.len() as u64);
        writer.write(path, &[ifd], &[vec![strip]])?;

        debug!("Wrote {}x{} {} image ({} channels, {}) to {}",
               image.width, image.height, format, samples, handler.name(), path.display());
        Ok(())
    }

    fn copy_image(&self, source: &Path, dest: &Path) -> CodecResult<()> {
        let mut handle = TiffReader::open_file(source)?;
        let mut reader = TiffReader::new();
        let file = reader.read(&mut handle)?;
        let main = file.subimage(0)?;

        // Raw blocks keep the source byte order; multi-byte samples from a
        // big-endian file would be misread in a little-endian container
        if file.byte_order == ByteOrder::BigEndian
            && main.get_tag_values(tags::BITS_PER_SAMPLE).unwrap_or_default().iter().any(|b| *b > 8)
        {
            return Err(CodecError::Other(format!(
                "Cannot copy {}: big-endian multi-byte samples", source.display())));
        }

        let blocks = reader.read_blocks(&mut handle, main)?;
        let mut ifd = main.clone();
        for tag in POINTER_TAGS {
            if ifd.remove(tag).is_some() {
                debug!("Dropped pointer tag {} while copying {}", tag, source.display());
            }
        }

        TiffWriter::new(file.is_big_tiff).write(dest, &[ifd], &[blocks])?;
        debug!("Copied {} to {}", source.display(), dest.display());
        Ok(())
    }

    fn supports_compression(&self, name: &str) -> bool {
        CompressionFactory::get_handler_by_name(name).is_ok()
    }
}

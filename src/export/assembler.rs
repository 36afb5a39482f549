//! Builds output frames from channel reads

use log::debug;

use super::cancel::CancelToken;
use super::channel_reader::ChannelReadScheduler;
use super::errors::{ExportError, ExportResult};
use crate::codec::{ImageCodec, OutputImage};
use crate::model::{ChannelFormat, ExportSpec, SequenceSet};

/// Pixel buffer of one output frame, `[row][col][channel]`
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAssembly {
    pub frame: u32,
    pub width: usize,
    pub height: usize,
    pub channel_names: Vec<String>,
    pub pixels: Vec<f32>,
}

impl FrameAssembly {
    /// Interleaves per-channel planes; missing planes become zeros
    ///
    /// The buffer size comes from a probed header, so it is reserved
    /// fallibly: an impossible size is an `Assembly` error.
    pub fn from_planes(frame: u32, width: usize, height: usize, channel_names: Vec<String>, planes: &[Option<Vec<f32>>])
        -> ExportResult<Self>
    {
        let channels = channel_names.len();
        let len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(channels))
            .ok_or_else(|| ExportError::Assembly(format!(
                "Frame size {}x{}x{} overflows", width, height, channels)))?;

        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).map_err(|e| ExportError::Assembly(format!(
            "Cannot allocate {}x{}x{} frame: {}", width, height, channels, e)))?;
        pixels.resize(len, 0.0f32);

        for (c, plane) in planes.iter().enumerate() {
            if let Some(plane) = plane {
                for (p, value) in plane.iter().enumerate().take(width * height) {
                    pixels[p * channels + c] = *value;
                }
            }
        }

        Ok(FrameAssembly { frame, width, height, channel_names, pixels })
    }

    pub fn sample(&self, row: usize, col: usize, channel: usize) -> f32 {
        self.pixels[(row * self.width + col) * self.channel_names.len() + channel]
    }
}

/// Assembles output frames through a `ChannelReadScheduler`
pub struct FrameAssembler<'a> {
    sequences: &'a SequenceSet,
    scheduler: ChannelReadScheduler<'a>,
}

impl<'a> FrameAssembler<'a> {
    pub fn new(codec: &'a dyn ImageCodec, sequences: &'a SequenceSet, cancel: &'a CancelToken) -> Self {
        FrameAssembler {
            sequences,
            scheduler: ChannelReadScheduler::new(codec, sequences, cancel),
        }
    }

    /// Output size, taken from the probe of the first output channel's source
    pub fn output_dimensions(spec: &ExportSpec, sequences: &SequenceSet) -> ExportResult<(usize, usize)> {
        let first = spec
            .channels
            .first()
            .ok_or_else(|| ExportError::Assembly("No output channels".to_string()))?;
        let probe = sequences
            .get(&first.source.sequence_id)
            .and_then(|s| s.probe())
            .ok_or_else(|| ExportError::Assembly(format!(
                "Cannot determine output size: sequence '{}' not probed", first.source.sequence_id)))?;
        let sub = probe
            .subimage(first.source.subimage)
            .or_else(|| probe.main_subimage())
            .ok_or_else(|| ExportError::Assembly(format!(
                "Cannot determine output size: sequence '{}' has no sub-images", first.source.sequence_id)))?;
        Ok((sub.width, sub.height))
    }

    /// Storage format of each output channel: override, else source format
    pub fn output_formats(spec: &ExportSpec, sequences: &SequenceSet) -> Vec<ChannelFormat> {
        spec.channels
            .iter()
            .map(|channel| {
                channel.format_override.unwrap_or_else(|| {
                    sequences
                        .get(&channel.source.sequence_id)
                        .and_then(|s| s.probe())
                        .and_then(|p| p.subimage(channel.source.subimage))
                        .and_then(|sub| sub.channel(&channel.source.channel_name))
                        .map(|c| c.format)
                        .unwrap_or(ChannelFormat::Float)
                })
            })
            .collect()
    }

    pub fn assemble(&self, spec: &ExportSpec, frame: u32) -> ExportResult<FrameAssembly> {
        let (width, height) = Self::output_dimensions(spec, self.sequences)?;
        let planes = self.scheduler.read_frame(spec, frame, width, height)?;
        let assembly = FrameAssembly::from_planes(frame, width, height, spec.channel_names(), &planes)?;

        debug!("Assembled frame {}: {}x{}, {} channels", frame, width, height, assembly.channel_names.len());
        Ok(assembly)
    }

    /// Converts an assembly into the image handed to the codec
    pub fn to_output_image(&self, spec: &ExportSpec, assembly: FrameAssembly) -> OutputImage {
        OutputImage {
            width: assembly.width,
            height: assembly.height,
            channel_names: assembly.channel_names,
            channel_formats: Self::output_formats(spec, self.sequences),
            pixels: assembly.pixels,
            attributes: spec.attributes.clone(),
            compression: spec.compression.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planes_are_interleaved() {
        let names = vec!["R".to_string(), "G".to_string(), "B".to_string()];
        let planes = vec![Some(vec![1.0, 2.0]), None, Some(vec![5.0, 6.0])];
        let assembly = FrameAssembly::from_planes(1, 2, 1, names, &planes).unwrap();

        assert_eq!(assembly.pixels, vec![1.0, 0.0, 5.0, 2.0, 0.0, 6.0]);
        assert_eq!(assembly.sample(0, 1, 2), 6.0);
    }

    #[test]
    fn test_impossible_frame_size_is_an_error() {
        let names = vec!["R".to_string(), "G".to_string()];
        let overflow = FrameAssembly::from_planes(1, usize::MAX, 2, names.clone(), &[None, None]);
        assert!(matches!(overflow, Err(ExportError::Assembly(_))));

        let huge = FrameAssembly::from_planes(1, 1 << 40, 1 << 20, names, &[None, None]);
        assert!(matches!(huge, Err(ExportError::Assembly(_))));
    }
}

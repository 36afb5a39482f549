//! Description of one export job

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use super::attributes::AttributeSet;
use super::pattern::SequencePattern;
use super::probe::ChannelFormat;

/// Whether an identical container copy may replace re-encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionPolicy {
    /// Copy the source container when nothing would change
    #[default]
    Skip,
    /// Always decode and re-encode
    Always,
}

/// How sequences of different lengths are combined
///
/// Carried with the job and reported by validation; frame resolution
/// itself always takes the union of all frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameRangePolicy {
    #[default]
    StopAtShortest,
    HoldLast,
    ProcessAvailable,
}

impl fmt::Display for FrameRangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrameRangePolicy::StopAtShortest => "stop_at_shortest",
            FrameRangePolicy::HoldLast => "hold_last",
            FrameRangePolicy::ProcessAvailable => "process_available",
        })
    }
}

/// Points at a channel of a probed sequence
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelSourceRef {
    pub sequence_id: String,
    pub channel_name: String,
    pub subimage: usize,
}

impl ChannelSourceRef {
    pub fn new(sequence_id: impl Into<String>, channel_name: impl Into<String>, subimage: usize) -> Self {
        ChannelSourceRef {
            sequence_id: sequence_id.into(),
            channel_name: channel_name.into(),
            subimage,
        }
    }
}

/// One channel of the output image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChannel {
    pub name: String,
    pub source: ChannelSourceRef,
    pub format_override: Option<ChannelFormat>,
}

impl OutputChannel {
    pub fn new(name: impl Into<String>, source: ChannelSourceRef) -> Self {
        OutputChannel { name: name.into(), source, format_override: None }
    }

    pub fn with_format(mut self, format: ChannelFormat) -> Self {
        self.format_override = Some(format);
        self
    }
}

/// A complete export job
#[derive(Debug, Clone)]
pub struct ExportSpec {
    pub output_dir: PathBuf,
    pub pattern: SequencePattern,
    pub channels: Vec<OutputChannel>,
    pub attributes: AttributeSet,
    /// Target compression name
    pub compression: String,
    pub compression_policy: CompressionPolicy,
    pub frame_policy: FrameRangePolicy,
    /// Inclusive `(start, end)` frame filter
    pub frame_range: Option<(u32, u32)>,
}

impl ExportSpec {
    pub fn new(output_dir: impl Into<PathBuf>, pattern: SequencePattern) -> Self {
        ExportSpec {
            output_dir: output_dir.into(),
            pattern,
            channels: Vec::new(),
            attributes: AttributeSet::new(),
            compression: "deflate".to_string(),
            compression_policy: CompressionPolicy::default(),
            frame_policy: FrameRangePolicy::default(),
            frame_range: None,
        }
    }

    pub fn with_channel(mut self, channel: OutputChannel) -> Self {
        self.channels.push(channel);
        self
    }

    /// Path of the output file for `frame`
    pub fn output_path(&self, frame: u32) -> PathBuf {
        self.output_dir.join(self.pattern.format(frame))
    }

    /// Distinct source sequence ids, in id order
    pub fn source_sequence_ids(&self) -> BTreeSet<&str> {
        self.channels.iter().map(|c| c.source.sequence_id.as_str()).collect()
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name.clone()).collect()
    }
}

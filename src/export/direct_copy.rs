//! Container copy path
//!
//! Used when the output would be bit-identical to the source apart from
//! its name. Frames are copied one after another; the first failure hands
//! the rest of the run back to the caller for the worker pool.

use super::cancel::CancelToken;
use super::events::EventSink;
use super::progress::ProgressTracker;
use super::write_serializer::WriteSerializer;
use crate::codec::ImageCodec;
use crate::model::{ExportSpec, SequenceSpec};

/// How a direct-copy pass ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectCopyResult {
    Completed,
    Stopped,
    /// A frame failed; `remaining` holds it and every later frame
    Fallback { frame: u32, remaining: Vec<u32>, error: String },
}

/// Copies source containers frame by frame without decoding them
pub struct DirectCopyExporter<'a> {
    /// Codec performing the container copy
    codec: &'a dyn ImageCodec,
    /// Write lock shared with the worker pool
    writer: WriteSerializer,
    /// Checked before each frame
    cancel: &'a CancelToken,
    /// Receives progress and log events
    events: &'a EventSink,
    /// Run-wide counter, shared with a later fallback
    progress: &'a ProgressTracker,
}

impl<'a> DirectCopyExporter<'a> {
    /// Creates an exporter for one run
    ///
    /// # Arguments
    ///
    /// * `codec` - Codec used for `copy_image`
    /// * `writer` - Write critical section
    /// * `cancel` - Stop flag of the run
    /// * `events` - Event sink of the run
    /// * `progress` - Progress counter of the run
    pub fn new(
        codec: &'a dyn ImageCodec,
        writer: WriteSerializer,
        cancel: &'a CancelToken,
        events: &'a EventSink,
        progress: &'a ProgressTracker,
    ) -> Self {
        DirectCopyExporter { codec, writer, cancel, events, progress }
    }

    /// Copies `frames` of `source`; already copied frames stay on disk
    ///
    /// # Arguments
    ///
    /// * `spec` - Export job, provides the output file names
    /// * `source` - The single source sequence
    /// * `frames` - Resolved frame numbers, ascending
    ///
    /// # Returns
    ///
    /// `Completed`, `Stopped`, or `Fallback` carrying the failed frame and
    /// every frame not yet attempted
    pub fn run(&self, spec: &ExportSpec, source: &SequenceSpec, frames: &[u32]) -> DirectCopyResult {
        self.events.info(format!("Direct copy of {} frames from '{}'", frames.len(), source.id));

        for (position, &frame) in frames.iter().enumerate() {
            if self.cancel.is_cancelled() {
                self.events.info("Export stopped by user");
                return DirectCopyResult::Stopped;
            }

            let input = source.frame_path(frame);
            let output = spec.output_path(frame);
            if let Err(e) = self.writer.serialize(|| self.codec.copy_image(&input, &output)) {
                self.events.warn(format!(
                    "Direct copy failed at frame {} ({}), falling back to worker pool", frame, e));
                return DirectCopyResult::Fallback {
                    frame,
                    remaining: frames[position..].to_vec(),
                    error: e.to_string(),
                };
            }

            let percent = self.progress.increment();
            self.events.progress(percent, format!("Frame {} (direct copy)", frame));
        }

        DirectCopyResult::Completed
    }
}

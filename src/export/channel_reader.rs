//! Channel reads for one output frame
//!
//! The output channels of a frame are grouped by the source file they come
//! from. A group with more than one channel may be read on a short-lived
//! channel-level pool whose size is bounded by the estimated memory cost of
//! the frame (`worker_cap`). Every read opens its own file handle.

use log::{debug, warn};
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use super::cancel::CancelToken;
use super::errors::{ExportError, ExportResult};
use crate::codec::ImageCodec;
use crate::model::{ExportSpec, OutputChannel, SequenceSet};

/// Decoded plane of each output channel; `None` marks a channel to zero-fill
pub type ChannelReads = Vec<Option<Vec<f32>>>;

/// Upper bound on concurrent channel reads for a frame of `pixels` pixels
pub fn worker_cap(pixels: usize) -> usize {
    match pixels {
        p if p > 25_000_000 => 1,
        p if p > 10_000_000 => 2,
        p if p > 5_000_000 => 3,
        _ => 4,
    }
}

/// Channel-level pool size for a group of `channels` reads
pub fn channel_workers(pixels: usize, channels: usize) -> usize {
    worker_cap(pixels).min(channels)
}

/// Reads the output channels of frames; holds no state between frames
pub struct ChannelReadScheduler<'a> {
    codec: &'a dyn ImageCodec,
    sequences: &'a SequenceSet,
    cancel: &'a CancelToken,
}

impl<'a> ChannelReadScheduler<'a> {
    pub fn new(codec: &'a dyn ImageCodec, sequences: &'a SequenceSet, cancel: &'a CancelToken) -> Self {
        ChannelReadScheduler { codec, sequences, cancel }
    }

    /// Reads every output channel of `frame`, in output channel order
    ///
    /// Only cancellation and a frame size that overflows are errors. Unresolved sequences, missing files,
    /// unreadable channels and planes of the wrong size are logged and
    /// reported as `None`.
    pub fn read_frame(&self, spec: &ExportSpec, frame: u32, width: usize, height: usize) -> ExportResult<ChannelReads> {
        let mut reads: ChannelReads = vec![None; spec.channels.len()];
        let pixels = width
            .checked_mul(height)
            .ok_or_else(|| ExportError::Assembly(format!("Frame size {}x{} overflows", width, height)))?;

        for (path, indices) in self.group_by_file(spec, frame) {
            self.cancel.check()?;

            if !path.exists() {
                warn!("Frame {}: source file {} is missing, {} channel(s) zero-filled",
                      frame, path.display(), indices.len());
                continue;
            }

            for (index, plane) in self.read_group(spec, &path, &indices, pixels)? {
                reads[index] = plane;
            }
        }

        Ok(reads)
    }

    /// Groups output channel indices by resolved source path, first-seen order
    fn group_by_file(&self, spec: &ExportSpec, frame: u32) -> Vec<(PathBuf, Vec<usize>)> {
        let mut groups: Vec<(PathBuf, Vec<usize>)> = Vec::new();

        for (index, channel) in spec.channels.iter().enumerate() {
            let Some(sequence) = self.sequences.get(&channel.source.sequence_id) else {
                warn!("Output channel '{}': sequence '{}' not found, zero-filled",
                      channel.name, channel.source.sequence_id);
                continue;
            };

            let path = sequence.frame_path(frame);
            match groups.iter_mut().find(|(p, _)| *p == path) {
                Some((_, indices)) => indices.push(index),
                None => groups.push((path, vec![index])),
            }
        }

        groups
    }

    fn read_group(&self, spec: &ExportSpec, path: &Path, indices: &[usize], pixels: usize)
        -> ExportResult<Vec<(usize, Option<Vec<f32>>)>>
    {
        let workers = channel_workers(pixels, indices.len());
        if indices.len() == 1 || workers <= 1 {
            return self.read_sequential(spec, path, indices, pixels);
        }

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("channel-read-{}", i))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                warn!("Channel pool unavailable for {} ({}), reading sequentially", path.display(), e);
                return self.read_sequential(spec, path, indices, pixels);
            }
        };

        debug!("Reading {} channels of {} with {} workers", indices.len(), path.display(), workers);
        let parallel = panic::catch_unwind(AssertUnwindSafe(|| {
            pool.install(|| {
                indices
                    .par_iter()
                    .map(|&index| self.read_one(&spec.channels[index], path, pixels).map(|plane| (index, plane)))
                    .collect::<ExportResult<Vec<_>>>()
            })
        }));

        match parallel {
            Ok(result) => result,
            Err(_) => {
                warn!("Channel pool for {} failed, re-reading sequentially", path.display());
                self.read_sequential(spec, path, indices, pixels)
            }
        }
    }

    fn read_sequential(&self, spec: &ExportSpec, path: &Path, indices: &[usize], pixels: usize)
        -> ExportResult<Vec<(usize, Option<Vec<f32>>)>>
    {
        indices
            .iter()
            .map(|&index| self.read_one(&spec.channels[index], path, pixels).map(|plane| (index, plane)))
            .collect()
    }

    fn read_one(&self, channel: &OutputChannel, path: &Path, pixels: usize) -> ExportResult<Option<Vec<f32>>> {
        self.cancel.check()?;

        let source = &channel.source;
        match self.codec.read_channel(path, source.subimage, &source.channel_name) {
            Ok(plane) if plane.data.len() == pixels => {
                debug!("Read '{}' from {} for output channel '{}'",
                       source.channel_name, path.display(), channel.name);
                Ok(Some(plane.data))
            }
            Ok(plane) => {
                warn!("Channel '{}' of {} is {}x{}, expected {} pixels; zero-filled",
                      source.channel_name, path.display(), plane.width, plane.height, pixels);
                Ok(None)
            }
            Err(e) => {
                warn!("Cannot read channel '{}' from {}: {}; zero-filled",
                      source.channel_name, path.display(), e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_cap_thresholds() {
        assert_eq!(worker_cap(30_000_000), 1);
        assert_eq!(worker_cap(25_000_000), 2);
        assert_eq!(worker_cap(12_000_000), 2);
        assert_eq!(worker_cap(8_000_000), 3);
        assert_eq!(worker_cap(5_000_000), 4);
        assert_eq!(worker_cap(1_000_000), 4);
    }

    #[test]
    fn test_channel_workers() {
        assert_eq!(channel_workers(30_000_000, 4), 1);
        assert_eq!(channel_workers(1_000_000, 4), 4);
        assert_eq!(channel_workers(1_000_000, 2), 2);
        assert_eq!(channel_workers(8_000_000, 6), 3);
    }
}

//! Frame-level worker pool
//!
//! Every frame becomes one task on a rayon pool sized by `frame_workers`.
//! Tasks are spawned up front and their results drained on the calling
//! thread in completion order. Each task always reports back, so the drain
//! loop doubles as the pool shutdown: once the run is decided (stop or
//! failure) the remaining results are received and discarded, and queued
//! tasks see the halt flag and skip their work.

use log::{debug, error};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use super::assembler::FrameAssembler;
use super::cancel::CancelToken;
use super::errors::{ExportError, ExportResult};
use super::events::EventSink;
use super::progress::ProgressTracker;
use super::write_serializer::WriteSerializer;
use crate::codec::ImageCodec;
use crate::discovery::num_cores;
use crate::model::{ExportSpec, SequenceSet};

/// Frame pool size for a run of `frames` frames
pub fn frame_workers(frames: usize) -> usize {
    let cores = num_cores();
    if frames < 5 {
        1
    } else if frames < 100 {
        cores.min(4)
    } else {
        cores.min(8)
    }
}

/// How a worker-pool pass ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParallelResult {
    Completed,
    Stopped,
    Failed { frame: u32, error: String },
    /// The frame pool could not be started
    PoolUnavailable(String),
}

enum FrameResult {
    Written(u32),
    Skipped(u32),
    Failed(u32, ExportError),
}

/// State shared by all frame tasks of one pass
struct FrameJob {
    spec: ExportSpec,
    sequences: SequenceSet,
    codec: Arc<dyn ImageCodec>,
    cancel: CancelToken,
    writer: WriteSerializer,
    /// Raised by the first failing task; later tasks skip
    halt: AtomicBool,
}

impl FrameJob {
    fn should_skip(&self) -> bool {
        self.cancel.is_cancelled() || self.halt.load(Ordering::SeqCst)
    }

    fn process(&self, frame: u32) -> FrameResult {
        if self.should_skip() {
            return FrameResult::Skipped(frame);
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.export_frame(frame)))
            .unwrap_or_else(|_| Err(ExportError::Pool(format!("worker panicked on frame {}", frame))));

        match outcome {
            Ok(true) => FrameResult::Written(frame),
            Ok(false) => FrameResult::Skipped(frame),
            Err(e) if e.is_cancelled() => FrameResult::Skipped(frame),
            Err(e) => {
                // Halt before reporting so nothing queued starts afterwards
                self.halt.store(true, Ordering::SeqCst);
                FrameResult::Failed(frame, e)
            }
        }
    }

    /// Assembles and writes one frame; `Ok(false)` if halted before writing
    fn export_frame(&self, frame: u32) -> ExportResult<bool> {
        let assembler = FrameAssembler::new(self.codec.as_ref(), &self.sequences, &self.cancel);
        let assembly = assembler.assemble(&self.spec, frame)?;
        self.cancel.check()?;

        let image = assembler.to_output_image(&self.spec, assembly);
        let path = self.spec.output_path(frame);

        self.writer.serialize(|| {
            self.cancel.check()?;
            if self.halt.load(Ordering::SeqCst) {
                return Ok(false);
            }
            self.codec.write_image(&path, &image)?;
            debug!("Frame {} written to {}", frame, path.display());
            Ok(true)
        })
    }
}

/// Assembles and writes frames on a worker pool
pub struct ParallelFrameExporter<'a> {
    /// Codec shared by all frame tasks
    codec: Arc<dyn ImageCodec>,
    /// Write lock every frame write goes through
    writer: WriteSerializer,
    /// Stop flag of the run
    cancel: &'a CancelToken,
    /// Receives progress and log events, from the draining thread only
    events: &'a EventSink,
    /// Run-wide counter
    progress: &'a ProgressTracker,
}

impl<'a> ParallelFrameExporter<'a> {
    /// Creates an exporter for one run
    ///
    /// # Arguments
    ///
    /// * `codec` - Codec for channel reads and frame writes
    /// * `writer` - Write critical section
    /// * `cancel` - Stop flag of the run
    /// * `events` - Event sink of the run
    /// * `progress` - Progress counter of the run
    pub fn new(
        codec: Arc<dyn ImageCodec>,
        writer: WriteSerializer,
        cancel: &'a CancelToken,
        events: &'a EventSink,
        progress: &'a ProgressTracker,
    ) -> Self {
        ParallelFrameExporter { codec, writer, cancel, events, progress }
    }

    /// Assembles and writes `frames` on a pool sized by `frame_workers`
    ///
    /// # Arguments
    ///
    /// * `spec` - Export job
    /// * `sequences` - Source sequences the channels refer to
    /// * `frames` - Frame numbers to export
    ///
    /// # Returns
    ///
    /// `Completed` only if every frame was written. The first failing frame
    /// decides a `Failed` result; a stop decides `Stopped`.
    pub fn run(&self, spec: &ExportSpec, sequences: &SequenceSet, frames: &[u32]) -> ParallelResult {
        let workers = frame_workers(frames.len());
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("frame-worker-{}", i))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                self.events.error(format!("Cannot start frame worker pool: {}", e));
                return ParallelResult::PoolUnavailable(e.to_string());
            }
        };
        self.events.info(format!("Exporting {} frames with {} workers", frames.len(), workers));

        let job = Arc::new(FrameJob {
            spec: spec.clone(),
            sequences: sequences.clone(),
            codec: Arc::clone(&self.codec),
            cancel: self.cancel.clone(),
            writer: self.writer,
            halt: AtomicBool::new(false),
        });

        let (sender, receiver) = mpsc::channel();
        for &frame in frames {
            let job = Arc::clone(&job);
            let sender = sender.clone();
            pool.spawn(move || {
                let _ = sender.send(job.process(frame));
            });
        }
        drop(sender);

        let mut result: Option<ParallelResult> = None;
        for _ in 0..frames.len() {
            let received = match receiver.recv() {
                Ok(received) => received,
                Err(_) => {
                    error!("Frame worker pool terminated unexpectedly");
                    job.halt.store(true, Ordering::SeqCst);
                    return result.unwrap_or_else(|| {
                        ParallelResult::PoolUnavailable("frame worker pool terminated unexpectedly".to_string())
                    });
                }
            };

            // Run already decided: discard in-flight results
            if result.is_some() {
                continue;
            }

            if self.cancel.is_cancelled() {
                job.halt.store(true, Ordering::SeqCst);
                self.events.info("Export stopped by user");
                result = Some(ParallelResult::Stopped);
                continue;
            }

            match received {
                FrameResult::Written(frame) => {
                    let percent = self.progress.increment();
                    self.events.progress(percent, format!("Frame {} (worker pool)", frame));
                }
                FrameResult::Skipped(frame) => {
                    debug!("Frame {} skipped", frame);
                }
                FrameResult::Failed(frame, e) => {
                    self.events.error(format!("Frame {} failed: {}", frame, e));
                    result = Some(ParallelResult::Failed { frame, error: e.to_string() });
                }
            }
        }

        result.unwrap_or(ParallelResult::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_worker_sizing() {
        assert_eq!(frame_workers(1), 1);
        assert_eq!(frame_workers(4), 1);
        assert!((1..=4).contains(&frame_workers(5)));
        assert!((1..=4).contains(&frame_workers(99)));
        assert!((1..=8).contains(&frame_workers(100)));
    }
}

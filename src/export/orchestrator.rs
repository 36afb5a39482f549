//! Export run state machine
//!
//! ```text
//! Init -> Validating -> Blocked
//!                    -> ResolvingFrames -> NoFrames
//!                                       -> SelectingStrategy -> DirectCopy -> Succeeded | Stopped
//!                                                                          -> ParallelAssemble (fallback, once)
//!                                                            -> ParallelAssemble -> Succeeded | Failed | Stopped
//! ```

use log::{debug, Level};
use std::fmt;
use std::fs;
use std::sync::Arc;

use super::cancel::CancelToken;
use super::direct_copy::{DirectCopyExporter, DirectCopyResult};
use super::events::{EventSink, ExportOutcome};
use super::frame_range::resolve_frames;
use super::parallel::{ParallelFrameExporter, ParallelResult};
use super::progress::ProgressTracker;
use super::strategy::select_strategy;
use super::write_serializer::WriteSerializer;
use crate::codec::ImageCodec;
use crate::model::{ExportSpec, SequenceSet};
use crate::validation::{Severity, Validator};

/// States of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Init,
    Validating,
    Blocked,
    ResolvingFrames,
    NoFrames,
    SelectingStrategy,
    DirectCopy,
    ParallelAssemble,
    Succeeded,
    Failed,
    Stopped,
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Drives one export run from validation to its outcome
pub struct ExportOrchestrator {
    spec: ExportSpec,
    sequences: SequenceSet,
    codec: Arc<dyn ImageCodec>,
    validator: Arc<dyn Validator>,
    cancel: CancelToken,
    events: EventSink,
    writer: WriteSerializer,
    state: ExportState,
    fallback_used: bool,
}

impl ExportOrchestrator {
    pub fn new(
        spec: ExportSpec,
        sequences: SequenceSet,
        codec: Arc<dyn ImageCodec>,
        validator: Arc<dyn Validator>,
        cancel: CancelToken,
        events: EventSink,
    ) -> Self {
        ExportOrchestrator {
            spec,
            sequences,
            codec,
            validator,
            cancel,
            events,
            writer: WriteSerializer::new(),
            state: ExportState::Init,
            fallback_used: false,
        }
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    fn transition(&mut self, next: ExportState) {
        debug!("Export state {} -> {}", self.state, next);
        self.state = next;
    }

    /// Executes the run and returns its single outcome
    pub fn run(mut self) -> ExportOutcome {
        self.transition(ExportState::Validating);
        if let Some(outcome) = self.validate() {
            self.transition(ExportState::Blocked);
            return outcome;
        }

        self.transition(ExportState::ResolvingFrames);
        let frames = resolve_frames(&self.sequences, self.spec.frame_range);
        if frames.is_empty() {
            self.transition(ExportState::NoFrames);
            let outcome = ExportOutcome::no_frames();
            self.events.warn(outcome.message.clone());
            return outcome;
        }
        self.events.info(format!("Resolved {} frames ({}-{})",
                                 frames.len(), frames[0], frames[frames.len() - 1]));

        self.transition(ExportState::SelectingStrategy);
        let decision = select_strategy(&self.spec, &self.sequences);
        self.events.info(format!("Strategy: {}", decision.reason));

        if let Err(e) = fs::create_dir_all(&self.spec.output_dir) {
            self.transition(ExportState::Failed);
            let outcome = ExportOutcome::failed(format!(
                "Export failed: cannot create output directory {}: {}", self.spec.output_dir.display(), e));
            self.events.error(outcome.message.clone());
            return outcome;
        }

        let progress = ProgressTracker::new(frames.len());
        let outcome = if decision.can_skip_recompression {
            self.run_direct_copy(&frames, &progress)
        } else {
            self.run_parallel(&frames, &progress)
        };

        let level = if outcome.success { Level::Info } else { Level::Warn };
        self.events.log(level, outcome.message.clone());
        outcome
    }

    /// `Some(Blocked)` if validation reported errors
    fn validate(&self) -> Option<ExportOutcome> {
        let issues = self.validator.validate(&self.spec, &self.sequences);
        let mut errors = 0;
        for issue in &issues {
            match issue.severity {
                Severity::Error => {
                    errors += 1;
                    self.events.error(issue.to_string());
                }
                Severity::Warning => self.events.warn(issue.to_string()),
            }
        }

        (errors > 0).then(|| ExportOutcome::blocked(errors))
    }

    fn run_direct_copy(&mut self, frames: &[u32], progress: &ProgressTracker) -> ExportOutcome {
        self.transition(ExportState::DirectCopy);

        let source = self
            .spec
            .source_sequence_ids()
            .into_iter()
            .next()
            .and_then(|id| self.sequences.get(id))
            .cloned();
        let Some(source) = source else {
            // The selector only approves a copy for a known single source
            return self.run_parallel(frames, progress);
        };

        let exporter = DirectCopyExporter::new(self.codec.as_ref(), self.writer, &self.cancel, &self.events, progress);
        match exporter.run(&self.spec, &source, frames) {
            DirectCopyResult::Completed => {
                self.transition(ExportState::Succeeded);
                ExportOutcome::succeeded()
            }
            DirectCopyResult::Stopped => {
                self.transition(ExportState::Stopped);
                ExportOutcome::stopped()
            }
            DirectCopyResult::Fallback { frame, remaining, error } => {
                debug!("Fallback from frame {} after: {}", frame, error);
                self.fallback(&remaining, progress)
            }
        }
    }

    /// The one permitted DirectCopy -> ParallelAssemble edge
    fn fallback(&mut self, remaining: &[u32], progress: &ProgressTracker) -> ExportOutcome {
        if self.fallback_used {
            self.transition(ExportState::Failed);
            return ExportOutcome::failed("Export failed: fallback already used");
        }
        self.fallback_used = true;
        self.events.info(format!("Falling back to worker pool for {} frames", remaining.len()));
        self.run_parallel(remaining, progress)
    }

    fn run_parallel(&mut self, frames: &[u32], progress: &ProgressTracker) -> ExportOutcome {
        self.transition(ExportState::ParallelAssemble);

        let exporter = ParallelFrameExporter::new(
            Arc::clone(&self.codec), self.writer, &self.cancel, &self.events, progress);
        match exporter.run(&self.spec, &self.sequences, frames) {
            ParallelResult::Completed => {
                self.transition(ExportState::Succeeded);
                ExportOutcome::succeeded()
            }
            ParallelResult::Stopped => {
                self.transition(ExportState::Stopped);
                ExportOutcome::stopped()
            }
            ParallelResult::Failed { frame, error } => {
                self.transition(ExportState::Failed);
                ExportOutcome::failed_at(frame, error)
            }
            ParallelResult::PoolUnavailable(error) => {
                self.transition(ExportState::Failed);
                ExportOutcome::failed(format!("Export failed: {}", error))
            }
        }
    }
}

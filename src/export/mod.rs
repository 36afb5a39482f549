//! Concurrent export pipeline
//!
//! `ExportManager` runs an `ExportOrchestrator` in the background. The
//! orchestrator validates the job, resolves its frames and then either
//! copies source containers directly (`DirectCopyExporter`) or assembles
//! frames on a worker pool (`ParallelFrameExporter`), each frame reading its
//! channels through a `ChannelReadScheduler`. All writes go through the
//! process-wide `WriteSerializer`; a shared `CancelToken` stops everything.

pub mod assembler;
pub mod cancel;
pub mod channel_reader;
pub mod direct_copy;
pub mod errors;
pub mod events;
pub mod frame_range;
pub mod manager;
pub mod orchestrator;
pub mod parallel;
pub mod progress;
pub mod strategy;
pub mod write_serializer;

pub use assembler::{FrameAssembler, FrameAssembly};
pub use cancel::CancelToken;
pub use channel_reader::{channel_workers, worker_cap, ChannelReadScheduler};
pub use direct_copy::{DirectCopyExporter, DirectCopyResult};
pub use errors::{ExportError, ExportResult};
pub use events::{EventSink, ExportEvent, ExportOutcome, ExportStatus};
pub use frame_range::resolve_frames;
pub use manager::ExportManager;
pub use orchestrator::{ExportOrchestrator, ExportState};
pub use parallel::{frame_workers, ParallelFrameExporter, ParallelResult};
pub use progress::ProgressTracker;
pub use strategy::{select_strategy, StrategyDecision};
pub use write_serializer::WriteSerializer;

#[cfg(test)]
mod tests;

//! Events and outcome of an export run

use log::{log, Level};
use std::fmt;
use std::sync::mpsc::Sender;

/// Terminal status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    Succeeded,
    Failed,
    Stopped,
    Blocked,
    NoFrames,
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportStatus::Succeeded => "succeeded",
            ExportStatus::Failed => "failed",
            ExportStatus::Stopped => "stopped",
            ExportStatus::Blocked => "blocked",
            ExportStatus::NoFrames => "no frames",
        })
    }
}

/// Result of one run; exactly one is produced per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub status: ExportStatus,
    pub success: bool,
    pub message: String,
}

impl ExportOutcome {
    fn new(status: ExportStatus, message: impl Into<String>) -> Self {
        ExportOutcome {
            status,
            success: status == ExportStatus::Succeeded,
            message: message.into(),
        }
    }

    pub fn succeeded() -> Self {
        Self::new(ExportStatus::Succeeded, "Export completed successfully!")
    }

    pub fn stopped() -> Self {
        Self::new(ExportStatus::Stopped, "Export stopped by user")
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(ExportStatus::Failed, message)
    }

    pub fn failed_at(frame: u32, error: impl fmt::Display) -> Self {
        Self::failed(format!("Export failed at frame {}: {}", frame, error))
    }

    pub fn blocked(error_count: usize) -> Self {
        Self::new(ExportStatus::Blocked, format!("Export blocked: {} validation errors", error_count))
    }

    pub fn no_frames() -> Self {
        Self::new(ExportStatus::NoFrames, "No frames to export")
    }
}

impl fmt::Display for ExportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.status)
    }
}

/// Notification emitted while a run progresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEvent {
    Progress { percent: u8, message: String },
    Log(String),
    Finished(ExportOutcome),
}

/// Sending side of a run's event channel
///
/// Sends never fail from the pipeline's point of view: once the receiver
/// is gone events are dropped. `Log` events are mirrored to the `log`
/// facade at the level they were raised with.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: Sender<ExportEvent>,
}

impl EventSink {
    pub fn new(sender: Sender<ExportEvent>) -> Self {
        EventSink { sender }
    }

    fn send(&self, event: ExportEvent) {
        let _ = self.sender.send(event);
    }

    pub fn progress(&self, percent: u8, message: impl Into<String>) {
        self.send(ExportEvent::Progress { percent, message: message.into() });
    }

    pub fn log(&self, level: Level, message: impl Into<String>) {
        let message = message.into();
        log!(level, "{}", message);
        self.send(ExportEvent::Log(message));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(Level::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message);
    }

    pub fn finished(&self, outcome: ExportOutcome) {
        self.send(ExportEvent::Finished(outcome));
    }
}

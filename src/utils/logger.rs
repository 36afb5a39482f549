//! Run log
//!
//! A file sink that records the events of export runs next to the
//! `env_logger` console output.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::export::ExportEvent;

/// Writes run events to a log file
pub struct Logger {
    /// File handle for log output; `None` discards everything
    file: Mutex<Option<File>>,
}

impl Logger {
    /// Creates (or truncates) the log file at `log_file`
    pub fn new(log_file: &Path) -> io::Result<Self> {
        let file = File::create(log_file)?;
        Ok(Logger {
            file: Mutex::new(Some(file)),
        })
    }

    /// A logger that writes nowhere
    pub fn disabled() -> Self {
        Logger { file: Mutex::new(None) }
    }

    /// Appends one line to the log file
    pub fn log(&self, message: &str) -> io::Result<()> {
        let mut guard = self.file.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(file) = guard.as_mut() {
            writeln!(file, "{}", message)?;
            file.flush()?;
        }
        Ok(())
    }

    /// Records an export event
    ///
    /// Progress is logged with its percentage; the outcome line closes the
    /// run.
    pub fn record(&self, event: &ExportEvent) -> io::Result<()> {
        match event {
            ExportEvent::Progress { percent, message } => self.log(&format!("[{:>3}%] {}", percent, message)),
            ExportEvent::Log(message) => self.log(message),
            ExportEvent::Finished(outcome) => self.log(&format!("Finished: {}", outcome)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportOutcome;
    use std::fs;

    #[test]
    fn test_records_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let logger = Logger::new(&path).unwrap();

        logger.record(&ExportEvent::Log("Resolved 2 frames (1-2)".to_string())).unwrap();
        logger.record(&ExportEvent::Progress { percent: 50, message: "Frame 1 (worker pool)".to_string() }).unwrap();
        logger.record(&ExportEvent::Finished(ExportOutcome::succeeded())).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec![
            "Resolved 2 frames (1-2)",
            "[ 50%] Frame 1 (worker pool)",
            "Finished: Export completed successfully! (succeeded)",
        ]);
    }

    #[test]
    fn test_disabled_logger_accepts_everything() {
        assert!(Logger::disabled().log("ignored").is_ok());
    }
}

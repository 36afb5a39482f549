//! Export command
//!
//! Loads a job file, runs it through the export manager and reports
//! progress on the console while the run log records every event.

use clap::ArgMatches;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use crate::codec::ImageCodec;
use crate::commands::command_traits::{Command, CommandError, CommandResult};
use crate::config::JobFile;
use crate::export::{ExportEvent, ExportManager};
use crate::model::CompressionPolicy;
use crate::tiff::TiffCodec;
use crate::utils::logger::Logger;
use crate::utils::progress::ProgressDisplay;
use crate::validation::ValidationEngine;

/// Parses `START,END` into an inclusive frame range
pub fn parse_range(value: &str) -> CommandResult<(u32, u32)> {
    let invalid = || CommandError::InvalidArgument(format!("Invalid frame range '{}', expected START,END", value));
    let (start, end) = value.split_once(',').ok_or_else(invalid)?;
    let start = start.trim().parse::<u32>().map_err(|_| invalid())?;
    let end = end.trim().parse::<u32>().map_err(|_| invalid())?;
    Ok((start, end))
}

pub struct ExportCommand<'a> {
    job_file: PathBuf,
    always_recompress: bool,
    range: Option<(u32, u32)>,
    quiet: bool,
    logger: &'a Logger,
}

impl<'a> ExportCommand<'a> {
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> CommandResult<Self> {
        let job_file = args
            .get_one::<String>("job")
            .map(PathBuf::from)
            .ok_or_else(|| CommandError::InvalidArgument("Missing job file".to_string()))?;
        let range = args.get_one::<String>("range").map(|r| parse_range(r)).transpose()?;

        Ok(ExportCommand {
            job_file,
            always_recompress: args.get_flag("always-recompress"),
            range,
            quiet: args.get_flag("quiet"),
            logger,
        })
    }
}

impl<'a> Command for ExportCommand<'a> {
    fn execute(&self) -> CommandResult<()> {
        info!("Loading job {}", self.job_file.display());
        let codec: Arc<dyn ImageCodec> = Arc::new(TiffCodec::new());
        let job = JobFile::load(&self.job_file)?.build(codec.as_ref())?;

        let mut spec = job.spec;
        if self.range.is_some() {
            spec.frame_range = self.range;
        }
        let policy = if self.always_recompress { CompressionPolicy::Always } else { spec.compression_policy };

        let validator = Arc::new(ValidationEngine::new(Arc::clone(&codec)));
        let (manager, events) = ExportManager::new(codec, validator);
        if !manager.start(spec, job.sequences, policy) {
            return Err(CommandError::Export("An export is already running".to_string()));
        }

        let display = if self.quiet { ProgressDisplay::hidden() } else { ProgressDisplay::new("Exporting") };
        for event in events.iter() {
            if let Err(e) = self.logger.record(&event) {
                warn!("Cannot write run log: {}", e);
            }
            match event {
                ExportEvent::Progress { percent, message } => display.update(percent, &message),
                ExportEvent::Log(_) => {}
                ExportEvent::Finished(outcome) => {
                    display.finish(&outcome.message);
                    break;
                }
            }
        }

        let outcome = manager
            .wait()
            .ok_or_else(|| CommandError::Export("Export run did not report an outcome".to_string()))?;
        if outcome.success {
            info!("{}", outcome.message);
            Ok(())
        } else {
            Err(CommandError::Export(outcome.message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("1001,1100").unwrap(), (1001, 1100));
        assert_eq!(parse_range(" 5 , 9 ").unwrap(), (5, 9));
        assert!(parse_range("5").is_err());
        assert!(parse_range("a,9").is_err());
        assert!(parse_range("-1,9").is_err());
    }
}

//! Discover command: lists the image sequences of a directory

use clap::ArgMatches;
use log::info;
use std::path::PathBuf;

use crate::commands::command_traits::{Command, CommandError, CommandResult};
use crate::discovery::discover_sequences;
use crate::utils::logger::Logger;

pub struct DiscoverCommand<'a> {
    directory: PathBuf,
    logger: &'a Logger,
}

impl<'a> DiscoverCommand<'a> {
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> CommandResult<Self> {
        let directory = args
            .get_one::<String>("directory")
            .map(PathBuf::from)
            .ok_or_else(|| CommandError::InvalidArgument("Missing directory".to_string()))?;
        Ok(DiscoverCommand { directory, logger })
    }
}

impl<'a> Command for DiscoverCommand<'a> {
    fn execute(&self) -> CommandResult<()> {
        if !self.directory.is_dir() {
            return Err(CommandError::InvalidArgument(
                format!("Not a directory: {}", self.directory.display())));
        }

        let sequences = discover_sequences(&self.directory);
        info!("{} sequences found in {}", sequences.len(), self.directory.display());

        for sequence in &sequences {
            let (first, last) = match (sequence.frames.first(), sequence.frames.last()) {
                (Some(first), Some(last)) => (*first, *last),
                _ => continue,
            };
            let line = format!("{}  {} frames ({}-{})", sequence.pattern, sequence.frames.len(), first, last);
            self.logger.log(&line)?;
            println!("{}", line);
        }
        Ok(())
    }
}

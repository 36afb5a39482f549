//! CLI command implementations

pub mod command_traits;
pub mod discover_command;
pub mod export_command;
pub mod probe_command;

pub use command_traits::{Command, CommandError, CommandFactory, CommandResult};
pub use discover_command::DiscoverCommand;
pub use export_command::ExportCommand;
pub use probe_command::ProbeCommand;

use clap::ArgMatches;
use crate::utils::logger::Logger;

/// Maps the chosen subcommand to its `Command`
pub struct LayerkitCommandFactory;

impl LayerkitCommandFactory {
    pub fn new() -> Self {
        LayerkitCommandFactory
    }
}

impl Default for LayerkitCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CommandFactory<'a> for LayerkitCommandFactory {
    fn create_command(&self, args: &ArgMatches, logger: &'a Logger) -> CommandResult<Box<dyn Command + 'a>> {
        match args.subcommand() {
            Some(("export", sub)) => Ok(Box::new(ExportCommand::new(sub, logger)?)),
            Some(("probe", sub)) => Ok(Box::new(ProbeCommand::new(sub, logger)?)),
            Some(("discover", sub)) => Ok(Box::new(DiscoverCommand::new(sub, logger)?)),
            Some((name, _)) => Err(CommandError::InvalidArgument(format!("Unknown command: {}", name))),
            None => Err(CommandError::InvalidArgument("No command given, see --help".to_string())),
        }
    }
}

//! Command pattern interfaces
//!
//! Each subcommand of the CLI is a `Command`; a `CommandFactory` turns
//! parsed arguments into the command to run.

use std::io;
use thiserror::Error;

use crate::codec::CodecError;
use crate::config::ConfigError;
use crate::tiff::TiffError;
use crate::utils::logger::Logger;

/// Errors reported by CLI commands
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Tiff(#[from] TiffError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The export ran but did not succeed
    #[error("{0}")]
    Export(String),
}

pub type CommandResult<T> = Result<T, CommandError>;

/// An executable CLI operation
pub trait Command {
    fn execute(&self) -> CommandResult<()>;
}

/// Creates the command selected by the CLI arguments
pub trait CommandFactory<'a> {
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `logger` - Run log shared by the command
    fn create_command(&self, args: &clap::ArgMatches, logger: &'a Logger) -> CommandResult<Box<dyn Command + 'a>>;
}

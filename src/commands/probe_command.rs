//! Probe command: prints what a file contains

use clap::ArgMatches;
use log::info;
use std::path::PathBuf;

use crate::codec::ImageCodec;
use crate::commands::command_traits::{Command, CommandError, CommandResult};
use crate::tiff::{TiffCodec, TiffReader};
use crate::utils::logger::Logger;

pub struct ProbeCommand<'a> {
    input_file: PathBuf,
    /// Also print the raw directory layout
    structure: bool,
    logger: &'a Logger,
}

impl<'a> ProbeCommand<'a> {
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> CommandResult<Self> {
        let input_file = args
            .get_one::<String>("input")
            .map(PathBuf::from)
            .ok_or_else(|| CommandError::InvalidArgument("Missing input file".to_string()))?;
        Ok(ProbeCommand { input_file, structure: args.get_flag("structure"), logger })
    }
}

impl<'a> Command for ProbeCommand<'a> {
    fn execute(&self) -> CommandResult<()> {
        info!("Probing {}", self.input_file.display());
        let probe = TiffCodec::new().probe(&self.input_file)?;

        let mut report = probe.to_string();
        if self.structure {
            report.push_str(&TiffReader::new().load(&self.input_file)?.to_string());
        }
        self.logger.log(report.trim_end())?;
        print!("{}", report);
        Ok(())
    }
}

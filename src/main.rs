use clap::{Arg, ArgAction, Command as ClapCommand};
use log::{error, LevelFilter};
use std::path::Path;
use std::process;

use layerkit::commands::{CommandFactory, LayerkitCommandFactory};
use layerkit::utils::logger::Logger;

fn cli() -> ClapCommand {
    ClapCommand::new("layerkit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Recombine channels of TIFF image sequences into new sequences")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Run log file")
                .value_name("FILE")
                .default_value("layerkit.log")
                .global(true),
        )
        .subcommand(
            ClapCommand::new("export")
                .about("Run an export job")
                .arg(
                    Arg::new("job")
                        .help("Job file (TOML)")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("always-recompress")
                        .long("always-recompress")
                        .help("Re-encode every frame even when a direct copy is possible")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("range")
                        .long("range")
                        .help("Only export frames in START,END (inclusive)")
                        .value_name("START,END"),
                )
                .arg(
                    Arg::new("quiet")
                        .short('q')
                        .long("quiet")
                        .help("Hide the progress bar")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            ClapCommand::new("probe")
                .about("Show channels, attributes and compression of a TIFF file")
                .arg(
                    Arg::new("input")
                        .help("Input TIFF file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("structure")
                        .long("structure")
                        .help("Also print the IFD structure")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            ClapCommand::new("discover")
                .about("List the image sequences found in a directory")
                .arg(
                    Arg::new("directory")
                        .help("Directory to scan")
                        .required(true)
                        .index(1),
                ),
        )
}

fn main() {
    let matches = cli().get_matches();

    let level = if matches.get_flag("verbose") { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let log_file = matches
        .get_one::<String>("log-file")
        .map(String::as_str)
        .unwrap_or("layerkit.log");
    let logger = match Logger::new(Path::new(log_file)) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error initializing run log {}: {}", log_file, e);
            process::exit(1);
        }
    };

    let factory = LayerkitCommandFactory::new();
    match factory.create_command(&matches, &logger) {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        cli().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let matches = cli()
            .try_get_matches_from(["layerkit", "export", "job.toml", "-v", "--range", "1,5"])
            .unwrap();
        assert!(matches.get_flag("verbose"));
        assert_eq!(matches.get_one::<String>("log-file").unwrap(), "layerkit.log");
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "export");
        assert_eq!(sub.get_one::<String>("range").unwrap(), "1,5");
        assert!(!sub.get_flag("always-recompress"));
    }
}

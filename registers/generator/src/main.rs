// Licensed under the Apache-2.0 license

use clap::{Parser, Subcommand};
use log::LevelFilter;
use registers_generator::{generate_from_file, GeneratorConfig, OutputMode};
use registers_rnndb::ParseConfig;
use simple_logger::SimpleLogger;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gen-header",
    author,
    version,
    about = "Generate C and Python headers from an XML register database"
)]
struct Cli {
    /// Directory that imported files are resolved against
    #[arg(long, value_name = "DIR")]
    rnn: PathBuf,

    /// Root register database file
    #[arg(long, value_name = "FILE")]
    xml: PathBuf,

    /// Look up the schema the database names and validate against it
    #[arg(long, overrides_with = "no_validate")]
    validate: bool,

    /// Skip schema validation
    #[arg(long, overrides_with = "validate")]
    no_validate: bool,

    /// Log parsing progress to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Clone, Copy, Debug)]
enum Command {
    /// Address macros, field encoders and usage tables
    CDefines,
    /// The C defines plus register pack structs and variant dispatchers
    CPackStructs,
    /// Register offsets as a Python IntEnum
    PyDefines,
}

impl From<Command> for OutputMode {
    fn from(command: Command) -> Self {
        match command {
            Command::CDefines => OutputMode::CDefines,
            Command::CPackStructs => OutputMode::CPackStructs,
            Command::PyDefines => OutputMode::PyDefines,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("failed to initialize logging: {e}");
    }

    let parse_config = ParseConfig::new(&cli.rnn).validate(cli.validate && !cli.no_validate);
    let config = GeneratorConfig::new(cli.command.into()).schema_root(&cli.rnn);
    match generate_from_file(&parse_config, &config, &cli.xml) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use refh2_rs::{RawConfig, Refh2Error, RunConfig};

/// Run ReFH2 and convert its output into TUFLOW boundary inputs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run ReFH2, then write the TUFLOW files
    Run(ConfigArgs),
    /// Write the TUFLOW files from an existing ReFH2 output file
    Process(ConfigArgs),
    /// Validate the configuration and print the ReFH2 command line
    Check(ConfigArgs),
}

#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// Path to TOML run configuration
    #[arg(short, long, default_value = "refh2.toml")]
    pub config: PathBuf,

    /// Override the ReFH2 executable
    #[arg(long)]
    pub exe: Option<PathBuf>,

    /// Override the ReFH2 output file
    #[arg(short, long)]
    pub output_file: Option<PathBuf>,
}

impl ConfigArgs {
    /// Read the configuration file, apply command-line overrides and validate.
    pub fn load(&self) -> Result<RunConfig, Refh2Error> {
        let mut raw = RawConfig::from_path(&self.config)?;
        if let Some(exe) = &self.exe {
            raw.exe = Some(exe.clone());
        }
        if let Some(output_file) = &self.output_file {
            raw.output_file = output_file.clone();
        }
        raw.validate()
    }
}

pub fn get_args() -> Args {
    Args::parse()
}

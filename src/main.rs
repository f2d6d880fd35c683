use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::process;
use std::time::Duration;

mod cli;
mod logging;

use cli::{Command, ConfigArgs, get_args};
use refh2_rs::invoker::{self, SearchResolver};
use refh2_rs::{Pipeline, Progress, ProgressListener, RunReport};

// Spinner driven by pipeline notifications
struct SpinnerListener {
    pb: ProgressBar,
}

impl SpinnerListener {
    fn new() -> Result<Self> {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Ok(SpinnerListener { pb })
    }
}

impl ProgressListener for SpinnerListener {
    fn notify(&self, event: Progress) {
        match event {
            Progress::LocatingExecutable => self.pb.set_message("Locating ReFH2..."),
            Progress::ExternalRunStarted => self.pb.set_message("Running ReFH2..."),
            Progress::PostProcessingStarted => {
                self.pb.set_message("Processing into TUFLOW format...")
            }
            Progress::Finished(message) if message.is_empty() => {
                self.pb.finish_with_message("Finished")
            }
            Progress::Finished(message) => self.pb.abandon_with_message(message),
        }
    }
}

fn main() {
    let args = get_args();
    logging::init(args.verbose);

    if let Err(e) = run(args.command) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Run(args) => {
            let config = load(&args)?;
            let listener = SpinnerListener::new()?;
            let report = Pipeline::new(&config, &SearchResolver, &listener)
                .run()
                .context("ReFH2 to TUFLOW failed")?;
            print_report(&report);
        }
        Command::Process(args) => {
            let config = load(&args)?;
            let listener = SpinnerListener::new()?;
            let report = Pipeline::new(&config, &SearchResolver, &listener)
                .post_process()
                .with_context(|| format!("Failed to process {}", config.output_file.display()))?;
            print_report(&report);
        }
        Command::Check(args) => {
            let config = load(&args)?;
            let exe = match invoker::locate(&config, &SearchResolver, &refh2_rs::progress::Silent)
            {
                Ok(path) => path.display().to_string(),
                Err(e) => format!("<{e}>"),
            };
            println!("Configuration OK");
            println!("  {} {}", exe, invoker::build_args(&config).join(" "));
        }
    }
    Ok(())
}

fn load(args: &ConfigArgs) -> Result<refh2_rs::RunConfig> {
    args.load()
        .with_context(|| format!("Failed to load configuration: {:?}", args.config))
}

fn print_report(report: &RunReport) {
    println!("\nOutput files:");
    for path in report.files() {
        println!("  {}", path.display());
    }
}

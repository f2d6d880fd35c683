use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, info, warn};

use crate::config::RunConfig;
use crate::error::Refh2Error;
use crate::progress::{Progress, ProgressListener};

/// Environment variable consulted before searching `PATH`.
pub const EXE_ENV_VAR: &str = "REFH2_EXE";
const EXE_NAMES: [&str; 2] = ["RefH2CLI.exe", "RefH2CLI"];

/// Locates the ReFH2 executable when the configuration does not name one.
pub trait ExecutableResolver {
    fn resolve(&self) -> Option<PathBuf>;
}

impl<F: Fn() -> Option<PathBuf>> ExecutableResolver for F {
    fn resolve(&self) -> Option<PathBuf> {
        self()
    }
}

/// `REFH2_EXE`, then every directory on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchResolver;

impl ExecutableResolver for SearchResolver {
    fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = env::var_os(EXE_ENV_VAR).map(PathBuf::from) {
            if path.is_file() {
                return Some(path);
            }
            warn!("{EXE_ENV_VAR} points at {}, which is not a file", path.display());
        }
        let dirs = env::var_os("PATH")?;
        env::split_paths(&dirs)
            .flat_map(|dir| EXE_NAMES.iter().map(move |name| dir.join(name)))
            .find(|candidate| candidate.is_file())
    }
}

/// ReFH2 command-line arguments, excluding the executable itself.
pub fn build_args(config: &RunConfig) -> Vec<String> {
    let return_periods = config
        .return_periods
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",");

    let mut args = vec![
        format!("--infile={}", config.descriptor.display()),
        format!("--outfile={}", config.output_file.display()),
        format!("--checksum={}", config.checksum),
        "--vendor=bmt".to_string(),
        "--mode=HYDROGRAPH".to_string(),
        format!("--returnperiods={return_periods}"),
        format!("--country={}", config.location.as_arg()),
        format!("--model={}", config.model.as_arg()),
        format!("--seasonality={}", config.season.as_arg()),
        "--plotscale=NO".to_string(),
        format!("--area={}", config.area),
        format!("--reportoutputfolder={}", config.output_dir().display()),
        format!("--rainmodel={}", config.rain_model),
    ];

    if let Some(storm) = &config.storm {
        args.push(format!("--duration={}", storm.duration));
        args.push(format!("--timestep={}", storm.timestep));
    }
    args
}

/// Executable named in the configuration, or whatever `resolver` finds.
pub fn locate(
    config: &RunConfig,
    resolver: &dyn ExecutableResolver,
    listener: &dyn ProgressListener,
) -> Result<PathBuf, Refh2Error> {
    if let Some(exe) = &config.exe {
        return Ok(exe.clone());
    }
    listener.notify(Progress::LocatingExecutable);
    let exe = resolver.resolve().ok_or(Refh2Error::ExecutableNotFound)?;
    info!("Found ReFH2 at {}", exe.display());
    Ok(exe)
}

/// Run ReFH2 to completion. Anything it prints is treated as an error.
pub fn run(
    config: &RunConfig,
    resolver: &dyn ExecutableResolver,
    listener: &dyn ProgressListener,
) -> Result<(), Refh2Error> {
    let exe = locate(config, resolver, listener)?;
    let args = build_args(config);
    debug!("{} {}", exe.display(), args.join(" "));

    listener.notify(Progress::ExternalRunStarted);
    execute(&exe, &args)
}

fn execute(exe: &Path, args: &[String]) -> Result<(), Refh2Error> {
    let mut command = Command::new(exe);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    hide_console(&mut command);

    let output = command.output().map_err(|source| Refh2Error::Launch {
        path: exe.to_path_buf(),
        source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        return Err(Refh2Error::External(stdout.trim().to_string()));
    }
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            format!("ReFH2 exited with {}", output.status)
        } else {
            stderr.trim().to_string()
        };
        return Err(Refh2Error::External(message));
    }
    info!("ReFH2 finished");
    Ok(())
}

#[cfg(windows)]
fn hide_console(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console(_command: &mut Command) {}

use std::io;
use std::path::{Path, PathBuf};

// Error type for every fallible operation in the crate.
#[derive(Debug, thiserror::Error)]
pub enum Refh2Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    // No ReFH2 executable could be located.
    #[error("Error: Cannot Find ReFH2.exe")]
    ExecutableNotFound,

    #[error("Error launching {}: {source}", .path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // ReFH2 wrote diagnostics (or failed) instead of running silently.
    #[error("{0}")]
    External(String),

    // The raw output did not contain enough rows to derive a timestep.
    #[error("Unexpected error calculating timestep from {}: {reason}", .path.display())]
    Timestep { path: PathBuf, reason: String },

    // A time token in the raw output could not be decoded.
    #[error("Error Formatting into TUFLOW: {0}")]
    TimeToken(#[from] crate::time::TimeParseError),

    // A raw row was shorter than the requested column layout.
    #[error(
        "Error Formatting into TUFLOW: line {line} of {} has {found} columns, expected at least {needed}",
        .path.display()
    )]
    RowTooShort {
        path: PathBuf,
        line: usize,
        needed: usize,
        found: usize,
    },

    // A boundary condition was requested but the converter produced no label for it.
    #[error("No {kind} column found in ReFH2 output header")]
    MissingSourceColumn { kind: &'static str },

    // The destination exists but cannot be replaced.
    #[error("{} Locked", .path.display())]
    Locked { path: PathBuf },

    #[error("Error Opening {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // The shapefile driver rejected a layer.
    #[error("Error writing {}: {message}", .path.display())]
    Gis { path: PathBuf, message: String },
}

impl Refh2Error {
    // Classify an I/O error against the file it concerns.
    pub fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            Refh2Error::Locked {
                path: path.to_path_buf(),
            }
        } else {
            Refh2Error::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn csv(path: &Path, source: csv::Error) -> Self {
        match source.into_kind() {
            csv::ErrorKind::Io(err) => Refh2Error::io(path, err),
            other => Refh2Error::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidData, format!("{other:?}")),
            },
        }
    }
}

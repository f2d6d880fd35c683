// Whole-file replacement so a failed write never leaves a truncated output.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::Refh2Error;

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("~{name}.tmp"))
}

/// Fail with `PermissionDenied` if `to` exists and is read-only.
pub fn ensure_replaceable(to: &Path) -> io::Result<()> {
    match fs::metadata(to) {
        Ok(meta) if meta.permissions().readonly() => {
            Err(io::Error::from(io::ErrorKind::PermissionDenied))
        }
        _ => Ok(()),
    }
}

/// Move `from` over `to`, refusing to touch a read-only destination.
pub fn replace(from: &Path, to: &Path) -> io::Result<()> {
    ensure_replaceable(to)?;
    fs::rename(from, to)
}

/// Write `contents` to `path` via a sibling staging file.
///
/// Errors always name `path`, never the staging file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), Refh2Error> {
    let staging = staging_path(path);
    let result = fs::write(&staging, contents).and_then(|_| replace(&staging, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&staging);
        return Err(Refh2Error::io(path, e));
    }
    Ok(())
}

//! Tracing setup for the `synq` binary.
//!
//! Logs go to `synq.log` in the XDG state directory. When that file cannot be
//! opened the same subscriber writes to stderr instead, so init never fails.

use anyhow::Result;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info,synq=debug";

/// Where [`init_logging`] ended up sending output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    /// The log file was unusable; carries the reason.
    Stderr(String),
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn default_log_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("synq")?;
    Ok(xdg_dirs.place_state_file("synq.log")?)
}

/// Open `path` for appending, creating missing parent directories.
fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber. Call once, first thing in `main`.
pub fn init_logging() -> LogTarget {
    let opened = default_log_path().and_then(|path| {
        let file = open_log_file(&path)?;
        Ok((path, file))
    });
    let (writer, target) = match opened {
        Ok((path, file)) => (BoxMakeWriter::new(Mutex::new(file)), LogTarget::File(path)),
        Err(e) => (BoxMakeWriter::new(io::stderr), LogTarget::Stderr(format!("{:#}", e))),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .init();

    match &target {
        LogTarget::File(path) => tracing::info!("synq logging to {}", path.display()),
        LogTarget::Stderr(reason) => {
            tracing::warn!(%reason, "log file unavailable, logging to stderr")
        }
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn log_file_is_created_and_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("synq").join("synq.log");

        writeln!(open_log_file(&path).unwrap(), "first").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn unusable_log_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        assert!(open_log_file(&blocker.join("synq.log")).is_err());
    }
}

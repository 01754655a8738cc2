//! Logging setup
//!
//! The TUI owns the terminal, so log lines go to a file instead of stderr.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `<data dir>/documind/documind.log`, falling back to the working directory.
pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("documind"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("documind.log")
}

/// Route `tracing` output to `path`. Default level `info`, overridable through `RUST_LOG`.
pub fn init(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(())
}

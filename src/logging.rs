// src/logging.rs
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE_NAME: &str = "StageFrost.log";
pub const LOG_ENV_VAR: &str = "STAGEFROST_LOG";

/// Sends `tracing` output to `<dir>/StageFrost.log`. The terminal belongs to
/// the UI, so nothing is written to stdout/stderr.
///
/// `STAGEFROST_LOG` overrides `default_level` when set.
pub fn init(dir: &Path, default_level: &str) -> Result<PathBuf> {
    let path = dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Cannot open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("Logging already initialised")?;

    Ok(path)
}

use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Sends tracing output to the configured log file. The terminal belongs to
/// the UI, so without a file nothing is logged. `RUST_LOG` wins over the
/// configured level.
pub fn init(cfg: &LogConfig) -> Result<()> {
    let Some(path) = cfg.file.as_ref() else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("logging: create {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("logging: open {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber installed earlier (tests, embedding) is left in place.
    let _ = tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_env_filter(filter)
        .try_init();

    tracing::info!(version = crate::VERSION, "repo-gallery starting");
    Ok(())
}

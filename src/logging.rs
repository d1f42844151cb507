// 📝 Run log - one timestamped file per ETL run

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "retail_etl=info";

/// `<log_dir>/log_etl_<YYYY_MM_DD_HH_MM_SS>.log`
pub fn log_file_path(log_dir: &Path, started_at: DateTime<Utc>) -> PathBuf {
    log_dir.join(format!(
        "log_etl_{}.log",
        started_at.format("%Y_%m_%d_%H_%M_%S")
    ))
}

/// Install the global subscriber writing to a fresh file under `log_dir`.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_file_logging(log_dir: &Path, started_at: DateTime<Utc>) -> Result<PathBuf> {
    let path = log_file_path(log_dir, started_at);
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file = File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(path)
}

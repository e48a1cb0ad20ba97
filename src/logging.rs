use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, NaiveDate};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::{DeployError, DeployResult};

/// `deploy_YYYYMMDD.log`
#[must_use]
pub fn log_file_name(date: NaiveDate) -> String {
    format!("deploy_{}.log", date.format("%Y%m%d"))
}

/// Install the global subscriber: timestamped lines on stdout, mirrored
/// to today's log file in `log_dir` (appended, never truncated).
///
/// The level defaults to `info` and follows `RUST_LOG` when set.
/// Returns the log file path.
pub fn init(log_dir: &Path) -> DeployResult<PathBuf> {
    std::fs::create_dir_all(log_dir)?;
    let path = log_dir.join(log_file_name(Local::now().date_naive()));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stdout),
        )
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|e| DeployError::Io(std::io::Error::other(e)))?;

    Ok(path)
}

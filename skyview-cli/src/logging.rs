//! File logging for the dashboard.
//!
//! The terminal belongs to the TUI, so records go to
//! `$SKYVIEW_HOME/logs/skyview.log` (default `~/.skyview/logs`).

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

pub const HOME_ENV: &str = "SKYVIEW_HOME";
pub const LOG_ENV: &str = "SKYVIEW_LOG";
const DEFAULT_LOG_FILTER: &str = "info";
const LOG_FILE: &str = "skyview.log";

pub struct LogConfig<'a> {
    pub verbose: bool,
    /// `log_level` from the config file
    pub level: Option<&'a str>,
}

/// Skyview home: `$SKYVIEW_HOME` or `~/.skyview`.
pub fn skyview_home() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var(HOME_ENV) {
        return Ok(PathBuf::from(override_path));
    }
    dirs::home_dir()
        .map(|home| home.join(".skyview"))
        .context("Could not determine home directory")
}

pub fn logs_dir() -> Result<PathBuf> {
    Ok(skyview_home()?.join("logs"))
}

/// Filter directive: `SKYVIEW_LOG`, then `--verbose`, then the config level.
pub fn filter_directive(env: Option<&str>, config: &LogConfig<'_>) -> String {
    if let Some(env) = env.map(str::trim).filter(|e| !e.is_empty()) {
        return env.to_string();
    }
    if config.verbose {
        return "debug".to_string();
    }
    config.level.unwrap_or(DEFAULT_LOG_FILTER).to_string()
}

fn open_log_file(dir: &Path) -> Result<fs::File> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
    let path = dir.join(LOG_FILE);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}

/// Install the global subscriber. Returns the log file path.
pub fn init_logging(config: LogConfig<'_>) -> Result<PathBuf> {
    let dir = logs_dir()?;
    let file = open_log_file(&dir)?;

    let env = std::env::var(LOG_ENV).ok();
    let directive = filter_directive(env.as_deref(), &config);
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("Invalid log filter: {directive}"))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_filter(filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(dir.join(LOG_FILE))
}

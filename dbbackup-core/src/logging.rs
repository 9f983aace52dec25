//! Logging setup for the dbbackup binary.
//!
//! Console output always goes to stderr/stdout through `tracing_subscriber`.
//! Backup runs additionally mirror every event into a per-run log file.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::Result;
use crate::backup::file_timestamp;
use crate::error::DbBackupError;

/// Maps CLI verbosity flags to a log level.
///
/// `quiet` wins over `verbose`; 0=INFO, 1=DEBUG, 2+=TRACE.
pub fn level_for(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    }
}

/// Initializes console-only logging.
///
/// # Example
/// ```rust,no_run
/// use dbbackup_core::logging::init_logging;
///
/// init_logging(1, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(level_for(verbose, quiet))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| {
            DbBackupError::configuration(format!("Failed to initialize logging: {}", e))
        })?;

    Ok(())
}

/// Path of the log file for a backup run started now.
pub fn backup_log_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("backup_log_{}.log", file_timestamp(Local::now())))
}

/// Initializes logging to the console and to a new file under `log_dir`.
///
/// The directory is created if needed and the file is opened in append
/// mode. Returns the log file path.
pub fn init_backup_logging(verbose: u8, quiet: bool, log_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir).map_err(|e| {
        DbBackupError::io(
            format!("Failed to create log folder {}", log_dir.display()),
            e,
        )
    })?;

    let path = backup_log_path(log_dir);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| DbBackupError::io(format!("Failed to open {}", path.display()), e))?;

    let console = fmt::layer().with_target(false);
    let logfile = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file));

    tracing_subscriber::registry()
        .with(console)
        .with(logfile)
        .with(LevelFilter::from_level(level_for(verbose, quiet)))
        .try_init()
        .map_err(|e| {
            DbBackupError::configuration(format!("Failed to initialize logging: {}", e))
        })?;

    Ok(path)
}

//! Default values and platform paths for configuration documents.
//!
//! # Design
//! - Centralize defaults so the seed document and normalisation agree.
//! - `ProgramData` (Windows) selects a machine-wide location; everything else is
//!   relative to the working directory.

use std::path::PathBuf;

/// Listen address used when the document leaves `WebListenAddr` empty.
pub const DEFAULT_WEB_LISTEN_ADDR: &str = "127.0.0.1:8123";
/// Scheduler interval written into a freshly created document.
pub const DEFAULT_INTERVAL_MINUTES: i64 = 5;
/// Archives kept per site when `Retention` is missing or non-positive.
pub const DEFAULT_RETENTION: i64 = 30;
/// Interval substituted for negative `IntervalMinutes` values.
pub(crate) const NEGATIVE_INTERVAL_FALLBACK: i64 = 1;

pub(crate) const EXAMPLE_SITE_NAME: &str = "Example Site";
pub(crate) const EXAMPLE_SITE_URL: &str = "http://example.com/backup.zip";

const PROGRAM_DATA_ENV: &str = "ProgramData";
const APP_DIR_NAME: &str = "httpBackupGo";

/// Backup root used when the document leaves `BackupFolder` empty.
#[must_use]
pub fn default_backup_folder() -> PathBuf {
    program_data_dir().map_or_else(|| PathBuf::from("Backups"), |dir| dir.join("Backups"))
}

/// Location of the configuration document when no override is supplied.
#[must_use]
pub fn default_config_path() -> PathBuf {
    program_data_dir().map_or_else(
        || PathBuf::from("config.json"),
        |dir| dir.join("config.json"),
    )
}

/// Location of the JSON log file when no override is supplied.
#[must_use]
pub fn default_log_path() -> PathBuf {
    program_data_dir().map_or_else(|| PathBuf::from("log.json"), |dir| dir.join("log.json"))
}

fn program_data_dir() -> Option<PathBuf> {
    program_data_dir_from(std::env::var(PROGRAM_DATA_ENV).ok().as_deref())
}

fn program_data_dir_from(value: Option<&str>) -> Option<PathBuf> {
    value
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| PathBuf::from(raw).join(APP_DIR_NAME))
}

//! Archive file naming.

use chrono::{DateTime, Local};

/// Extension shared by every finished archive.
pub const ARCHIVE_SUFFIX: &str = ".zip";
const TIMESTAMP_FORMAT: &str = "%d-%m-%Y_%H-%M-%S";

/// Prefix shared by every archive of `site`.
#[must_use]
pub fn archive_prefix(site: &str) -> String {
    format!("backup_{site}_")
}

/// `backup_<site>_<DD-MM-YYYY_HH-mm-ss>.zip` for the given local wall-clock time.
#[must_use]
pub fn archive_file_name(site: &str, at: DateTime<Local>) -> String {
    format!(
        "{}{}{ARCHIVE_SUFFIX}",
        archive_prefix(site),
        at.format(TIMESTAMP_FORMAT)
    )
}

/// Whether `file_name` is a finished archive belonging to `site`.
#[must_use]
pub fn is_archive_of(file_name: &str, site: &str) -> bool {
    file_name.starts_with(&archive_prefix(site)) && file_name.ends_with(ARCHIVE_SUFFIX)
}

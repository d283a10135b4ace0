//! Scratch directories and seeded archive fixtures.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Temporary backup root that is removed when dropped.
#[derive(Debug)]
pub struct ScratchRoot {
    dir: TempDir,
}

impl ScratchRoot {
    /// Create a fresh scratch directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("httpbackup-test-")
            .tempdir()
            .context("failed to create scratch directory")?;
        Ok(Self { dir })
    }

    /// Root path of the scratch directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the per-site directory, created on demand.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn site_dir(&self, site: &str) -> Result<PathBuf> {
        let dir = self.dir.path().join(site);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create site dir {}", dir.display()))?;
        Ok(dir)
    }
}

/// Archive file name for `site` with a caller-supplied timestamp segment.
#[must_use]
pub fn archive_name(site: &str, stamp: &str) -> String {
    format!("backup_{site}_{stamp}.zip")
}

/// Write a file under `dir` and back-date its modification time by `age`.
///
/// # Errors
///
/// Returns an error if the file cannot be written or its mtime cannot be set.
pub fn seed_file(dir: &Path, name: &str, age: Duration) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, name.as_bytes())
        .with_context(|| format!("failed to seed {}", path.display()))?;
    let modified = SystemTime::now()
        .checked_sub(age)
        .context("age precedes the unix epoch")?;
    File::options()
        .write(true)
        .open(&path)
        .and_then(|file| file.set_modified(modified))
        .with_context(|| format!("failed to set mtime on {}", path.display()))?;
    Ok(path)
}

/// Seed `count` archives for `site`, oldest first, spaced one minute apart.
///
/// Returns the paths in seeding order, so the last entry is the newest.
///
/// # Errors
///
/// Returns an error if any archive cannot be written.
pub fn seed_archives(dir: &Path, site: &str, count: u32) -> Result<Vec<PathBuf>> {
    (0..count)
        .map(|index| {
            let stamp = format!("01-01-2024_00-{index:02}-00");
            let age = Duration::from_secs(u64::from(count - index) * 60);
            seed_file(dir, &archive_name(site, &stamp), age)
        })
        .collect()
}

/// Sorted file names directly inside `dir`.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed.
pub fn file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
        .map(|entry| entry.map(|entry| entry.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_archives_age_in_order() -> Result<()> {
        let root = ScratchRoot::new()?;
        let dir = root.site_dir("alpha")?;
        let paths = seed_archives(&dir, "alpha", 3)?;

        let mtimes = paths
            .iter()
            .map(|path| fs::metadata(path).and_then(|meta| meta.modified()))
            .collect::<std::io::Result<Vec<_>>>()?;
        assert!(mtimes[0] < mtimes[1]);
        assert!(mtimes[1] < mtimes[2]);
        assert_eq!(file_names(&dir)?.len(), 3);
        Ok(())
    }
}

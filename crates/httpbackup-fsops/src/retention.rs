//! Per-site archive retention.
//!
//! # Design
//! - Only regular files named `backup_<site>_*.zip` directly inside the site directory
//!   are candidates; everything else is left alone.
//! - Candidates are listed in file-name order and then stably sorted by modification
//!   time, so equal mtimes fall back to name order.
//! - Deletions are independent. A failed deletion is recorded in the outcome and the
//!   pass continues; only a failure to list the directory is an error.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{FsOpsError, FsOpsResult};
use crate::naming::is_archive_of;

/// Result of one retention pass.
#[derive(Debug, Default)]
pub struct RetentionOutcome {
    /// Matching archives found before pruning.
    pub matched: usize,
    /// Archives that were deleted, oldest first.
    pub removed: Vec<PathBuf>,
    /// Archives that could not be deleted.
    pub failures: Vec<RetentionFailure>,
}

/// An archive that retention tried and failed to delete.
#[derive(Debug)]
pub struct RetentionFailure {
    /// Archive path.
    pub path: PathBuf,
    /// Underlying error.
    pub error: FsOpsError,
}

impl RetentionOutcome {
    /// Whether every selected deletion succeeded.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Delete the oldest archives of `site_name` in `site_dir` beyond the newest `keep`.
///
/// `keep <= 0` is a no-op.
///
/// # Errors
///
/// Returns an error only when the directory cannot be listed.
pub fn cleanup(site_dir: &Path, site_name: &str, keep: i64) -> FsOpsResult<RetentionOutcome> {
    let mut outcome = RetentionOutcome::default();
    let Ok(keep) = usize::try_from(keep) else {
        return Ok(outcome);
    };
    if keep == 0 {
        return Ok(outcome);
    }

    let mut candidates = list_archives(site_dir, site_name)?;
    outcome.matched = candidates.len();
    if candidates.len() <= keep {
        debug!(site = site_name, matched = outcome.matched, keep, "retention: nothing to prune");
        return Ok(outcome);
    }

    candidates.sort_by_key(|(_, modified)| *modified);
    let excess = candidates.len() - keep;
    prune(site_name, candidates, excess, &mut outcome, |path| std::fs::remove_file(path));
    Ok(outcome)
}

/// Delete the first `excess` candidates with `remove`; a failure does not stop the rest.
fn prune(
    site_name: &str,
    candidates: Vec<(PathBuf, SystemTime)>,
    excess: usize,
    outcome: &mut RetentionOutcome,
    remove: impl Fn(&Path) -> io::Result<()>,
) {
    for (path, _) in candidates.into_iter().take(excess) {
        match remove(&path) {
            Ok(()) => {
                info!(site = site_name, path = %path.display(), "retention: removed archive");
                outcome.removed.push(path);
            }
            Err(source) => {
                warn!(
                    site = site_name,
                    path = %path.display(),
                    error = %source,
                    "retention: failed to remove archive"
                );
                outcome.failures.push(RetentionFailure {
                    error: FsOpsError::io("retention.remove", &path, source),
                    path,
                });
            }
        }
    }
}

fn list_archives(site_dir: &Path, site_name: &str) -> FsOpsResult<Vec<(PathBuf, SystemTime)>> {
    let mut archives = Vec::new();
    let walker = WalkDir::new(site_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|source| FsOpsError::walkdir("retention.list", site_dir, source))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !is_archive_of(name, site_name) {
            continue;
        }
        let modified = match entry.metadata().map(|meta| meta.modified()) {
            Ok(Ok(modified)) => modified,
            Ok(Err(err)) => {
                warn!(path = %entry.path().display(), error = %err, "retention: mtime unavailable");
                continue;
            }
            Err(err) => {
                warn!(path = %entry.path().display(), error = %err, "retention: metadata unavailable");
                continue;
            }
        };
        archives.push((entry.into_path(), modified));
    }
    Ok(archives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpbackup_test_support::fixtures::{
        ScratchRoot, archive_name, file_names, seed_archives, seed_file,
    };
    use std::time::Duration;

    #[test]
    fn keeps_newest_archives_and_ignores_others() -> anyhow::Result<()> {
        let root = ScratchRoot::new()?;
        let dir = root.site_dir("shop")?;
        let seeded = seed_archives(&dir, "shop", 5)?;
        seed_file(&dir, "notes.txt", Duration::from_secs(10_000))?;
        seed_file(&dir, &archive_name("other", "old"), Duration::from_secs(10_000))?;
        seed_file(&dir, "backup_shop_partial.zip.tmp", Duration::from_secs(10_000))?;

        let outcome = cleanup(&dir, "shop", 2)?;
        assert_eq!(outcome.matched, 5);
        assert_eq!(outcome.removed, seeded[..3]);
        assert!(outcome.is_clean());

        let remaining = file_names(&dir)?;
        assert!(remaining.contains(&"notes.txt".to_string()));
        assert!(remaining.contains(&archive_name("other", "old")));
        assert!(remaining.contains(&"backup_shop_partial.zip.tmp".to_string()));
        for kept in &seeded[3..] {
            assert!(kept.exists());
        }
        Ok(())
    }

    #[test]
    fn non_positive_keep_leaves_everything() -> anyhow::Result<()> {
        let root = ScratchRoot::new()?;
        let dir = root.site_dir("shop")?;
        seed_archives(&dir, "shop", 3)?;

        for keep in [0, -4] {
            let outcome = cleanup(&dir, "shop", keep)?;
            assert!(outcome.removed.is_empty());
        }
        assert_eq!(file_names(&dir)?.len(), 3);
        Ok(())
    }

    #[test]
    fn count_within_keep_is_noop() -> anyhow::Result<()> {
        let root = ScratchRoot::new()?;
        let dir = root.site_dir("shop")?;
        seed_archives(&dir, "shop", 2)?;

        let outcome = cleanup(&dir, "shop", 2)?;
        assert_eq!(outcome.matched, 2);
        assert!(outcome.removed.is_empty());
        Ok(())
    }

    #[test]
    fn failed_delete_does_not_stop_the_rest() -> anyhow::Result<()> {
        let root = ScratchRoot::new()?;
        let dir = root.site_dir("shop")?;
        let seeded = seed_archives(&dir, "shop", 4)?;
        let candidates = list_archives(&dir, "shop")?;
        let locked = seeded[0].clone();

        let mut outcome = RetentionOutcome::default();
        prune("shop", candidates, 3, &mut outcome, |path| {
            if path == locked.as_path() {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "in use"))
            } else {
                std::fs::remove_file(path)
            }
        });

        assert!(!outcome.is_clean());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].path, seeded[0]);
        assert_eq!(
            outcome.failures[0].error.operation(),
            Some("retention.remove")
        );
        assert_eq!(outcome.removed, seeded[1..3]);
        assert!(seeded[0].exists());
        assert!(seeded[3].exists());
        Ok(())
    }

    #[test]
    fn missing_directory_is_a_listing_error() -> anyhow::Result<()> {
        let root = ScratchRoot::new()?;
        let err = cleanup(&root.path().join("absent"), "shop", 1).expect_err("listing fails");
        assert_eq!(err.operation(), Some("retention.list"));
        Ok(())
    }
}

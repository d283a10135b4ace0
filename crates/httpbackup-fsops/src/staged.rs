//! Atomic archive writes.
//!
//! # Design
//! - Bytes land in `<final>.tmp`; only [`StagedFile::commit`] makes the final path
//!   visible, via flush, sync and rename.
//! - Dropping an uncommitted stage removes the temp file, so every early return and
//!   cancelled future cleans up after itself.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{FsOpsError, FsOpsResult};

/// Suffix appended to the final path while the archive is being written.
pub const STAGING_SUFFIX: &str = ".tmp";

/// `<path>.tmp`.
#[must_use]
pub fn staging_path(path: &Path) -> PathBuf {
    let mut raw = OsString::from(path.as_os_str());
    raw.push(STAGING_SUFFIX);
    PathBuf::from(raw)
}

/// A file being written under a temporary name.
#[derive(Debug)]
pub struct StagedFile {
    final_path: PathBuf,
    staging_path: PathBuf,
    file: Option<File>,
    written: u64,
    committed: bool,
}

impl StagedFile {
    /// Create (or truncate) the staging file for `final_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the staging file cannot be created.
    pub async fn create(final_path: impl Into<PathBuf>) -> FsOpsResult<Self> {
        let final_path = final_path.into();
        let staging_path = staging_path(&final_path);
        let file = File::create(&staging_path)
            .await
            .map_err(|source| FsOpsError::io("staged.create", &staging_path, source))?;
        Ok(Self {
            final_path,
            staging_path,
            file: Some(file),
            written: 0,
            committed: false,
        })
    }

    /// Append `chunk` to the staging file.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> FsOpsResult<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(FsOpsError::AlreadyFinished {
                path: self.final_path.clone(),
            });
        };
        file.write_all(chunk)
            .await
            .map_err(|source| FsOpsError::io("staged.write", &self.staging_path, source))?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Bytes written so far.
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Path the archive will occupy once committed.
    #[must_use]
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Flush, sync and rename the staging file onto the final path.
    ///
    /// On failure the staging file is removed when `self` drops.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing, syncing or renaming fails.
    pub async fn commit(mut self) -> FsOpsResult<PathBuf> {
        let Some(mut file) = self.file.take() else {
            return Err(FsOpsError::AlreadyFinished {
                path: self.final_path.clone(),
            });
        };
        file.flush()
            .await
            .map_err(|source| FsOpsError::io("staged.flush", &self.staging_path, source))?;
        file.sync_all()
            .await
            .map_err(|source| FsOpsError::io("staged.sync", &self.staging_path, source))?;
        drop(file);

        fs::rename(&self.staging_path, &self.final_path)
            .await
            .map_err(|source| FsOpsError::io("staged.rename", &self.final_path, source))?;
        self.committed = true;
        Ok(self.final_path.clone())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        drop(self.file.take());
        match std::fs::remove_file(&self.staging_path) {
            Ok(()) => debug!(path = %self.staging_path.display(), "removed staging file"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(
                path = %self.staging_path.display(),
                error = %err,
                "failed to remove staging file"
            ),
        }
    }
}

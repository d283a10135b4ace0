//! Assertions over backup directory trees.

use std::path::Path;

use anyhow::{Result, ensure};

use crate::fixtures::file_names;

/// Fail when any `.tmp` staging file remains directly inside `dir`.
///
/// A missing directory counts as clean.
///
/// # Errors
///
/// Returns an error naming the leftover files, or if the directory cannot be listed.
pub fn no_staging_files(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    let leftovers: Vec<_> = file_names(dir)?
        .into_iter()
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    ensure!(
        leftovers.is_empty(),
        "staging files left in {}: {leftovers:?}",
        dir.display()
    );
    Ok(())
}

/// Names of finished archives (`.zip`) directly inside `dir`, sorted.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be listed.
pub fn archives(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    Ok(file_names(dir)?
        .into_iter()
        .filter(|name| name.ends_with(".zip"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::ScratchRoot;

    #[test]
    fn staging_files_are_reported() -> Result<()> {
        let root = ScratchRoot::new()?;
        std::fs::write(root.path().join("a.zip"), b"ok")?;
        no_staging_files(root.path())?;
        assert_eq!(archives(root.path())?, ["a.zip"]);

        std::fs::write(root.path().join("a.zip.tmp"), b"partial")?;
        assert!(no_staging_files(root.path()).is_err());
        assert!(no_staging_files(&root.path().join("missing")).is_ok());
        Ok(())
    }
}

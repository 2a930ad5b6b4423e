//! File persistence for migrated configurations.
//!
//! The write path never touches the original file until the final rename:
//! the new content goes to a `.work` sibling, the original is copied to a
//! version-tagged backup, and the rename is the single mutation of the
//! target path. A failure at any step leaves the original byte-identical.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::version::ProductVersion;

pub struct Storage {
    file_path: PathBuf,
}

impl Storage {
    pub fn new(file_path: impl AsRef<Path>) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Transient sibling the new content is written to before the rename.
    pub fn work_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.work", self.file_path.display()))
    }

    /// Permanent backup of the pre-migration content, tagged with the
    /// previous product version.
    pub fn backup_path(&self, previous_version: &ProductVersion) -> PathBuf {
        PathBuf::from(format!("{}.{previous_version}", self.file_path.display()))
    }

    pub fn load(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.file_path)?)
    }

    /// Replace the file with `content`: temp write, backup copy, then an
    /// atomic rename over the original.
    pub fn replace(&self, content: &str, previous_version: &ProductVersion) -> Result<()> {
        let work_path = self.work_path();
        fs::write(&work_path, content)?;

        let backup_path = self.backup_path(previous_version);
        fs::copy(&self.file_path, &backup_path)?;

        fs::rename(&work_path, &self.file_path)?;
        info!(
            path = %self.file_path.display(),
            backup = %backup_path.display(),
            "configuration file replaced"
        );
        Ok(())
    }
}

use std::path::{Path, PathBuf};

use tracing::info;

use super::model::ProfileRecord;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::VersionChecker;

/// Sub-directories every new profile starts with.
const PROFILE_SUBDIRS: [&str; 2] = ["devices", "plugins"];

/// Manages profile directories on disk.
pub struct ProfileManager {
    checker: VersionChecker,
}

impl ProfileManager {
    pub fn new(checker: VersionChecker) -> Self {
        Self { checker }
    }

    pub fn checker(&self) -> &VersionChecker {
        &self.checker
    }

    /// Create a new profile directory.
    ///
    /// Creates:
    /// - `<profile>/devices/`
    /// - `<profile>/plugins/`
    /// - `<profile>/RELEASE-VERSION`
    ///
    /// A non-empty directory is only reused when `overwrite` is set.
    pub fn create(&self, dir: &Path, overwrite: bool) -> LauncherResult<ProfileRecord> {
        let dir = Self::safe_path(dir);

        if !overwrite && !is_empty_dir(&dir)? {
            return Err(LauncherError::ProfileNotEmpty(dir));
        }

        for subdir in PROFILE_SUBDIRS {
            create_dir_safe(&dir.join(subdir))?;
        }
        self.checker.verify_or_create(&dir)?;

        info!("Created profile {:?}", dir);
        Ok(ProfileRecord::new(&dir).with_major_version(Some(self.checker.installed_major_version())))
    }

    /// Register an existing profile directory, recording a marker if it has none.
    pub fn import(&self, dir: &Path) -> LauncherResult<ProfileRecord> {
        let dir = Self::safe_path(dir);
        if !dir.is_dir() {
            return Err(LauncherError::ProfileNotFound(dir));
        }

        self.checker.verify_or_create(&dir)?;

        info!("Imported profile {:?}", dir);
        Ok(ProfileRecord::new(&dir).with_major_version(self.checker.profile_major_version(&dir)))
    }

    /// Delete a profile directory and everything in it.
    pub fn delete_data(&self, dir: &Path) -> LauncherResult<()> {
        if !dir.exists() {
            return Err(LauncherError::ProfileNotFound(dir.to_path_buf()));
        }
        std::fs::remove_dir_all(dir).map_err(|source| LauncherError::io(dir, source))?;
        info!("Deleted profile data {:?}", dir);
        Ok(())
    }

    /// Canonicalize a path if it exists, otherwise keep it as given.
    pub fn safe_path(path: &Path) -> PathBuf {
        match std::fs::canonicalize(path) {
            Ok(p) => p,
            Err(_) => path.to_path_buf(),
        }
    }
}

fn is_empty_dir(dir: &Path) -> LauncherResult<bool> {
    if !dir.exists() {
        return Ok(true);
    }
    let mut entries = std::fs::read_dir(dir).map_err(|source| LauncherError::io(dir, source))?;
    Ok(entries.next().is_none())
}

fn create_dir_safe(path: &Path) -> LauncherResult<()> {
    std::fs::create_dir_all(path).map_err(|source| LauncherError::io(path, source))
}

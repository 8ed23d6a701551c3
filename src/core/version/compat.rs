// ─── Profile Compatibility ───
// Each profile records the major version it was created/verified against in
// a `RELEASE-VERSION` marker. A profile is only usable with an installed
// application of the same major version.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::number::{major_version, PackageVersion};
use crate::core::error::{LauncherError, LauncherResult};

pub const MARKER_FILE: &str = "RELEASE-VERSION";

/// Compares profiles against the installed application version.
#[derive(Debug, Clone)]
pub struct VersionChecker {
    installed: PackageVersion,
}

impl VersionChecker {
    pub fn new(installed: PackageVersion) -> Self {
        Self { installed }
    }

    pub fn from_version_str(installed: &str) -> LauncherResult<Self> {
        Ok(Self::new(installed.parse()?))
    }

    pub fn installed_major_version(&self) -> u32 {
        self.installed.major()
    }

    pub fn marker_path(profile: &Path) -> PathBuf {
        profile.join(MARKER_FILE)
    }

    /// Major version recorded in the profile marker.
    ///
    /// A missing, unreadable or unparseable marker yields `None`.
    pub fn profile_major_version(&self, profile: &Path) -> Option<u32> {
        let marker = Self::marker_path(profile);
        match std::fs::read_to_string(&marker) {
            Ok(contents) => {
                let major = major_version(contents.trim());
                if major.is_none() {
                    debug!("Ignoring unparseable marker {:?}: {:?}", marker, contents);
                }
                major
            }
            Err(_) => None,
        }
    }

    /// Write a marker if the profile has none, otherwise check it.
    pub fn verify_or_create(&self, profile: &Path) -> LauncherResult<()> {
        let marker = Self::marker_path(profile);
        let installed_major = self.installed_major_version();

        if !marker.exists() {
            std::fs::write(&marker, format!("{}\n", installed_major))
                .map_err(|source| LauncherError::io(&marker, source))?;
            info!(
                "Recorded major version {} for profile {:?}",
                installed_major, profile
            );
            return Ok(());
        }

        let contents =
            std::fs::read_to_string(&marker).map_err(|source| LauncherError::io(&marker, source))?;
        let profile_major =
            major_version(contents.trim()).ok_or_else(|| LauncherError::InvalidMarker {
                path: marker.clone(),
                contents: contents.trim().to_string(),
            })?;

        if profile_major != installed_major {
            return Err(LauncherError::VersionMismatch {
                path: profile.to_path_buf(),
                profile_major,
                installed_major,
            });
        }
        Ok(())
    }
}

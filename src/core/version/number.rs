// ─── Package Versions ───
// Package-manager version strings (e.g. "2.0", "2.10.1", "2.0.post4",
// "2.1rc1") parsed and ordered as PEP 440 versions.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use pep440_rs::Version;

use crate::core::error::LauncherError;

/// A parsed package version that remembers how it was written.
///
/// Equality and ordering follow PEP 440, so `2.0 == 2.0.0` and
/// `2.1rc1 < 2.1 < 2.1.post1`.
#[derive(Debug, Clone)]
pub struct PackageVersion {
    raw: String,
    version: Version,
}

impl PackageVersion {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let version = Version::from_str(trimmed).ok()?;
        Some(Self {
            raw: trimmed.to_string(),
            version,
        })
    }

    /// Leading release component, used to gate compatibility.
    pub fn major(&self) -> u32 {
        self.version
            .release()
            .first()
            .map(|&n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(0)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Major version of a version string, `None` when it cannot be parsed.
pub fn major_version(raw: &str) -> Option<u32> {
    PackageVersion::parse(raw).map(|v| v.major())
}

impl FromStr for PackageVersion {
    type Err = LauncherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| LauncherError::InvalidVersion(s.to_string()))
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version.cmp(&other.version)
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for PackageVersion {}

// ─── Latest Version Cache ───
// Records the newest remote release that shares the installed major version
// in `<config>/<major>.0/latest-version.json`. Refreshing is best effort:
// every failure is logged and swallowed.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::core::conda::{PackageManager, VersionInfo};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::PackageVersion;

pub const LATEST_VERSION_FILE: &str = "latest-version.json";

type RemoveFile = fn(&Path) -> io::Result<()>;

fn remove_file(path: &Path) -> io::Result<()> {
    std::fs::remove_file(path)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedVersion {
    pub version: String,
}

/// What a cache refresh did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The cached value already matched.
    Unchanged(String),
    /// A new value was written.
    Written(String),
    /// A new value was computed but could not be written.
    WriteFailed(String),
    /// No value could be computed this cycle.
    Skipped(String),
}

/// Newest version in `info` whose major component is `installed_major`.
///
/// Versions are ordered by their parsed value before picking the last, so
/// the result does not depend on the order the package manager lists them.
pub fn latest_compatible_version(info: &VersionInfo, installed_major: u32) -> Option<String> {
    let mut compatible: Vec<PackageVersion> = info
        .versions
        .iter()
        .filter_map(|raw| PackageVersion::parse(raw))
        .filter(|v| v.major() == installed_major)
        .collect();
    compatible.sort();
    compatible.pop().map(|v| v.as_str().to_string())
}

pub fn query_latest_compatible_version(
    package_manager: &dyn PackageManager,
    package: &str,
    installed_major: u32,
) -> LauncherResult<Option<String>> {
    let info = package_manager.search(package)?;
    Ok(latest_compatible_version(&info, installed_major))
}

/// Read the cached record, deleting the file if it is not a valid record.
pub fn read_cache(cache_path: &Path) -> Option<CachedVersion> {
    read_cache_with(cache_path, remove_file)
}

fn read_cache_with(cache_path: &Path, remove: RemoveFile) -> Option<CachedVersion> {
    if !cache_path.is_file() {
        return None;
    }

    let parsed = std::fs::read_to_string(cache_path)
        .map_err(|e| LauncherError::io(cache_path, e))
        .and_then(|raw| Ok(serde_json::from_str::<CachedVersion>(&raw)?));

    match parsed {
        Ok(cached) => Some(cached),
        Err(e) => {
            warn!("Corrupted version cache {:?}: {}", cache_path, e);
            if let Err(remove_err) = remove(cache_path) {
                error!(
                    "Could not delete malformed version cache {:?}: {}",
                    cache_path, remove_err
                );
            }
            None
        }
    }
}

fn write_cache(cache_path: &Path, cached: &CachedVersion) -> LauncherResult<()> {
    if let Some(parent) = cache_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(cached)?;
    std::fs::write(cache_path, json).map_err(|e| LauncherError::io(cache_path, e))
}

/// Look up the newest `package` release for `installed_major` and cache it.
///
/// The file is only rewritten when the value changed.
pub fn refresh_cache(
    package_manager: &dyn PackageManager,
    package: &str,
    installed_major: u32,
    cache_path: &Path,
) -> RefreshOutcome {
    refresh_cache_with(package_manager, package, installed_major, cache_path, remove_file)
}

fn refresh_cache_with(
    package_manager: &dyn PackageManager,
    package: &str,
    installed_major: u32,
    cache_path: &Path,
    remove: RemoveFile,
) -> RefreshOutcome {
    let latest = match query_latest_compatible_version(package_manager, package, installed_major) {
        Ok(latest) => latest,
        Err(e @ LauncherError::PackageManagerUnavailable { .. }) => {
            error!("Cannot refresh version cache: {}", e);
            return RefreshOutcome::Skipped(e.to_string());
        }
        Err(e) => {
            info!("Skipping version cache refresh: {}", e);
            return RefreshOutcome::Skipped(e.to_string());
        }
    };

    let Some(latest) = latest else {
        let reason = format!("no {} release for major version {}", package, installed_major);
        info!("Skipping version cache refresh: {}", reason);
        return RefreshOutcome::Skipped(reason);
    };

    let cached = read_cache_with(cache_path, remove);
    if cached.as_ref().map(|c| c.version.as_str()) == Some(latest.as_str()) {
        debug!("Version cache {:?} already at {}", cache_path, latest);
        return RefreshOutcome::Unchanged(latest);
    }

    match write_cache(
        cache_path,
        &CachedVersion {
            version: latest.clone(),
        },
    ) {
        Ok(()) => {
            info!("Cached latest {} version {} in {:?}", package, latest, cache_path);
            RefreshOutcome::Written(latest)
        }
        Err(e) => {
            error!("Error caching latest version: {}", e);
            RefreshOutcome::WriteFailed(latest)
        }
    }
}

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{info, warn};

use super::manager::ProfileManager;
use super::model::{ProfileRecord, StoredProfile};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::VersionChecker;

/// Which records `Registry::filter_invalid` removes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterOptions {
    /// Drop records whose directory no longer exists.
    pub drop_missing: bool,
    /// Drop records whose marker disagrees with the installed major version.
    pub drop_mismatch: bool,
}

/// Ordered, immutable list of profile records.
///
/// Every operation returns a new registry; the persisted file is always
/// written from an explicit snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    records: Vec<ProfileRecord>,
}

impl Registry {
    /// Build a registry, collapsing duplicate paths.
    pub fn new(records: Vec<ProfileRecord>) -> Self {
        Self { records }.dedup()
    }

    /// Registry holding only the default profile.
    pub fn seeded(default_profile: &Path) -> Self {
        Self {
            records: vec![ProfileRecord::new(default_profile)],
        }
    }

    pub fn records(&self) -> &[ProfileRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first(&self) -> Option<&ProfileRecord> {
        self.records.first()
    }

    pub fn get(&self, path: &Path) -> Option<&ProfileRecord> {
        self.records.iter().find(|r| r.path == path)
    }

    // ── Persistence ─────────────────────────────────────

    /// Load the registry from `storage_path`.
    ///
    /// A missing, empty or unreadable file yields a registry seeded with
    /// `default_profile`. Stored paths that exist are canonicalized before
    /// duplicates are collapsed, matching the paths `create` and `import`
    /// record. Major versions are always recomputed from the profile markers.
    pub fn load(storage_path: &Path, default_profile: &Path, checker: &VersionChecker) -> Self {
        let registry = match read_stored(storage_path) {
            Ok(Some(stored)) if !stored.is_empty() => Self::new(
                stored
                    .into_iter()
                    .map(ProfileRecord::from)
                    .map(|mut record| {
                        record.path = ProfileManager::safe_path(&record.path);
                        record
                    })
                    .collect(),
            ),
            Ok(_) => {
                info!(
                    "No saved profiles at {:?}, using default profile {:?}",
                    storage_path, default_profile
                );
                Self::seeded(default_profile)
            }
            Err(e) => {
                warn!(
                    "Cannot load profiles from {:?}: {}. Using default profile {:?}",
                    storage_path, e, default_profile
                );
                Self::seeded(default_profile)
            }
        };
        registry.with_recomputed_versions(checker)
    }

    /// Write the persisted fields of every record, in current order.
    pub fn save(&self, storage_path: &Path) -> LauncherResult<()> {
        let stored: Vec<StoredProfile> = self.records.iter().map(StoredProfile::from).collect();
        let json = serde_json::to_string_pretty(&stored)?;

        if let Some(parent) = storage_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        std::fs::write(storage_path, json).map_err(|e| LauncherError::io(storage_path, e))?;

        info!("Saved {} profiles to {:?}", self.records.len(), storage_path);
        Ok(())
    }

    // ── Pure transformations ────────────────────────────

    /// Keep the first record for each path.
    pub fn dedup(&self) -> Self {
        let mut seen = HashSet::new();
        let records = self
            .records
            .iter()
            .filter(|r| seen.insert(r.path.clone()))
            .cloned()
            .collect();
        Self { records }
    }

    pub fn with_recomputed_versions(&self, checker: &VersionChecker) -> Self {
        let records = self
            .records
            .iter()
            .map(|r| {
                r.clone()
                    .with_major_version(checker.profile_major_version(&r.path))
            })
            .collect();
        Self { records }
    }

    /// Remove records per `options`.
    ///
    /// A record without a marker is never dropped for a version mismatch,
    /// only for a missing directory.
    pub fn filter_invalid(&self, options: FilterOptions, checker: &VersionChecker) -> Self {
        let installed_major = checker.installed_major_version();
        let records = self
            .records
            .iter()
            .filter_map(|r| {
                if options.drop_missing && !r.path.is_dir() {
                    info!("Dropping missing profile {:?}", r.path);
                    return None;
                }
                let major = checker.profile_major_version(&r.path);
                if options.drop_mismatch {
                    if let Some(major) = major.filter(|m| *m != installed_major) {
                        warn!(
                            "Dropping profile {:?}: major version {} does not match installed {}",
                            r.path, major, installed_major
                        );
                        return None;
                    }
                }
                Some(r.clone().with_major_version(major))
            })
            .collect();
        Self { records }
    }

    /// Most recently used first; records never used go last.
    pub fn sort_by_recency(&self) -> Self {
        let mut records = self.records.clone();
        // `None < Some(_)`, so reversing the comparison puts unused records last.
        records.sort_by(|a, b| b.used_timestamp.cmp(&a.used_timestamp));
        Self { records }
    }

    /// Append a record, keeping an existing entry with the same path.
    pub fn with_profile(&self, record: ProfileRecord) -> Self {
        let mut records = self.records.clone();
        records.push(record);
        Self { records }.dedup()
    }

    pub fn without(&self, path: &Path) -> Self {
        let records = self
            .records
            .iter()
            .filter(|r| r.path != path)
            .cloned()
            .collect();
        Self { records }
    }

    /// Record a successful launch of `path`.
    pub fn touched(&self, path: &Path, used: NaiveDateTime) -> Self {
        let records = self
            .records
            .iter()
            .map(|r| {
                if r.path == path {
                    r.clone().with_used_timestamp(Some(used))
                } else {
                    r.clone()
                }
            })
            .collect();
        Self { records }
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.records.iter().map(|r| r.path.clone()).collect()
    }
}

fn read_stored(storage_path: &Path) -> LauncherResult<Option<Vec<StoredProfile>>> {
    if !storage_path.exists() {
        return Ok(None);
    }
    let json =
        std::fs::read_to_string(storage_path).map_err(|e| LauncherError::io(storage_path, e))?;
    if json.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&json)?))
}

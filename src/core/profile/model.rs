use chrono::{NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Timestamp layout used in the registry file, e.g. `2024-03-01 14:22:05.123456`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// One entry of the profile registry. Unique key is `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub path: PathBuf,
    /// Major version read from the profile marker, recomputed on load.
    pub major_version: Option<u32>,
    /// Last successful launch.
    pub used_timestamp: Option<NaiveDateTime>,
}

impl ProfileRecord {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            major_version: None,
            used_timestamp: None,
        }
    }

    pub fn with_major_version(mut self, major: Option<u32>) -> Self {
        self.major_version = major;
        self
    }

    pub fn with_used_timestamp(mut self, used: Option<NaiveDateTime>) -> Self {
        self.used_timestamp = used;
        self
    }

    /// Last-used time as shown to the user, without sub-second digits.
    pub fn last_used_label(&self) -> String {
        self.used_timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".into())
    }
}

/// Current local time at the precision stored on disk.
pub fn now_timestamp() -> NaiveDateTime {
    chrono::Local::now().naive_local().trunc_subsecs(6)
}

pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Accepts the stored layout, a layout without fractional seconds and RFC 3339.
/// Empty strings and placeholder values (`nan`, `None`) are absent timestamps.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") || raw == "None" {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|t| t.naive_local())
        })
}

/// On-disk form of a record: every field is a string, absent values are empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredProfile {
    pub path: String,
    #[serde(default)]
    pub major_version: String,
    #[serde(default)]
    pub used_timestamp: String,
}

impl From<&ProfileRecord> for StoredProfile {
    fn from(record: &ProfileRecord) -> Self {
        Self {
            path: record.path.to_string_lossy().into_owned(),
            major_version: record
                .major_version
                .map(|m| m.to_string())
                .unwrap_or_default(),
            used_timestamp: record
                .used_timestamp
                .as_ref()
                .map(format_timestamp)
                .unwrap_or_default(),
        }
    }
}

impl From<StoredProfile> for ProfileRecord {
    fn from(stored: StoredProfile) -> Self {
        Self {
            path: PathBuf::from(stored.path),
            major_version: stored.major_version.trim().parse().ok(),
            used_timestamp: parse_timestamp(&stored.used_timestamp),
        }
    }
}

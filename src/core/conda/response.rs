// ─── Package Manager Responses ───
// Structured (`--json`) output of the package manager, parsed into explicit
// result types.

use serde::Deserialize;

use crate::core::error::{LauncherError, LauncherResult};

/// Prefix of the log lines `menuinst` writes into the structured output
/// of a real install. These lines are not JSON and must be removed first.
pub const MENUINST_LOG_PREFIX: &str = "INFO";

/// A package in a change-set: `name==version` plus its channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    pub package: String,
    pub channel: String,
}

impl PackageRef {
    pub fn new(package: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            channel: channel.into(),
        }
    }

    /// Package name without the version specifier.
    pub fn base_name(&self) -> &str {
        self.package.split("==").next().unwrap_or_default()
    }
}

impl std::fmt::Display for PackageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "`{} (from {})`", self.package, self.channel)
    }
}

/// Packages an install removes and adds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub unlinked: Vec<PackageRef>,
    pub linked: Vec<PackageRef>,
}

impl ChangeSet {
    pub fn find_linked(&self, base_name: &str) -> Option<&PackageRef> {
        self.linked.iter().find(|p| p.base_name() == base_name)
    }
}

/// Outcome of parsing an install response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallResponse {
    /// The install (or dry run) succeeded; the change-set may be empty.
    Changes(ChangeSet),
    /// The package manager reported an error.
    Error {
        exception_name: Option<String>,
        message: String,
    },
    /// The output was not a structured response.
    ParseFailed(String),
}

impl InstallResponse {
    pub fn parse(raw: &str) -> Self {
        let parsed: RawInstall = match serde_json::from_str(raw) {
            Ok(parsed) => parsed,
            Err(e) => return InstallResponse::ParseFailed(e.to_string()),
        };

        if parsed.error.is_some() || parsed.exception_name.is_some() {
            return InstallResponse::Error {
                message: parsed
                    .error
                    .or(parsed.message)
                    .unwrap_or_else(|| "unknown error".into()),
                exception_name: parsed.exception_name,
            };
        }

        let mut changes = ChangeSet::default();
        let action_sets = match parsed.actions {
            Some(RawActions::One(set)) => vec![set],
            Some(RawActions::Many(sets)) => sets,
            None => Vec::new(),
        };
        for set in action_sets {
            changes
                .unlinked
                .extend(set.unlink.into_iter().map(RawPackage::into_ref));
            changes
                .linked
                .extend(set.link.into_iter().map(RawPackage::into_ref));
        }
        InstallResponse::Changes(changes)
    }

    pub fn into_change_set(self) -> LauncherResult<ChangeSet> {
        match self {
            InstallResponse::Changes(changes) => Ok(changes),
            InstallResponse::Error {
                exception_name,
                message,
            } => Err(LauncherError::InstallFailed {
                exception: exception_name,
                message,
            }),
            InstallResponse::ParseFailed(reason) => Err(LauncherError::ResponseParse(reason)),
        }
    }
}

/// Drop `menuinst` log lines from install output.
pub fn strip_menuinst_messages(output: &str) -> String {
    output
        .lines()
        .filter(|line| !line.starts_with(MENUINST_LOG_PREFIX))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result of a package search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub installed: String,
    /// Available versions as listed by the package manager.
    pub versions: Vec<String>,
}

/// An installed package.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub dist_name: String,
    #[serde(default)]
    pub channel: String,
}

impl PackageDescriptor {
    /// Name shown in status lines.
    pub fn display_name(&self) -> &str {
        if self.dist_name.is_empty() {
            &self.version
        } else {
            &self.dist_name
        }
    }
}

/// Error object the package manager prints instead of a regular response.
#[derive(Debug, Deserialize)]
pub(crate) struct RawError {
    pub error: Option<String>,
    pub exception_name: Option<String>,
    pub message: Option<String>,
}

impl RawError {
    pub fn describe(self) -> Option<String> {
        let text = self.error.or(self.message)?;
        Some(match self.exception_name {
            Some(name) if !text.contains(&name) => format!("{}: {}", name, text),
            _ => text,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchEntry {
    pub version: String,
}

#[derive(Debug, Deserialize)]
struct RawInstall {
    #[serde(default)]
    actions: Option<RawActions>,
    error: Option<String>,
    exception_name: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawActions {
    One(RawActionSet),
    Many(Vec<RawActionSet>),
}

#[derive(Debug, Default, Deserialize)]
struct RawActionSet {
    #[serde(rename = "LINK", default)]
    link: Vec<RawPackage>,
    #[serde(rename = "UNLINK", default)]
    unlink: Vec<RawPackage>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPackage {
    Record {
        name: String,
        version: String,
        #[serde(default)]
        channel: String,
    },
    /// `channel::name-version-build`
    Dist(String),
}

impl RawPackage {
    fn into_ref(self) -> PackageRef {
        match self {
            RawPackage::Record {
                name,
                version,
                channel,
            } => PackageRef::new(format!("{}=={}", name, version), channel),
            RawPackage::Dist(dist) => {
                let (channel, dist) = match dist.split_once("::") {
                    Some((channel, rest)) => (channel.to_string(), rest.to_string()),
                    None => (String::new(), dist),
                };
                let parts: Vec<&str> = dist.rsplitn(3, '-').collect();
                match parts.as_slice() {
                    [_build, version, name] => {
                        PackageRef::new(format!("{}=={}", name, version), channel)
                    }
                    _ => PackageRef::new(dist.clone(), channel),
                }
            }
        }
    }
}

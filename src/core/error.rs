use std::path::PathBuf;
use thiserror::Error;

/// Marker the package manager puts in errors caused by an unreachable network.
const CONNECTIVITY_MARKER: &str = "CondaHTTPError";

/// Central error type for the launcher core.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Version ─────────────────────────────────────────
    #[error(
        "Profile {path:?} was created for major version {profile_major}, \
         but the installed major version is {installed_major}"
    )]
    VersionMismatch {
        path: PathBuf,
        profile_major: u32,
        installed_major: u32,
    },

    #[error("Unreadable version marker at {path:?}: {contents:?}")]
    InvalidMarker { path: PathBuf, contents: String },

    #[error("Invalid version string: {0:?}")]
    InvalidVersion(String),

    // ── Package manager ─────────────────────────────────
    #[error("Package manager executable not found: {program}")]
    PackageManagerUnavailable { program: String },

    #[error("Package manager query `{command}` failed: {message}")]
    QueryFailed { command: String, message: String },

    #[error("Install failed ({}): {message}", exception.as_deref().unwrap_or("unknown"))]
    InstallFailed {
        exception: Option<String>,
        message: String,
    },

    #[error("Malformed package manager response: {0}")]
    ResponseParse(String),

    // ── Profile ─────────────────────────────────────────
    #[error("Profile directory not found: {0:?}")]
    ProfileNotFound(PathBuf),

    #[error("Profile directory is not empty: {0:?}")]
    ProfileNotEmpty(PathBuf),

    // ── Launch ──────────────────────────────────────────
    #[error("Error launching profile: {0}")]
    Launch(String),

    // ── Tasks ───────────────────────────────────────────
    #[error("Task `{name}` did not complete: {message}")]
    Task { name: String, message: String },

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl LauncherError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }

    /// `true` when the failure was caused by the network being unreachable.
    pub fn is_connectivity(&self) -> bool {
        match self {
            LauncherError::QueryFailed { message, .. } => message.contains(CONNECTIVITY_MARKER),
            LauncherError::InstallFailed { exception, message } => {
                exception.as_deref() == Some(CONNECTIVITY_MARKER)
                    || message.contains(CONNECTIVITY_MARKER)
            }
            _ => false,
        }
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

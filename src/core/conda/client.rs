// ─── Package Manager Client ───
// The package manager is an external collaborator. `CondaCli` drives the
// `conda` executable and returns its structured (`--json`) output.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::sync::Arc;

#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;

use tracing::{debug, instrument};

use super::response::{PackageDescriptor, RawError, SearchEntry, VersionInfo};
use crate::core::error::{LauncherError, LauncherResult};

pub trait PackageManager: Send + Sync {
    /// Run an install and return its raw output.
    ///
    /// With `structured` set the output is the package manager's JSON
    /// response, which may describe an error instead of a change-set.
    fn install(&self, packages: &[&str], dry_run: bool, structured: bool)
        -> LauncherResult<String>;

    /// Installed version plus every version available remotely.
    fn search(&self, package: &str) -> LauncherResult<VersionInfo>;

    fn installed_descriptor(&self, package: &str) -> LauncherResult<PackageDescriptor>;
}

pub type PackageManagerHandle = Arc<dyn PackageManager>;

/// `conda` command-line adapter.
#[derive(Debug, Clone)]
pub struct CondaCli {
    program: PathBuf,
}

impl CondaCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Use `$CONDA_EXE` when set (activated environments export it),
    /// otherwise `conda` from `PATH`.
    pub fn from_env() -> Self {
        let program = std::env::var_os("CONDA_EXE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("conda"));
        Self::new(program)
    }

    fn command_line(&self, args: &[&str]) -> String {
        format!("{} {}", self.program.display(), args.join(" "))
    }

    fn exec(&self, args: &[&str]) -> LauncherResult<Output> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        configure_platform_spawn(&mut cmd);

        debug!("Running {}", self.command_line(args));
        cmd.output().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LauncherError::PackageManagerUnavailable {
                program: self.program.display().to_string(),
            },
            _ => LauncherError::io(&self.program, e),
        })
    }

    /// Standard output of a successful invocation.
    fn exec_checked(&self, args: &[&str]) -> LauncherResult<String> {
        let output = self.exec(args)?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }

        let message = serde_json::from_str::<RawError>(&stdout)
            .ok()
            .and_then(RawError::describe)
            .unwrap_or_else(|| {
                let stderr = String::from_utf8_lossy(&output.stderr);
                format!("{} ({})", stderr.trim(), output.status)
            });
        Err(LauncherError::QueryFailed {
            command: self.command_line(args),
            message,
        })
    }
}

impl PackageManager for CondaCli {
    #[instrument(skip(self))]
    fn install(
        &self,
        packages: &[&str],
        dry_run: bool,
        structured: bool,
    ) -> LauncherResult<String> {
        let mut args = vec!["install", "--yes"];
        if dry_run {
            args.push("--dry-run");
        }
        if structured {
            args.push("--json");
        }
        args.extend_from_slice(packages);

        let output = self.exec(&args)?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        // A failed structured install still prints a JSON error object.
        if output.status.success() || (structured && !stdout.trim().is_empty()) {
            return Ok(stdout);
        }
        Err(LauncherError::QueryFailed {
            command: self.command_line(&args),
            message: format!(
                "{} ({})",
                String::from_utf8_lossy(&output.stderr).trim(),
                output.status
            ),
        })
    }

    #[instrument(skip(self))]
    fn search(&self, package: &str) -> LauncherResult<VersionInfo> {
        let installed = self.installed_descriptor(package)?.version;

        let args = ["search", "--json", package];
        let stdout = self.exec_checked(&args)?;
        let mut listing: HashMap<String, Vec<SearchEntry>> = serde_json::from_str(&stdout)
            .map_err(|e| LauncherError::ResponseParse(e.to_string()))?;
        let versions = listing
            .remove(package)
            .unwrap_or_default()
            .into_iter()
            .map(|entry| entry.version)
            .collect();

        Ok(VersionInfo {
            installed,
            versions,
        })
    }

    #[instrument(skip(self))]
    fn installed_descriptor(&self, package: &str) -> LauncherResult<PackageDescriptor> {
        let args = ["list", "--json", "--full-name", package];
        let stdout = self.exec_checked(&args)?;
        let installed: Vec<PackageDescriptor> = serde_json::from_str(&stdout)
            .map_err(|e| LauncherError::ResponseParse(e.to_string()))?;

        installed
            .into_iter()
            .find(|p| p.name == package)
            .ok_or_else(|| LauncherError::QueryFailed {
                command: self.command_line(&args),
                message: format!("package `{}` is not installed", package),
            })
    }
}

fn configure_platform_spawn(cmd: &mut Command) {
    #[cfg(target_os = "windows")]
    {
        const CREATE_NO_WINDOW: u32 = 0x08000000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(target_os = "windows"))]
    {
        let _ = cmd;
    }
}

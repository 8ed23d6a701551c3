//! Recording package manager used by the unit tests.

use std::sync::Mutex;

use super::client::PackageManager;
use super::response::{PackageDescriptor, VersionInfo};
use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Unavailable,
    Offline,
}

impl Failure {
    fn error(self, command: &str) -> LauncherError {
        match self {
            Failure::Unavailable => LauncherError::PackageManagerUnavailable {
                program: "conda".into(),
            },
            Failure::Offline => LauncherError::QueryFailed {
                command: command.into(),
                message: "CondaHTTPError: HTTP 000 CONNECTION FAILED".into(),
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeConda {
    installed: String,
    versions: Vec<String>,
    dry_run_output: String,
    install_output: String,
    failure: Option<Failure>,
    calls: Mutex<Vec<String>>,
}

impl FakeConda {
    pub fn new(installed: &str, versions: &[&str]) -> Self {
        Self {
            installed: installed.into(),
            versions: versions.iter().map(|v| v.to_string()).collect(),
            dry_run_output: r#"{"success": true}"#.into(),
            install_output: r#"{"success": true}"#.into(),
            ..Default::default()
        }
    }

    pub fn failing(failure: Failure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new("2.0", &[])
        }
    }

    pub fn with_dry_run(mut self, output: &str) -> Self {
        self.dry_run_output = output.into();
        self
    }

    pub fn with_install(mut self, output: &str) -> Self {
        self.install_output = output.into();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> LauncherResult<()> {
        self.calls.lock().unwrap().push(call.clone());
        match self.failure {
            Some(failure) => Err(failure.error(&call)),
            None => Ok(()),
        }
    }
}

impl PackageManager for FakeConda {
    fn install(
        &self,
        packages: &[&str],
        dry_run: bool,
        _structured: bool,
    ) -> LauncherResult<String> {
        let verb = if dry_run { "dry-run" } else { "install" };
        self.record(format!("{} {}", verb, packages.join(" ")))?;
        Ok(if dry_run {
            self.dry_run_output.clone()
        } else {
            self.install_output.clone()
        })
    }

    fn search(&self, package: &str) -> LauncherResult<VersionInfo> {
        self.record(format!("search {}", package))?;
        Ok(VersionInfo {
            installed: self.installed.clone(),
            versions: self.versions.clone(),
        })
    }

    fn installed_descriptor(&self, package: &str) -> LauncherResult<PackageDescriptor> {
        self.record(format!("list {}", package))?;
        Ok(PackageDescriptor {
            name: package.into(),
            version: self.installed.clone(),
            dist_name: format!("{}-{}-0", package, self.installed),
            channel: "sci-bots".into(),
        })
    }
}

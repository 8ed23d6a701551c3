// ─── Launcher Auto-Upgrade ───
// A structured dry-run install tells whether a newer launcher package is
// available. If so the real install runs and the change-set is reported.

use tracing::{error, info, instrument, warn};

use crate::core::conda::{
    strip_menuinst_messages, ChangeSet, InstallResponse, PackageManager, PackageRef,
};
use crate::core::error::LauncherResult;
use crate::core::status::StatusReporter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeDecision {
    UpToDate,
    Available(PackageRef),
}

/// Final state of an upgrade check, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeStatus {
    UpToDate(String),
    Upgraded { target: PackageRef, changes: ChangeSet },
    Offline,
    Failed(String),
}

pub fn check_for_launcher_upgrade(
    package_manager: &dyn PackageManager,
    launcher_package: &str,
) -> LauncherResult<UpgradeDecision> {
    let raw = package_manager.install(&[launcher_package], true, true)?;
    let changes = InstallResponse::parse(&raw).into_change_set()?;

    Ok(match changes.find_linked(launcher_package) {
        Some(target) => UpgradeDecision::Available(target.clone()),
        None => UpgradeDecision::UpToDate,
    })
}

pub fn perform_upgrade(
    package_manager: &dyn PackageManager,
    launcher_package: &str,
) -> LauncherResult<ChangeSet> {
    let raw = package_manager.install(&[launcher_package], false, true)?;
    InstallResponse::parse(&strip_menuinst_messages(&raw)).into_change_set()
}

fn format_packages(packages: &[PackageRef]) -> String {
    packages
        .iter()
        .map(|p| format!(" - {}", p))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check for a launcher upgrade and install it when one is available.
///
/// Never fails: errors become status lines and an `UpgradeStatus`.
#[instrument(skip(package_manager, status))]
pub fn run_upgrade_check(
    package_manager: &dyn PackageManager,
    launcher_package: &str,
    status: &dyn StatusReporter,
) -> UpgradeStatus {
    info!("Checking for `{}` updates", launcher_package);

    let outcome = check_for_launcher_upgrade(package_manager, launcher_package).and_then(
        |decision| match decision {
            UpgradeDecision::UpToDate => {
                let name = package_manager
                    .installed_descriptor(launcher_package)
                    .map(|d| d.display_name().to_string())
                    .unwrap_or_else(|e| {
                        warn!("Could not describe installed `{}`: {}", launcher_package, e);
                        launcher_package.to_string()
                    });
                status.status(&format!("Up to date: {}", name));
                Ok(UpgradeStatus::UpToDate(name))
            }
            UpgradeDecision::Available(target) => {
                status.status(&format!("Upgrading to: {}", target.package));
                let changes = perform_upgrade(package_manager, launcher_package)?;
                status.status(&format!("Uninstall:\n{}\n", format_packages(&changes.unlinked)));
                status.status(&format!("Install:\n{}", format_packages(&changes.linked)));
                Ok(UpgradeStatus::Upgraded { target, changes })
            }
        },
    );

    match outcome {
        Ok(result) => result,
        Err(e) if e.is_connectivity() => {
            status.status("Error checking for updates - no network connection");
            UpgradeStatus::Offline
        }
        Err(e) => {
            error!("Upgrade check for `{}` failed: {}", launcher_package, e);
            status.status(&format!("Error checking for updates: {}", e));
            UpgradeStatus::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conda::fake::{Failure, FakeConda};
    use crate::core::status::MemoryReporter;

    const UPGRADE_AVAILABLE: &str = r#"{
        "actions": {
            "LINK": [
                {"name": "microdrop-launcher", "version": "0.7.6", "channel": "sci-bots"},
                {"name": "pip-helpers", "version": "0.6", "channel": "sci-bots"}
            ],
            "UNLINK": [
                {"name": "microdrop-launcher", "version": "0.7.5", "channel": "sci-bots"}
            ]
        },
        "success": true
    }"#;

    const DEPENDENCY_ONLY: &str = r#"{
        "actions": {
            "LINK": [{"name": "pip-helpers", "version": "0.6", "channel": "sci-bots"}],
            "UNLINK": []
        }
    }"#;

    #[test]
    fn detects_available_launcher_upgrade() {
        let conda = FakeConda::new("0.7.5", &[]).with_dry_run(UPGRADE_AVAILABLE);

        assert_eq!(
            check_for_launcher_upgrade(&conda, "microdrop-launcher").unwrap(),
            UpgradeDecision::Available(PackageRef::new("microdrop-launcher==0.7.6", "sci-bots"))
        );
    }

    #[test]
    fn dependency_changes_alone_are_not_an_upgrade() {
        let conda = FakeConda::new("0.7.5", &[]).with_dry_run(DEPENDENCY_ONLY);
        let status = MemoryReporter::default();

        let result = run_upgrade_check(&conda, "microdrop-launcher", &status);

        assert_eq!(
            result,
            UpgradeStatus::UpToDate("microdrop-launcher-0.7.5-0".into())
        );
        assert_eq!(status.lines(), vec!["Up to date: microdrop-launcher-0.7.5-0"]);
        assert_eq!(
            conda.calls(),
            vec!["dry-run microdrop-launcher", "list microdrop-launcher"]
        );
    }

    #[test]
    fn installs_when_upgrade_is_available() {
        let install = format!("INFO menuinst_win32:__init__(182): Menu\n{}", UPGRADE_AVAILABLE);
        let conda = FakeConda::new("0.7.5", &[])
            .with_dry_run(UPGRADE_AVAILABLE)
            .with_install(&install);
        let status = MemoryReporter::default();

        let result = run_upgrade_check(&conda, "microdrop-launcher", &status);

        let UpgradeStatus::Upgraded { target, changes } = result else {
            panic!("expected an upgrade, got {:?}", result);
        };
        assert_eq!(target.package, "microdrop-launcher==0.7.6");
        assert_eq!(changes.linked.len(), 2);
        assert_eq!(
            conda.calls(),
            vec!["dry-run microdrop-launcher", "install microdrop-launcher"]
        );
        let lines = status.lines();
        assert_eq!(lines[0], "Upgrading to: microdrop-launcher==0.7.6");
        assert!(lines[1].contains(" - `microdrop-launcher==0.7.5 (from sci-bots)`"));
        assert!(lines[2].starts_with("Install:"));
    }

    #[test]
    fn offline_is_reported_distinctly() {
        let conda = FakeConda::failing(Failure::Offline);
        let status = MemoryReporter::default();

        assert_eq!(
            run_upgrade_check(&conda, "microdrop-launcher", &status),
            UpgradeStatus::Offline
        );
        assert_eq!(
            status.lines(),
            vec!["Error checking for updates - no network connection"]
        );
    }

    #[test]
    fn offline_error_object_is_reported_distinctly() {
        let conda = FakeConda::new("0.7.5", &[]).with_dry_run(
            r#"{"error": "CondaHTTPError: HTTP 000 CONNECTION FAILED", "exception_name": "CondaHTTPError"}"#,
        );

        assert_eq!(
            run_upgrade_check(&conda, "microdrop-launcher", &MemoryReporter::default()),
            UpgradeStatus::Offline
        );
    }

    #[test]
    fn other_failures_are_not_fatal() {
        let conda = FakeConda::failing(Failure::Unavailable);
        let status = MemoryReporter::default();

        let result = run_upgrade_check(&conda, "microdrop-launcher", &status);

        assert!(matches!(result, UpgradeStatus::Failed(_)));
        assert!(status.lines()[0].starts_with("Error checking for updates: "));
        assert_eq!(conda.calls(), vec!["dry-run microdrop-launcher"]);
    }
}

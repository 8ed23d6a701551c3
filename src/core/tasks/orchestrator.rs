// ─── Run Orchestration ───
// One launcher run:
//   1. load the registry, drop incompatible profiles, save the snapshot
//   2. dispatch upgrade check, cache refresh and launch-or-select
//   3. wait for every unit
//   4. save the launch unit's registry and return its exit code

use std::fmt;
use std::sync::Arc;

use futures_util::future::OptionFuture;
use tracing::{info, warn};

use super::supervisor::WorkerPool;
use crate::core::launch::{launch_or_select, LaunchOptions, ProfileSelector};
use crate::core::profile::{FilterOptions, ProfileManager, Registry};
use crate::core::state::AppState;
use crate::core::updates::{refresh_cache, run_upgrade_check, RefreshOutcome, UpgradeStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    UpgradeCheck,
    VersionCacheRefresh,
    LaunchOrSelect,
}

impl TaskKind {
    pub fn name(self) -> &'static str {
        match self {
            TaskKind::UpgradeCheck => "upgrade-check",
            TaskKind::VersionCacheRefresh => "version-cache-refresh",
            TaskKind::LaunchOrSelect => "launch-or-select",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub launch: LaunchOptions,
    /// Skip the upgrade check and the version cache refresh.
    pub no_upgrade: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Exit code of the launched profile, `None` when nothing was launched.
    pub return_code: Option<i32>,
    pub dispatched: Vec<TaskKind>,
    pub upgrade: Option<UpgradeStatus>,
    pub cache: Option<RefreshOutcome>,
}

fn save_registry(registry: &Registry, state: &AppState) {
    if let Err(e) = registry.save(&state.paths.profiles) {
        warn!("Could not save profiles to {:?}: {}", state.paths.profiles, e);
    }
}

pub async fn run(
    state: &AppState,
    options: RunOptions,
    selector: Box<dyn ProfileSelector>,
) -> RunSummary {
    // ── Start ──
    let registry = Registry::load(
        &state.paths.profiles,
        &state.paths.default_profile,
        &state.checker,
    )
    .filter_invalid(
        FilterOptions {
            drop_missing: false,
            drop_mismatch: true,
        },
        &state.checker,
    );
    save_registry(&registry, state);

    // ── Dispatch ──
    let pool = WorkerPool::new(state.settings.worker_pool_size);
    let mut dispatched = Vec::new();

    let upgrade = if options.no_upgrade {
        None
    } else {
        dispatched.push(TaskKind::UpgradeCheck);
        let package_manager = Arc::clone(&state.package_manager);
        let status = Arc::clone(&state.status);
        let package = state.settings.launcher_package.clone();
        Some(pool.submit(TaskKind::UpgradeCheck.name(), move || {
            Ok(run_upgrade_check(
                package_manager.as_ref(),
                &package,
                status.as_ref(),
            ))
        }))
    };

    let cache = if options.no_upgrade {
        None
    } else {
        dispatched.push(TaskKind::VersionCacheRefresh);
        let package_manager = Arc::clone(&state.package_manager);
        let package = state.settings.app_package.clone();
        let installed_major = state.checker.installed_major_version();
        let cache_path = state.paths.version_cache.clone();
        Some(
            pool.submit(TaskKind::VersionCacheRefresh.name(), move || {
                Ok(refresh_cache(
                    package_manager.as_ref(),
                    &package,
                    installed_major,
                    &cache_path,
                ))
            }),
        )
    };

    dispatched.push(TaskKind::LaunchOrSelect);
    let launch = {
        let launcher = Arc::clone(&state.launcher);
        let manager = ProfileManager::new(state.checker.clone());
        let registry = registry.clone();
        let mut selector = selector;
        pool.submit(TaskKind::LaunchOrSelect.name(), move || {
            Ok(launch_or_select(
                registry,
                options.launch,
                launcher.as_ref(),
                &manager,
                selector.as_mut(),
            ))
        })
    };
    info!("Dispatched {} units", dispatched.len());

    // ── Join ──
    let (upgrade, cache, launch) = tokio::join!(
        OptionFuture::from(upgrade.map(|h| h.join())),
        OptionFuture::from(cache.map(|h| h.join())),
        launch.join(),
    );

    // ── Finalize ──
    let (registry, return_code) = match launch.ok() {
        Some(outcome) => (outcome.registry, outcome.return_code),
        None => (registry, None),
    };
    save_registry(&registry.sort_by_recency(), state);

    RunSummary {
        return_code,
        dispatched,
        upgrade: upgrade.and_then(|o| o.ok()),
        cache: cache.and_then(|o| o.ok()),
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::core::conda::fake::{Failure, FakeConda};
    use crate::core::error::{LauncherError, LauncherResult};
    use crate::core::launch::{Launcher, Selection};
    use crate::core::profile::ProfileRecord;
    use crate::core::state::{AppPaths, LauncherSettings};
    use crate::core::status::MemoryReporter;
    use crate::core::version::{VersionChecker, MARKER_FILE};

    struct FixedLauncher(Option<i32>);

    impl Launcher for FixedLauncher {
        fn launch(&self, _profile: &Path) -> LauncherResult<i32> {
            self.0
                .ok_or_else(|| LauncherError::Launch("could not start `microdrop`".into()))
        }
    }

    struct QuitSelector;

    impl ProfileSelector for QuitSelector {
        fn select(&mut self, _registry: &Registry) -> Selection {
            Selection::Quit
        }

        fn confirm(&mut self, _question: &str) -> bool {
            false
        }

        fn report_error(&mut self, _message: &str) {}
    }

    fn state(root: &Path, conda: Arc<FakeConda>, launcher: FixedLauncher) -> AppState {
        state_for_version(root, "2.1", conda, launcher)
    }

    fn state_for_version(
        root: &Path,
        installed: &str,
        conda: Arc<FakeConda>,
        launcher: FixedLauncher,
    ) -> AppState {
        let checker = VersionChecker::from_version_str(installed).unwrap();
        let major = checker.installed_major_version();
        AppState {
            paths: AppPaths::new(&root.join("config"), &root.join("default-profile"), major),
            settings: LauncherSettings::default(),
            checker,
            package_manager: conda,
            launcher: Arc::new(launcher),
            status: Arc::new(MemoryReporter::default()),
        }
    }

    fn saved_paths(state: &AppState) -> Vec<PathBuf> {
        let raw = std::fs::read_to_string(&state.paths.profiles).unwrap();
        let stored: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
        stored
            .iter()
            .map(|p| PathBuf::from(p["path"].as_str().unwrap()))
            .collect()
    }

    #[tokio::test]
    async fn no_upgrade_runs_only_the_launch_unit() {
        let root = tempfile::tempdir().unwrap();
        let conda = Arc::new(FakeConda::new("2.1", &["2.1", "2.2"]));
        let state = state(root.path(), Arc::clone(&conda), FixedLauncher(Some(0)));

        let summary = run(
            &state,
            RunOptions {
                no_upgrade: true,
                ..Default::default()
            },
            Box::new(QuitSelector),
        )
        .await;

        assert_eq!(summary.return_code, Some(0));
        assert_eq!(summary.dispatched, vec![TaskKind::LaunchOrSelect]);
        assert!(conda.calls().is_empty());
        assert_eq!(saved_paths(&state), vec![root.path().join("default-profile")]);
        let raw = std::fs::read_to_string(&state.paths.profiles).unwrap();
        assert!(!raw.contains(r#""used_timestamp": """#));
    }

    #[tokio::test]
    async fn full_run_dispatches_every_unit() {
        let root = tempfile::tempdir().unwrap();
        let conda = Arc::new(FakeConda::new("2.1", &["1.9", "2.1", "2.3", "3.0"]));
        let state = state(root.path(), Arc::clone(&conda), FixedLauncher(Some(4)));

        let summary = run(&state, RunOptions::default(), Box::new(QuitSelector)).await;

        assert_eq!(summary.return_code, Some(4));
        assert_eq!(
            summary.dispatched,
            vec![
                TaskKind::UpgradeCheck,
                TaskKind::VersionCacheRefresh,
                TaskKind::LaunchOrSelect
            ]
        );
        assert_eq!(summary.cache, Some(RefreshOutcome::Written("2.3".into())));
        assert!(matches!(summary.upgrade, Some(UpgradeStatus::UpToDate(_))));
        assert!(state.paths.version_cache.is_file());
        assert!(conda.calls().contains(&"dry-run microdrop-launcher".to_string()));
    }

    #[tokio::test]
    async fn launch_failure_yields_no_return_code() {
        let root = tempfile::tempdir().unwrap();
        let conda = Arc::new(FakeConda::new("2.1", &[]));
        let state = state(root.path(), conda, FixedLauncher(None));

        let summary = run(
            &state,
            RunOptions {
                no_upgrade: true,
                ..Default::default()
            },
            Box::new(QuitSelector),
        )
        .await;

        assert_eq!(summary.return_code, None);
        assert_eq!(saved_paths(&state), vec![root.path().join("default-profile")]);
    }

    #[tokio::test]
    async fn incompatible_profiles_are_dropped_at_start() {
        let root = tempfile::tempdir().unwrap();
        let old = root.path().join("old");
        let current = root.path().join("current");
        for (dir, marker) in [(&old, "1\n"), (&current, "2\n")] {
            std::fs::create_dir_all(dir).unwrap();
            std::fs::write(dir.join(MARKER_FILE), marker).unwrap();
        }
        let conda = Arc::new(FakeConda::new("2.1", &[]));
        let state = state(root.path(), conda, FixedLauncher(Some(0)));
        Registry::new(vec![
            ProfileRecord::new(&old),
            ProfileRecord::new(&current),
        ])
        .save(&state.paths.profiles)
        .unwrap();

        let summary = run(
            &state,
            RunOptions {
                no_upgrade: true,
                ..Default::default()
            },
            Box::new(QuitSelector),
        )
        .await;

        // Only one profile is left, so it is launched automatically.
        assert_eq!(summary.return_code, Some(0));
        assert_eq!(saved_paths(&state), vec![current]);
    }

    #[tokio::test]
    async fn cache_follows_the_configured_installed_version() {
        let root = tempfile::tempdir().unwrap();
        // The package manager still reports 2.1, the settings say 3.0.
        let conda = Arc::new(FakeConda::new("2.1", &["2.3", "3.1"]));
        let state = state_for_version(root.path(), "3.0", conda, FixedLauncher(Some(0)));

        let summary = run(&state, RunOptions::default(), Box::new(QuitSelector)).await;

        assert!(state.paths.version_cache.starts_with(root.path().join("config").join("3.0")));
        assert_eq!(summary.cache, Some(RefreshOutcome::Written("3.1".into())));
        let raw = std::fs::read_to_string(&state.paths.version_cache).unwrap();
        assert!(raw.contains("3.1"));
    }

    #[tokio::test]
    async fn failing_background_units_keep_the_launch_code() {
        for failure in [Failure::Offline, Failure::Unavailable] {
            let root = tempfile::tempdir().unwrap();
            let conda = Arc::new(FakeConda::failing(failure));
            let state = state(root.path(), conda, FixedLauncher(Some(5)));

            let summary = run(&state, RunOptions::default(), Box::new(QuitSelector)).await;

            assert_eq!(summary.return_code, Some(5));
            assert_eq!(summary.dispatched.len(), 3);
            assert!(matches!(
                summary.upgrade,
                Some(UpgradeStatus::Offline | UpgradeStatus::Failed(_))
            ));
            assert!(matches!(summary.cache, Some(RefreshOutcome::Skipped(_))));
            assert!(!state.paths.version_cache.exists());
            assert_eq!(saved_paths(&state), vec![root.path().join("default-profile")]);
        }
    }
}

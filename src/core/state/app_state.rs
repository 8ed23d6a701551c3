use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::conda::{CondaCli, PackageManagerHandle};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::launch::{CommandLauncher, Launcher};
use crate::core::status::StatusHandle;
use crate::core::tasks::DEFAULT_POOL_SIZE;
use crate::core::updates::LATEST_VERSION_FILE;
use crate::core::version::VersionChecker;

const APP_DIR_NAME: &str = "MicroDrop";
const SETTINGS_FILE: &str = "launcher_settings.json";
const PROFILES_FILE: &str = "profiles.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    /// Package whose major version gates profile compatibility.
    pub app_package: String,
    /// Package checked by the auto-upgrade unit.
    pub launcher_package: String,
    /// Package manager executable; `$CONDA_EXE` or `conda` when unset.
    pub conda_executable: Option<PathBuf>,
    /// Program and arguments used to launch a profile.
    pub launch_command: Vec<String>,
    pub worker_pool_size: usize,
    /// Skips the package manager lookup of the installed version.
    pub installed_version: Option<String>,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            app_package: "microdrop".into(),
            launcher_package: "microdrop-launcher".into(),
            conda_executable: None,
            launch_command: [
                "python",
                "-m",
                "microdrop.microdrop",
                "-c",
                "${profile_path}/microdrop.ini",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            worker_pool_size: DEFAULT_POOL_SIZE,
            installed_version: None,
        }
    }
}

impl LauncherSettings {
    /// Read the settings file, writing the defaults when there is none.
    pub fn load_or_init(config_root: &Path) -> Self {
        let path = config_root.join(SETTINGS_FILE);
        if !path.exists() {
            let settings = Self::default();
            if let Err(e) = settings.save(config_root) {
                warn!("Could not write default settings to {:?}: {}", path, e);
            }
            return settings;
        }
        load_settings_from_disk(&path).unwrap_or_default()
    }

    pub fn save(&self, config_root: &Path) -> LauncherResult<()> {
        std::fs::create_dir_all(config_root).map_err(|e| LauncherError::io(config_root, e))?;
        let path = config_root.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| LauncherError::io(&path, e))
    }
}

fn load_settings_from_disk(path: &Path) -> Option<LauncherSettings> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(settings) => Some(settings),
        Err(e) => {
            warn!("Ignoring unreadable settings {:?}: {}", path, e);
            None
        }
    }
}

/// Files and directories for one installed major version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_root: PathBuf,
    /// `<config_root>/<major>.0`
    pub versioned_dir: PathBuf,
    pub profiles: PathBuf,
    pub version_cache: PathBuf,
    pub default_profile: PathBuf,
}

impl AppPaths {
    pub fn new(config_root: &Path, default_profile: &Path, major: u32) -> Self {
        let versioned_dir = config_root.join(format!("{}.0", major));
        Self {
            config_root: config_root.to_path_buf(),
            profiles: versioned_dir.join(PROFILES_FILE),
            version_cache: versioned_dir.join(LATEST_VERSION_FILE),
            versioned_dir,
            default_profile: default_profile.to_path_buf(),
        }
    }

    pub fn with_profiles_path(mut self, profiles: Option<PathBuf>) -> Self {
        if let Some(profiles) = profiles {
            self.profiles = profiles;
        }
        self
    }
}

pub fn default_config_root() -> LauncherResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| LauncherError::Other("no user configuration directory".into()))
}

pub fn default_profile_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Everything a run needs, resolved once at startup.
pub struct AppState {
    pub paths: AppPaths,
    pub settings: LauncherSettings,
    pub checker: VersionChecker,
    pub package_manager: PackageManagerHandle,
    pub launcher: Arc<dyn Launcher>,
    pub status: StatusHandle,
}

impl AppState {
    /// Resolve settings, the installed version and the per-version paths.
    ///
    /// Fails when the installed application version cannot be determined.
    pub fn initialize(
        profiles_override: Option<PathBuf>,
        status: StatusHandle,
    ) -> LauncherResult<Self> {
        let config_root = default_config_root()?;
        let settings = LauncherSettings::load_or_init(&config_root);

        let package_manager: PackageManagerHandle = Arc::new(match &settings.conda_executable {
            Some(program) => CondaCli::new(program),
            None => CondaCli::from_env(),
        });

        let installed = match &settings.installed_version {
            Some(version) => version.clone(),
            None => package_manager.installed_descriptor(&settings.app_package)?.version,
        };
        let checker = VersionChecker::from_version_str(&installed)?;
        info!("Installed {} version {}", settings.app_package, installed);

        let paths = AppPaths::new(
            &config_root,
            &default_profile_dir(),
            checker.installed_major_version(),
        )
        .with_profiles_path(profiles_override);

        let launcher = Arc::new(CommandLauncher::new(
            settings.launch_command.clone(),
            checker.clone(),
        ));

        Ok(Self {
            paths,
            settings,
            checker,
            package_manager,
            launcher,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_scoped_by_major_version() {
        let paths = AppPaths::new(Path::new("/cfg/MicroDrop"), Path::new("/docs/MicroDrop"), 2);

        assert_eq!(paths.versioned_dir, PathBuf::from("/cfg/MicroDrop/2.0"));
        assert_eq!(paths.profiles, PathBuf::from("/cfg/MicroDrop/2.0/profiles.json"));
        assert_eq!(
            paths.version_cache,
            PathBuf::from("/cfg/MicroDrop/2.0/latest-version.json")
        );
    }

    #[test]
    fn profiles_path_can_be_overridden() {
        let paths = AppPaths::new(Path::new("/cfg"), Path::new("/docs"), 2)
            .with_profiles_path(Some(PathBuf::from("/elsewhere/profiles.json")));

        assert_eq!(paths.profiles, PathBuf::from("/elsewhere/profiles.json"));
    }

    #[test]
    fn settings_are_written_on_first_run() {
        let root = tempfile::tempdir().unwrap();

        let settings = LauncherSettings::load_or_init(root.path());

        assert_eq!(settings, LauncherSettings::default());
        assert!(root.path().join(SETTINGS_FILE).is_file());
    }

    #[test]
    fn partial_settings_keep_defaults() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(
            root.path().join(SETTINGS_FILE),
            r#"{"worker_pool_size": 3, "installed_version": "2.4.1"}"#,
        )
        .unwrap();

        let settings = LauncherSettings::load_or_init(root.path());

        assert_eq!(settings.worker_pool_size, 3);
        assert_eq!(settings.installed_version.as_deref(), Some("2.4.1"));
        assert_eq!(settings.launcher_package, "microdrop-launcher");
    }

    #[test]
    fn unreadable_settings_fall_back_to_defaults() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join(SETTINGS_FILE), "{not json").unwrap();

        assert_eq!(
            LauncherSettings::load_or_init(root.path()),
            LauncherSettings::default()
        );
    }
}

// ─── Launch or Select ───
// Either launches a profile right away or lets the user manage profiles
// until one is launched or they quit. This is the only unit that changes
// the registry.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::task::Launcher;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::profile::{now_timestamp, ProfileManager, ProfileRecord, Registry};

/// What the user picked in the profile selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Launch(PathBuf),
    Create { path: PathBuf, overwrite: bool },
    Import(PathBuf),
    Remove { path: PathBuf, delete_data: bool },
    Quit,
}

/// Interactive profile chooser.
pub trait ProfileSelector: Send {
    fn select(&mut self, registry: &Registry) -> Selection;

    /// Ask a yes/no question, e.g. before reusing a non-empty directory or
    /// deleting profile data.
    fn confirm(&mut self, question: &str) -> bool;

    fn report_error(&mut self, message: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LaunchOptions {
    /// Launch the first profile without asking.
    pub launch_default: bool,
    /// Always show the selector, even with a single profile.
    pub no_auto: bool,
}

impl LaunchOptions {
    fn auto_launch(&self, registry: &Registry) -> bool {
        self.launch_default || (!self.no_auto && registry.len() == 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    pub registry: Registry,
    /// `None` when nothing was launched successfully.
    pub return_code: Option<i32>,
}

fn launch_profile(
    registry: &Registry,
    path: &Path,
    launcher: &dyn Launcher,
) -> LauncherResult<LaunchOutcome> {
    let code = launcher.launch(path)?;
    let mut registry = registry.clone();
    if code == 0 {
        registry = registry.touched(path, now_timestamp());
    } else {
        warn!("Profile {:?} exited with code {}", path, code);
    }
    Ok(LaunchOutcome {
        registry,
        return_code: Some(code),
    })
}

pub fn launch_or_select(
    registry: Registry,
    options: LaunchOptions,
    launcher: &dyn Launcher,
    manager: &ProfileManager,
    selector: &mut dyn ProfileSelector,
) -> LaunchOutcome {
    let mut registry = registry;

    if options.auto_launch(&registry) {
        if let Some(first) = registry.first().map(|r| r.path.clone()) {
            info!("Launching default profile {:?}", first);
            match launch_profile(&registry, &first, launcher) {
                Ok(outcome) => return outcome,
                Err(e) => selector.report_error(&format!("Error launching profile: {}", e)),
            }
        }
    }

    loop {
        match selector.select(&registry) {
            Selection::Launch(path) => {
                let candidate = registry.with_profile(
                    ProfileRecord::new(&path)
                        .with_major_version(manager.checker().profile_major_version(&path)),
                );
                match launch_profile(&candidate, &path, launcher) {
                    Ok(outcome) => return outcome,
                    Err(e) => selector.report_error(&format!("Error launching profile: {}", e)),
                }
            }
            Selection::Create { path, overwrite } => {
                let created = match manager.create(&path, overwrite) {
                    Err(LauncherError::ProfileNotEmpty(dir))
                        if selector.confirm(&format!(
                            "Directory {} is not empty. Create profile anyway?",
                            dir.display()
                        )) =>
                    {
                        manager.create(&dir, true)
                    }
                    other => other,
                };
                match created {
                    Ok(record) => registry = registry.with_profile(record),
                    Err(e) => selector.report_error(&format!("Error creating profile: {}", e)),
                }
            }
            Selection::Import(path) => match manager.import(&path) {
                Ok(record) => registry = registry.with_profile(record),
                Err(e) => selector.report_error(&format!("Error importing profile: {}", e)),
            },
            Selection::Remove { path, delete_data } => {
                if delete_data && !selector.confirm("Remove profile data (cannot be undone)?") {
                    debug!("Kept profile {:?} and its data", path);
                    continue;
                }
                registry = registry.without(&path);
                info!("Removed profile {:?}", path);
                if delete_data {
                    if let Err(e) = manager.delete_data(&path) {
                        selector.report_error(&format!("Error deleting profile data: {}", e));
                    }
                }
            }
            Selection::Quit => {
                info!("No profile launched");
                return LaunchOutcome {
                    registry,
                    return_code: None,
                };
            }
        }
    }
}

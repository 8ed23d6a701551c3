// ─── Launch Task ───
// Runs the application for one profile and waits for it to exit.

use std::path::Path;
use std::process::Command;

#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;

use tracing::{debug, info, instrument};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::VersionChecker;

const PROFILE_PATH_PLACEHOLDER: &str = "${profile_path}";
const MAJOR_VERSION_PLACEHOLDER: &str = "${major_version}";

/// Starts the application for a profile.
pub trait Launcher: Send + Sync {
    /// Run the application for `profile` and return its exit code.
    fn launch(&self, profile: &Path) -> LauncherResult<i32>;
}

/// Launches the configured command line.
///
/// Arguments may reference `${profile_path}` and `${major_version}`. When no
/// argument references the profile path, the path is appended as the last
/// argument.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    command: Vec<String>,
    checker: VersionChecker,
}

impl CommandLauncher {
    pub fn new(command: Vec<String>, checker: VersionChecker) -> Self {
        Self { command, checker }
    }

    /// Program and arguments with every placeholder resolved.
    pub fn resolve_args(&self, profile: &Path) -> LauncherResult<Vec<String>> {
        if self.command.is_empty() {
            return Err(LauncherError::Launch("launch command is empty".into()));
        }

        let profile_str = profile.to_string_lossy();
        let major = self.checker.installed_major_version().to_string();

        let mut args: Vec<String> = self
            .command
            .iter()
            .map(|arg| {
                arg.replace(PROFILE_PATH_PLACEHOLDER, &profile_str)
                    .replace(MAJOR_VERSION_PLACEHOLDER, &major)
            })
            .collect();
        if !self
            .command
            .iter()
            .any(|arg| arg.contains(PROFILE_PATH_PLACEHOLDER))
        {
            args.push(profile_str.into_owned());
        }
        Ok(args)
    }
}

impl Launcher for CommandLauncher {
    #[instrument(skip(self))]
    fn launch(&self, profile: &Path) -> LauncherResult<i32> {
        if !profile.is_dir() {
            return Err(LauncherError::Launch(format!(
                "profile directory {:?} does not exist",
                profile
            )));
        }
        self.checker.verify_or_create(profile)?;

        let args = self.resolve_args(profile)?;
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| LauncherError::Launch("launch command is empty".into()))?;

        let mut cmd = Command::new(program);
        cmd.args(rest).current_dir(profile);
        configure_platform_spawn(&mut cmd);

        info!("Launching profile {:?}", profile);
        debug!("Command: {:?}", cmd);

        let status = cmd
            .status()
            .map_err(|e| LauncherError::Launch(format!("could not start `{}`: {}", program, e)))?;

        match status.code() {
            Some(code) => {
                info!("Profile {:?} exited with code {}", profile, code);
                Ok(code)
            }
            None => Err(LauncherError::Launch(format!(
                "`{}` was terminated by a signal ({})",
                program, status
            ))),
        }
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

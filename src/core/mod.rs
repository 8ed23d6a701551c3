// ─── MicroDrop Launcher Core ───
// Profile management and startup housekeeping for MicroDrop.
//
// Architecture:
//   core/
//     error/    Crate-wide error type
//     status/   User-visible status lines
//     version/  Version parsing + per-profile compatibility marker
//     conda/    Package manager client + structured responses
//     profile/  Profile records, registry file, profile directories
//     updates/  Latest-version cache + launcher auto-upgrade
//     launch/   Process launcher + launch-or-select loop
//     tasks/    Bounded worker pool + run orchestration
//     state/    Settings, paths and startup state

pub mod conda;
pub mod error;
pub mod launch;
pub mod profile;
pub mod state;
pub mod status;
pub mod tasks;
pub mod updates;
pub mod version;

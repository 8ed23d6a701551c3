pub mod cache;
pub mod upgrade;

pub use cache::{refresh_cache, RefreshOutcome, LATEST_VERSION_FILE};
pub use upgrade::{run_upgrade_check, UpgradeDecision, UpgradeStatus};

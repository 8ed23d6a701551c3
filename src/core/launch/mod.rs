pub mod select;
pub mod task;

pub use select::{launch_or_select, LaunchOptions, LaunchOutcome, ProfileSelector, Selection};
pub use task::{CommandLauncher, Launcher};

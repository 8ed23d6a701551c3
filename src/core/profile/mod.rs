pub mod manager;
pub mod model;
pub mod registry;

pub use manager::ProfileManager;
pub use model::{now_timestamp, ProfileRecord};
pub use registry::{FilterOptions, Registry};

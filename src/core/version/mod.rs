pub mod compat;
pub mod number;

pub use compat::{VersionChecker, MARKER_FILE};
pub use number::{major_version, PackageVersion};

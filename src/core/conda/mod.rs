pub mod client;
pub mod response;

#[cfg(test)]
pub mod fake;

pub use client::{CondaCli, PackageManager, PackageManagerHandle};
pub use response::{
    strip_menuinst_messages, ChangeSet, InstallResponse, PackageDescriptor, PackageRef,
    VersionInfo,
};

mod executor;
mod permissions;

pub use executor::{BashExecutor, BashOutput, DEFAULT_TIMEOUT_SECS, MAX_TIMEOUT_SECS};
pub use permissions::{BashPermissions, PermissionAction, PermissionRule};

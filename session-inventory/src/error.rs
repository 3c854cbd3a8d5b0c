use core_types::PackageId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, InventoryError>;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("package {0} not found")]
    NotFound(PackageId),
    #[error("package {package} changed underneath: expected {expected} remaining, found {actual}")]
    Conflict {
        package: PackageId,
        expected: u32,
        actual: u32,
    },
    #[error("package {0} is not active")]
    NotActive(PackageId),
    #[error("package {0} has no consumed credit to release")]
    NothingToRelease(PackageId),
    #[error("package must contain at least one session")]
    EmptyPackage,
}

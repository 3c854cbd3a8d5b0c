//! Prepaid session packages: purchase, consumption, release, expiry.
//!
//! A package is fully funded at purchase time. Booking a covered session
//! consumes one credit via a compare-and-swap on `remaining_sessions`;
//! a failed booking releases the credit back. No coins move at
//! consumption time.

pub mod error;
pub mod inventory;
pub mod package;

pub use error::{InventoryError, Result};
pub use inventory::PackageInventory;
pub use package::{PackageStatus, SessionPackage};

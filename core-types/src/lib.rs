//! Shared identifiers, enums, configuration, and retry policy for the
//! booking-and-ledger engine.

pub mod config;
pub mod ids;
pub mod retry;
pub mod types;
pub mod uid;

pub use config::{EngineConfig, InventoryConfig, PricingConfig, RollbackConfig, SplitConfig};
pub use ids::{CategoryId, EntryId, MentorId, OwnerId, PackageId, SessionId, SlotId, UserId};
pub use retry::RetryPolicy;
pub use types::{BookingKind, CallType, OwnerKind};
pub use uid::{Uid, UID_LEN};

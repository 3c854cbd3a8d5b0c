use chrono::{DateTime, Utc};
use core_types::{OwnerId, OwnerKind};
use serde::{Deserialize, Serialize};

/// One balance record per principal. `version` increments on every
/// committed mutation and backs the optimistic concurrency check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub owner: OwnerId,
    pub balance: u64,
    pub version: u64,
    pub opened_at: DateTime<Utc>,
}

impl Wallet {
    pub fn open(owner: OwnerId, now: DateTime<Utc>) -> Self {
        Self {
            owner,
            balance: 0,
            version: 0,
            opened_at: now,
        }
    }

    pub fn kind(&self) -> OwnerKind {
        self.owner.kind()
    }
}

use chrono::{DateTime, Utc};
use core_types::{CallType, CategoryId, MentorId, PackageId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    Active,
    Expired,
    Cancelled,
}

/// A prepaid bundle of sessions with one mentor. `price` is the coins
/// paid up front for the whole bundle; consuming a credit moves no
/// further coins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPackage {
    pub id: PackageId,
    pub user: UserId,
    pub mentor: MentorId,
    pub category: CategoryId,
    pub call_type: CallType,
    pub total_sessions: u32,
    pub remaining_sessions: u32,
    pub price: u64,
    pub duration_minutes: u32,
    pub status: PackageStatus,
    pub purchased_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Increments on every committed mutation.
    pub version: u64,
}

impl SessionPackage {
    pub fn consumable(&self, now: DateTime<Utc>) -> bool {
        self.status == PackageStatus::Active
            && self.remaining_sessions > 0
            && now < self.expires_at
    }
}

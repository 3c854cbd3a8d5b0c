use chrono::{DateTime, Utc};
use core_types::{BookingKind, CallType, EntryId, MentorId, OwnerId, SessionId, SlotId, UserId};
use serde::{Deserialize, Serialize};

/// Direction of a balance movement. `Refund` entries are the trace left
/// by a reversal; the reversed original carries the restored amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Debit,
    Credit,
    Refund,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Debit => "debit",
            Direction::Credit => "credit",
            Direction::Refund => "refund",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Confirmed,
    Refunded,
}

/// Immutable record of one balance-affecting event. Entries are
/// append-only; a reversal flips `status` on the original and appends a
/// new `Refund`-direction entry, it never rewrites history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub owner: OwnerId,
    pub direction: Direction,
    pub amount: u64,
    pub status: EntryStatus,
    /// Balance immediately after this entry committed.
    pub closing_balance: u64,
    pub session: Option<SessionId>,
    pub mentor: Option<MentorId>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Session facts carried on a payout for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetails {
    pub duration_minutes: u32,
    pub call_type: CallType,
    pub session_date: DateTime<Utc>,
    pub session_time: String,
    pub booking_kind: BookingKind,
}

/// Mentor earnings record for one paid session: the gross charged to the
/// user and its split. `mentor_share + admin_share == amount` always.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutEntry {
    pub id: EntryId,
    pub user: UserId,
    pub mentor: MentorId,
    pub session: SessionId,
    pub slot: Option<SlotId>,
    pub amount: u64,
    pub mentor_share: u64,
    pub admin_share: u64,
    pub status: EntryStatus,
    pub description: String,
    pub details: SessionDetails,
    pub created_at: DateTime<Utc>,
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use core_types::uid::session_uid;
use core_types::{BookingKind, CallType, MentorId, PackageId, SessionId, SlotId, UserId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};
use crate::rooms::Room;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created but not yet finalized; only seen mid-saga.
    Pending,
    /// Instant session, live now.
    Active,
    /// Slot session, waiting for its start time.
    Scheduled,
    Completed,
    Cancelled,
}

/// One booked session. `cost` is the gross price charged to the user;
/// zero when a package credit covered it, in which case `package` names
/// the credit consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub user: UserId,
    pub mentor: MentorId,
    pub call_type: CallType,
    pub kind: BookingKind,
    pub slot: Option<SlotId>,
    pub duration_minutes: u32,
    pub cost: u64,
    pub package: Option<PackageId>,
    pub room: Option<Room>,
    pub status: SessionStatus,
    pub starts_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Records {
    sessions: HashMap<SessionId, SessionRecord>,
    seq: u64,
}

/// Session records. Ids are minted before the record exists so the
/// ledger entries created mid-saga can already reference the session.
#[derive(Default)]
pub struct SessionStore {
    records: RwLock<Records>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint_id(&self, user: &UserId, mentor: &MentorId, now: DateTime<Utc>) -> SessionId {
        let mut records = self.records.write();
        records.seq += 1;
        SessionId::from_uid(session_uid(
            user.as_str(),
            mentor.as_str(),
            now.timestamp(),
            records.seq,
        ))
    }

    pub fn insert(&self, record: SessionRecord) -> SessionRecord {
        self.records
            .write()
            .sessions
            .insert(record.id, record.clone());
        record
    }

    pub fn get(&self, id: &SessionId) -> Option<SessionRecord> {
        self.records.read().sessions.get(id).cloned()
    }

    pub fn set_status(&self, id: &SessionId, status: SessionStatus) -> Result<SessionRecord> {
        let mut records = self.records.write();
        let record = records
            .sessions
            .get_mut(id)
            .ok_or(BookingError::UnknownSession(*id))?;
        record.status = status;
        Ok(record.clone())
    }

    pub fn sessions_for_user(&self, user: &UserId) -> Vec<SessionRecord> {
        let mut sessions: Vec<_> = self
            .records
            .read()
            .sessions
            .values()
            .filter(|record| &record.user == user)
            .cloned()
            .collect();
        sessions.sort_by_key(|record| record.created_at);
        sessions
    }

    pub fn sessions_for_mentor(&self, mentor: &MentorId) -> Vec<SessionRecord> {
        let mut sessions: Vec<_> = self
            .records
            .read()
            .sessions
            .values()
            .filter(|record| &record.mentor == mentor)
            .cloned()
            .collect();
        sessions.sort_by_key(|record| record.created_at);
        sessions
    }
}

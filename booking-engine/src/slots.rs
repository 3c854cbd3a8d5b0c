use std::collections::HashMap;

use chrono::{DateTime, Utc};
use core_types::{MentorId, SlotId, UserId};
use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

/// One published availability window on a mentor's schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub mentor: MentorId,
    pub start_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub booked_by: Option<UserId>,
    pub version: u64,
}

impl Slot {
    pub fn is_booked(&self) -> bool {
        self.booked_by.is_some()
    }
}

/// Mentor availability. Claiming a slot is first-writer-wins under one
/// lock; the losing booking is rejected before any funds have moved.
#[derive(Default)]
pub struct SlotBoard {
    slots: RwLock<HashMap<SlotId, Slot>>,
}

impl SlotBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(
        &self,
        id: SlotId,
        mentor: MentorId,
        start_at: DateTime<Utc>,
        duration_minutes: u32,
    ) -> Slot {
        let slot = Slot {
            id: id.clone(),
            mentor,
            start_at,
            duration_minutes,
            booked_by: None,
            version: 0,
        };
        self.slots.write().insert(id, slot.clone());
        slot
    }

    pub fn get(&self, id: &SlotId) -> Option<Slot> {
        self.slots.read().get(id).cloned()
    }

    pub fn open_slots_for_mentor(&self, mentor: &MentorId) -> Vec<Slot> {
        let mut slots: Vec<_> = self
            .slots
            .read()
            .values()
            .filter(|slot| &slot.mentor == mentor && !slot.is_booked())
            .cloned()
            .collect();
        slots.sort_by_key(|slot| slot.start_at);
        slots
    }

    /// Claims a slot for `user`. Exactly one of two concurrent claims
    /// succeeds; the other gets `SlotAlreadyBooked`.
    pub fn claim(&self, id: &SlotId, user: &UserId) -> Result<Slot> {
        let mut slots = self.slots.write();
        let slot = slots
            .get_mut(id)
            .ok_or_else(|| BookingError::SlotNotFound(id.clone()))?;
        if slot.is_booked() {
            return Err(BookingError::SlotAlreadyBooked(id.clone()));
        }
        slot.booked_by = Some(user.clone());
        slot.version += 1;
        debug!("[slots] {id} claimed by {user}");
        Ok(slot.clone())
    }

    /// Releases a claim. A no-op unless the slot is currently held by
    /// `user`, so a repeated compensation cannot free someone else's
    /// claim.
    pub fn release(&self, id: &SlotId, user: &UserId) -> Result<()> {
        let mut slots = self.slots.write();
        let slot = slots
            .get_mut(id)
            .ok_or_else(|| BookingError::SlotNotFound(id.clone()))?;
        if slot.booked_by.as_ref() == Some(user) {
            slot.booked_by = None;
            slot.version += 1;
            debug!("[slots] {id} released by {user}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn board_with_slot() -> (SlotBoard, SlotId) {
        let board = SlotBoard::new();
        let id = SlotId::from("s-1");
        board.publish(id.clone(), MentorId::from("m-1"), Utc::now(), 30);
        (board, id)
    }

    #[test]
    fn claim_is_first_writer_wins() {
        let (board, id) = board_with_slot();
        board.claim(&id, &UserId::from("u-1")).unwrap();
        let err = board.claim(&id, &UserId::from("u-2")).unwrap_err();
        assert!(matches!(err, BookingError::SlotAlreadyBooked(_)));
    }

    #[test]
    fn release_is_idempotent_and_owner_scoped() {
        let (board, id) = board_with_slot();
        let holder = UserId::from("u-1");
        board.claim(&id, &holder).unwrap();

        board.release(&id, &UserId::from("u-2")).unwrap();
        assert!(board.get(&id).unwrap().is_booked());

        board.release(&id, &holder).unwrap();
        board.release(&id, &holder).unwrap();
        assert!(!board.get(&id).unwrap().is_booked());
    }

    #[test]
    fn concurrent_claims_have_one_winner() {
        let (board, id) = board_with_slot();
        let board = Arc::new(board);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let board = Arc::clone(&board);
                let id = id.clone();
                std::thread::spawn(move || {
                    board.claim(&id, &UserId::new(format!("u-{i}"))).is_ok()
                })
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|&won| won)
            .count();
        assert_eq!(wins, 1);
    }
}

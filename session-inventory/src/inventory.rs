use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use core_types::uid::package_uid;
use core_types::{CallType, CategoryId, MentorId, PackageId, UserId};
use log::{debug, info};
use parking_lot::RwLock;

use crate::error::{InventoryError, Result};
use crate::package::{PackageStatus, SessionPackage};

#[derive(Default)]
struct Shelf {
    packages: HashMap<PackageId, SessionPackage>,
    seq: u64,
}

/// In-memory package inventory. Consumption is a compare-and-swap on
/// `remaining_sessions`, so two bookings racing for the last credit
/// resolve to exactly one winner.
pub struct PackageInventory {
    shelf: RwLock<Shelf>,
}

impl Default for PackageInventory {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageInventory {
    pub fn new() -> Self {
        Self {
            shelf: RwLock::new(Shelf::default()),
        }
    }

    /// Registers a fully-funded package. The coin movement for `price`
    /// happens in the ledger before this is called.
    #[allow(clippy::too_many_arguments)]
    pub fn purchase(
        &self,
        user: UserId,
        mentor: MentorId,
        category: CategoryId,
        call_type: CallType,
        total_sessions: u32,
        price: u64,
        duration_minutes: u32,
        valid_for: Duration,
        now: DateTime<Utc>,
    ) -> Result<SessionPackage> {
        if total_sessions == 0 {
            return Err(InventoryError::EmptyPackage);
        }
        let mut shelf = self.shelf.write();
        shelf.seq += 1;
        let id = PackageId::from_uid(package_uid(
            user.as_str(),
            mentor.as_str(),
            call_type.as_str(),
            now.timestamp(),
            shelf.seq,
        ));
        let package = SessionPackage {
            id,
            user,
            mentor,
            category,
            call_type,
            total_sessions,
            remaining_sessions: total_sessions,
            price,
            duration_minutes,
            status: PackageStatus::Active,
            purchased_at: now,
            expires_at: now + valid_for,
            version: 0,
        };
        info!(
            "[inventory] package {id} purchased: {total_sessions} x {} min {}",
            package.duration_minutes, package.call_type
        );
        shelf.packages.insert(id, package.clone());
        Ok(package)
    }

    pub fn get(&self, id: &PackageId) -> Option<SessionPackage> {
        self.shelf.read().packages.get(id).cloned()
    }

    pub fn packages_for_user(&self, user: &UserId) -> Vec<SessionPackage> {
        self.shelf
            .read()
            .packages
            .values()
            .filter(|package| &package.user == user)
            .cloned()
            .collect()
    }

    /// The consumable package covering this pairing, earliest expiry
    /// first so credits closest to expiring get used up before fresher
    /// ones.
    pub fn find_consumable(
        &self,
        user: &UserId,
        mentor: &MentorId,
        call_type: CallType,
        now: DateTime<Utc>,
    ) -> Option<SessionPackage> {
        self.shelf
            .read()
            .packages
            .values()
            .filter(|package| {
                &package.user == user
                    && &package.mentor == mentor
                    && package.call_type == call_type
                    && package.consumable(now)
            })
            .min_by_key(|package| package.expires_at)
            .cloned()
    }

    /// Consumes one credit if `remaining_sessions` still equals
    /// `expected_remaining`. The losing side of a race gets `Conflict`
    /// and should re-resolve pricing from scratch.
    pub fn consume(
        &self,
        id: &PackageId,
        expected_remaining: u32,
        now: DateTime<Utc>,
    ) -> Result<SessionPackage> {
        let mut shelf = self.shelf.write();
        let package = shelf
            .packages
            .get_mut(id)
            .ok_or(InventoryError::NotFound(*id))?;
        if !package.consumable(now) {
            return Err(InventoryError::NotActive(*id));
        }
        if package.remaining_sessions != expected_remaining {
            return Err(InventoryError::Conflict {
                package: *id,
                expected: expected_remaining,
                actual: package.remaining_sessions,
            });
        }
        package.remaining_sessions -= 1;
        package.version += 1;
        if package.remaining_sessions == 0 {
            package.status = PackageStatus::Expired;
            info!("[inventory] package {id} exhausted");
        }
        debug!(
            "[inventory] consumed credit on {id}, {} remaining",
            package.remaining_sessions
        );
        Ok(package.clone())
    }

    /// Returns a consumed credit after a failed booking. An exhausted
    /// package comes back to `Active` as long as its expiry has not
    /// passed; a cancelled one stays cancelled.
    pub fn release(&self, id: &PackageId, now: DateTime<Utc>) -> Result<SessionPackage> {
        let mut shelf = self.shelf.write();
        let package = shelf
            .packages
            .get_mut(id)
            .ok_or(InventoryError::NotFound(*id))?;
        if package.status == PackageStatus::Cancelled {
            return Err(InventoryError::NotActive(*id));
        }
        if package.remaining_sessions >= package.total_sessions {
            return Err(InventoryError::NothingToRelease(*id));
        }
        package.remaining_sessions += 1;
        package.version += 1;
        if package.status == PackageStatus::Expired && now < package.expires_at {
            package.status = PackageStatus::Active;
        }
        debug!(
            "[inventory] released credit on {id}, {} remaining",
            package.remaining_sessions
        );
        Ok(package.clone())
    }

    pub fn cancel(&self, id: &PackageId) -> Result<SessionPackage> {
        let mut shelf = self.shelf.write();
        let package = shelf
            .packages
            .get_mut(id)
            .ok_or(InventoryError::NotFound(*id))?;
        if package.status != PackageStatus::Cancelled {
            package.status = PackageStatus::Cancelled;
            package.version += 1;
            info!("[inventory] package {id} cancelled");
        }
        Ok(package.clone())
    }

    /// Flips active packages past their expiry to `Expired`. Returns the
    /// ids swept so the caller can log or report them.
    pub fn expire_overdue(&self, now: DateTime<Utc>) -> Vec<PackageId> {
        let mut shelf = self.shelf.write();
        let mut swept = Vec::new();
        for package in shelf.packages.values_mut() {
            if package.status == PackageStatus::Active && now >= package.expires_at {
                package.status = PackageStatus::Expired;
                package.version += 1;
                swept.push(package.id);
            }
        }
        if !swept.is_empty() {
            info!("[inventory] expired {} overdue package(s)", swept.len());
        }
        swept
    }
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use core_types::{MentorId, OwnerId};
use log::{info, warn};

use crate::entry::{LedgerEntry, PayoutEntry};
use crate::error::{LedgerError, Result};
use crate::store::LedgerStore;
use crate::wallet::Wallet;

/// Administrative wallet surface: opening, coin top-ups, history reads,
/// and the replay audit. Booking flows go through [`LedgerStore`]
/// directly; this is the operator-facing layer.
#[derive(Clone)]
pub struct WalletController {
    store: Arc<LedgerStore>,
}

impl WalletController {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<LedgerStore> {
        &self.store
    }

    pub fn open(&self, owner: OwnerId, now: DateTime<Utc>) -> Wallet {
        let wallet = self.store.open_wallet(owner, now);
        info!("[wallet] opened {} at version {}", wallet.owner, wallet.version);
        wallet
    }

    pub fn balance(&self, owner: &OwnerId) -> Result<u64> {
        self.store.balance(owner)
    }

    /// Credits purchased coins onto a wallet, opening it if needed.
    pub fn top_up(
        &self,
        owner: &OwnerId,
        amount: u64,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry> {
        self.store.open_wallet(owner.clone(), now);
        let entry = self
            .store
            .credit(owner, amount, None, description, None, now)?;
        info!(
            "[wallet] topped up {owner} by {amount}, closing balance {}",
            entry.closing_balance
        );
        Ok(entry)
    }

    pub fn history(&self, owner: &OwnerId) -> Vec<LedgerEntry> {
        self.store.history(owner)
    }

    pub fn payout_history(&self, mentor: &MentorId) -> Vec<PayoutEntry> {
        self.store.payout_history(mentor)
    }

    /// Replays the confirmed entry log for one wallet and compares it to
    /// the cached balance. Divergence means the store has a bug or the
    /// log was tampered with; either way it must surface, not be patched.
    pub fn audit(&self, owner: &OwnerId) -> Result<u64> {
        let cached = self.store.balance(owner)?;
        let replayed = self.store.replayed_balance(owner)?;
        if cached != replayed {
            warn!("[wallet] audit mismatch on {owner}: cached {cached}, replayed {replayed}");
            return Err(LedgerError::ReplayMismatch {
                owner: owner.clone(),
                cached,
                replayed,
            });
        }
        Ok(cached)
    }
}

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use core_types::uid::ledger_entry_uid;
use core_types::{EntryId, MentorId, OwnerId, SessionId, SlotId, UserId};
use log::debug;
use parking_lot::RwLock;

use crate::entry::{Direction, EntryStatus, LedgerEntry, PayoutEntry, SessionDetails};
use crate::error::{LedgerError, Result};
use crate::wallet::Wallet;

/// Everything a mentor payout needs in one shot: the gross charged to the
/// user, the split, and the session facts for the earnings record.
#[derive(Debug, Clone)]
pub struct PayoutRequest {
    pub user: UserId,
    pub mentor: MentorId,
    pub session: SessionId,
    pub slot: Option<SlotId>,
    pub gross: u64,
    pub mentor_share: u64,
    pub admin_share: u64,
    pub description: String,
    pub details: SessionDetails,
}

#[derive(Default)]
struct LedgerBook {
    wallets: HashMap<OwnerId, Wallet>,
    entries: Vec<LedgerEntry>,
    entry_index: HashMap<EntryId, usize>,
    payouts: Vec<PayoutEntry>,
    payout_by_entry: HashMap<EntryId, usize>,
    session_credits: HashSet<(OwnerId, SessionId)>,
    seq: u64,
}

impl LedgerBook {
    fn append_entry(
        &mut self,
        owner: OwnerId,
        direction: Direction,
        amount: u64,
        closing_balance: u64,
        session: Option<SessionId>,
        mentor: Option<MentorId>,
        description: String,
        now: DateTime<Utc>,
    ) -> LedgerEntry {
        self.seq += 1;
        let id = EntryId::from_uid(ledger_entry_uid(
            &owner.to_string(),
            direction.as_str(),
            amount,
            self.seq,
        ));
        let entry = LedgerEntry {
            id,
            owner,
            direction,
            amount,
            status: EntryStatus::Confirmed,
            closing_balance,
            session,
            mentor,
            description,
            created_at: now,
        };
        self.entry_index.insert(entry.id, self.entries.len());
        self.entries.push(entry.clone());
        entry
    }

    fn wallet_mut(&mut self, owner: &OwnerId) -> Result<&mut Wallet> {
        self.wallets
            .get_mut(owner)
            .ok_or_else(|| LedgerError::UnknownWallet(owner.clone()))
    }

    fn check_version(wallet: &Wallet, expected: Option<u64>) -> Result<()> {
        if let Some(expected) = expected {
            if wallet.version != expected {
                return Err(LedgerError::VersionConflict {
                    owner: wallet.owner.clone(),
                    expected,
                    actual: wallet.version,
                });
            }
        }
        Ok(())
    }
}

/// Balances and the append-only movement log, one lock, so every
/// operation is a single atomic read-modify-write from the perspective
/// of concurrent callers.
pub struct LedgerStore {
    book: RwLock<LedgerBook>,
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore {
    pub fn new() -> Self {
        Self {
            book: RwLock::new(LedgerBook::default()),
        }
    }

    /// Ensures a wallet exists for `owner`, returning its current state.
    pub fn open_wallet(&self, owner: OwnerId, now: DateTime<Utc>) -> Wallet {
        let mut book = self.book.write();
        book.wallets
            .entry(owner.clone())
            .or_insert_with(|| Wallet::open(owner, now))
            .clone()
    }

    pub fn wallet(&self, owner: &OwnerId) -> Result<Wallet> {
        let book = self.book.read();
        book.wallets
            .get(owner)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownWallet(owner.clone()))
    }

    pub fn balance(&self, owner: &OwnerId) -> Result<u64> {
        Ok(self.wallet(owner)?.balance)
    }

    /// Atomically checks funds, debits the user wallet, and appends a
    /// confirmed debit entry. On `InsufficientFunds` nothing is written.
    pub fn reserve(
        &self,
        user: &UserId,
        amount: u64,
        session: Option<&SessionId>,
        description: &str,
        expected_version: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let owner = OwnerId::User(user.clone());
        let mut book = self.book.write();
        let wallet = book.wallet_mut(&owner)?;
        LedgerBook::check_version(wallet, expected_version)?;
        if wallet.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                needed: amount,
                available: wallet.balance,
            });
        }
        wallet.balance -= amount;
        wallet.version += 1;
        let closing = wallet.balance;
        let entry = book.append_entry(
            owner.clone(),
            Direction::Debit,
            amount,
            closing,
            session.copied(),
            None,
            description.to_string(),
            now,
        );
        debug!("reserved {amount} coins on {owner}, closing balance {closing}");
        Ok(entry)
    }

    /// Atomically credits a wallet and appends a confirmed credit entry.
    /// A second credit carrying the same `session` for the same owner is
    /// rejected, so an orchestrator retry cannot pay a mentor twice.
    pub fn credit(
        &self,
        owner: &OwnerId,
        amount: u64,
        session: Option<&SessionId>,
        description: &str,
        expected_version: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry> {
        let mut book = self.book.write();
        self.credit_locked(
            &mut book,
            owner,
            amount,
            session,
            None,
            description,
            expected_version,
            now,
        )
    }

    /// Mentor payout: credits the mentor share and records the earnings
    /// entry with the full split, as one atomic unit.
    pub fn credit_payout(
        &self,
        request: PayoutRequest,
        now: DateTime<Utc>,
    ) -> Result<(LedgerEntry, PayoutEntry)> {
        if request
            .mentor_share
            .checked_add(request.admin_share)
            .map_or(true, |sum| sum != request.gross)
        {
            return Err(LedgerError::SplitMismatch {
                gross: request.gross,
                mentor_share: request.mentor_share,
                admin_share: request.admin_share,
            });
        }
        let owner = OwnerId::Mentor(request.mentor.clone());
        let mut book = self.book.write();
        let entry = self.credit_locked(
            &mut book,
            &owner,
            request.mentor_share,
            Some(&request.session),
            Some(request.mentor.clone()),
            &request.description,
            None,
            now,
        )?;
        let payout = PayoutEntry {
            id: entry.id,
            user: request.user,
            mentor: request.mentor,
            session: request.session,
            slot: request.slot,
            amount: request.gross,
            mentor_share: request.mentor_share,
            admin_share: request.admin_share,
            status: EntryStatus::Confirmed,
            description: request.description,
            details: request.details,
            created_at: now,
        };
        let payout_index = book.payouts.len();
        book.payout_by_entry.insert(payout.id, payout_index);
        book.payouts.push(payout.clone());
        Ok((entry, payout))
    }

    #[allow(clippy::too_many_arguments)]
    fn credit_locked(
        &self,
        book: &mut LedgerBook,
        owner: &OwnerId,
        amount: u64,
        session: Option<&SessionId>,
        mentor: Option<MentorId>,
        description: &str,
        expected_version: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if let Some(session) = session {
            if book
                .session_credits
                .contains(&(owner.clone(), *session))
            {
                return Err(LedgerError::DuplicateSessionRef {
                    owner: owner.clone(),
                    session: *session,
                });
            }
        }
        let wallet = book
            .wallets
            .entry(owner.clone())
            .or_insert_with(|| Wallet::open(owner.clone(), now));
        LedgerBook::check_version(wallet, expected_version)?;
        wallet.balance = wallet
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::BalanceOverflow(owner.clone()))?;
        wallet.version += 1;
        let closing = wallet.balance;
        if let Some(session) = session {
            book.session_credits.insert((owner.clone(), *session));
        }
        let entry = book.append_entry(
            owner.clone(),
            Direction::Credit,
            amount,
            closing,
            session.copied(),
            mentor,
            description.to_string(),
            now,
        );
        debug!("credited {amount} coins to {owner}, closing balance {closing}");
        Ok(entry)
    }

    /// Reverses a confirmed entry: flips it to `Refunded`, restores the
    /// balance, and appends a refund trace entry. A second reversal of
    /// the same entry fails with `AlreadyReversed`.
    pub fn reverse(&self, entry_id: &EntryId, now: DateTime<Utc>) -> Result<LedgerEntry> {
        let mut book = self.book.write();
        let idx = *book
            .entry_index
            .get(entry_id)
            .ok_or(LedgerError::UnknownEntry(*entry_id))?;
        let (owner, direction, amount, session) = {
            let original = &book.entries[idx];
            if original.direction == Direction::Refund {
                return Err(LedgerError::NotReversible(*entry_id));
            }
            if original.status != EntryStatus::Confirmed {
                return Err(LedgerError::AlreadyReversed(*entry_id));
            }
            (
                original.owner.clone(),
                original.direction,
                original.amount,
                original.session,
            )
        };
        let closing = {
            let wallet = book.wallet_mut(&owner)?;
            match direction {
                Direction::Debit => {
                    wallet.balance = wallet
                        .balance
                        .checked_add(amount)
                        .ok_or_else(|| LedgerError::BalanceOverflow(owner.clone()))?;
                }
                Direction::Credit => {
                    // A mentor could in principle have withdrawn the
                    // share already; that surfaces as a divergent ledger
                    // rather than silent saturation.
                    wallet.balance = wallet.balance.checked_sub(amount).ok_or(
                        LedgerError::ReplayMismatch {
                            owner: owner.clone(),
                            cached: wallet.balance,
                            replayed: amount,
                        },
                    )?;
                }
                Direction::Refund => unreachable!("refund entries are rejected above"),
            }
            wallet.version += 1;
            wallet.balance
        };
        book.entries[idx].status = EntryStatus::Refunded;
        if let Some(payout_idx) = book.payout_by_entry.get(entry_id).copied() {
            book.payouts[payout_idx].status = EntryStatus::Refunded;
        }
        let description = format!("reversal of {entry_id}");
        let refund = book.append_entry(
            owner.clone(),
            Direction::Refund,
            amount,
            closing,
            session,
            None,
            description,
            now,
        );
        debug!("reversed entry {entry_id} on {owner}, closing balance {closing}");
        Ok(refund)
    }

    pub fn entry(&self, entry_id: &EntryId) -> Option<LedgerEntry> {
        let book = self.book.read();
        book.entry_index
            .get(entry_id)
            .map(|idx| book.entries[*idx].clone())
    }

    /// Confirmed debits and credits recorded against a session, oldest
    /// first. Used by the cancellation path to find what to reverse.
    pub fn entries_for_session(&self, session: &SessionId) -> Vec<LedgerEntry> {
        let book = self.book.read();
        book.entries
            .iter()
            .filter(|entry| entry.session.as_ref() == Some(session))
            .cloned()
            .collect()
    }

    /// Movement history for one wallet, newest first.
    pub fn history(&self, owner: &OwnerId) -> Vec<LedgerEntry> {
        let book = self.book.read();
        let mut entries: Vec<_> = book
            .entries
            .iter()
            .filter(|entry| &entry.owner == owner)
            .cloned()
            .collect();
        entries.reverse();
        entries
    }

    /// Mentor earnings history, newest first.
    pub fn payout_history(&self, mentor: &MentorId) -> Vec<PayoutEntry> {
        let book = self.book.read();
        let mut payouts: Vec<_> = book
            .payouts
            .iter()
            .filter(|payout| &payout.mentor == mentor)
            .cloned()
            .collect();
        payouts.reverse();
        payouts
    }

    pub fn payout_for_session(&self, session: &SessionId) -> Option<PayoutEntry> {
        let book = self.book.read();
        book.payouts
            .iter()
            .find(|payout| &payout.session == session)
            .cloned()
    }

    /// Folds the confirmed entries for one wallet. Must equal the cached
    /// balance after any committed operation; reversed originals and
    /// refund traces cancel out by construction.
    pub fn replayed_balance(&self, owner: &OwnerId) -> Result<u64> {
        let book = self.book.read();
        if !book.wallets.contains_key(owner) {
            return Err(LedgerError::UnknownWallet(owner.clone()));
        }
        let mut balance: i128 = 0;
        for entry in book.entries.iter().filter(|entry| &entry.owner == owner) {
            if entry.status != EntryStatus::Confirmed {
                continue;
            }
            match entry.direction {
                Direction::Debit => balance -= entry.amount as i128,
                Direction::Credit => balance += entry.amount as i128,
                Direction::Refund => {}
            }
        }
        Ok(balance.max(0) as u64)
    }
}

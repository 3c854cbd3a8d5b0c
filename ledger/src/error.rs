use core_types::{EntryId, OwnerId, SessionId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("wallet {0} does not exist")]
    UnknownWallet(OwnerId),
    #[error("insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds { needed: u64, available: u64 },
    #[error("version conflict on wallet {owner}: expected {expected}, actual {actual}")]
    VersionConflict {
        owner: OwnerId,
        expected: u64,
        actual: u64,
    },
    #[error("ledger entry {0} not found")]
    UnknownEntry(EntryId),
    #[error("entry {0} already reversed")]
    AlreadyReversed(EntryId),
    #[error("refund entry {0} cannot be reversed")]
    NotReversible(EntryId),
    #[error("wallet {owner} already credited for session {session}")]
    DuplicateSessionRef { owner: OwnerId, session: SessionId },
    #[error("amount must be positive")]
    ZeroAmount,
    #[error("payout shares {mentor_share} + {admin_share} do not sum to gross {gross}")]
    SplitMismatch {
        gross: u64,
        mentor_share: u64,
        admin_share: u64,
    },
    #[error("balance overflow on wallet {0}")]
    BalanceOverflow(OwnerId),
    #[error("cached balance {cached} diverges from replayed {replayed} on wallet {owner}")]
    ReplayMismatch {
        owner: OwnerId,
        cached: u64,
        replayed: u64,
    },
}

//! The ledger store: durable balances plus an append-only movement log.
//!
//! The crate exposes:
//! - [`LedgerStore`]: atomic reserve/credit/reverse against versioned wallets.
//! - [`WalletController`]: the administrative wallet surface (open, top-up,
//!   history, replay audit).
//! - Entry types mirroring the movement log and mentor payout records.
//!
//! The cached balance is the fast path; the entry log is the audit and
//! repair path. The two must agree after every committed operation.

pub mod controller;
pub mod entry;
pub mod error;
pub mod store;
pub mod wallet;

pub use controller::WalletController;
pub use entry::{Direction, EntryStatus, LedgerEntry, PayoutEntry, SessionDetails};
pub use error::{LedgerError, Result};
pub use store::{LedgerStore, PayoutRequest};
pub use wallet::Wallet;

use core_types::{PackageId, SessionId, SlotId};
use ledger::LedgerError;
use pricing::PricingError;
use session_inventory::InventoryError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BookingError>;

/// What a caller sees when a booking cannot complete. By the time one of
/// these is returned, every side effect of the failed attempt has been
/// compensated.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("no price available: {0}")]
    PricingUnavailable(#[source] PricingError),
    #[error("insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds { needed: u64, available: u64 },
    #[error("slot {0} already booked or unavailable")]
    SlotAlreadyBooked(SlotId),
    #[error("slot {0} not found")]
    SlotNotFound(SlotId),
    #[error("package {0} credit taken by a concurrent booking")]
    PackageConflict(PackageId),
    #[error("session {0} not found")]
    UnknownSession(SessionId),
    #[error("ledger failure: {0}")]
    Ledger(#[source] LedgerError),
    #[error("infrastructure failure: {0}")]
    Infrastructure(String),
}

impl From<PricingError> for BookingError {
    fn from(err: PricingError) -> Self {
        BookingError::PricingUnavailable(err)
    }
}

impl From<LedgerError> for BookingError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds { needed, available } => {
                BookingError::InsufficientFunds { needed, available }
            }
            other => BookingError::Ledger(other),
        }
    }
}

impl From<InventoryError> for BookingError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Conflict { package, .. } => BookingError::PackageConflict(package),
            other => BookingError::Infrastructure(other.to_string()),
        }
    }
}

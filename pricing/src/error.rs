use core_types::{CallType, MentorId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PricingError>;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("no {call_type} rate published for mentor {mentor}")]
    Unavailable {
        mentor: MentorId,
        call_type: CallType,
    },
    #[error("cost overflow: rate {rate} x {minutes} minutes")]
    CostOverflow { rate: u64, minutes: u32 },
}

//! Session pricing: decide what a booking costs and which purse covers
//! it, before any funds move.
//!
//! Resolution order: a consumable prepaid package covers the session at
//! zero marginal cost; otherwise an opt-in flat price applies to a
//! user's first-ever chat session; otherwise the mentor's published
//! per-minute rate times the duration. No matching rate is a hard
//! `Unavailable` error, never a free session.

pub mod catalog;
pub mod error;
pub mod resolver;

pub use catalog::{MentorCatalog, StaticCatalog};
pub use error::{PricingError, Result};
pub use resolver::{PriceSource, PricingResolver, Quote};

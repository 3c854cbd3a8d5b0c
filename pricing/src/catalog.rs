use std::collections::HashMap;

use async_trait::async_trait;
use core_types::{CallType, MentorId};
use parking_lot::RwLock;

/// Source of published per-minute rates. The engine only needs a lookup;
/// where the rates live (a database, a remote profile service, a fixture)
/// is the implementor's business.
#[async_trait]
pub trait MentorCatalog: Send + Sync {
    /// Rate in coins per minute for one mentor and medium, or `None` if
    /// the mentor has not published one.
    async fn rate_per_minute(&self, mentor: &MentorId, call_type: CallType) -> Option<u64>;
}

/// In-memory catalog backed by a table of rates. The production seam for
/// a profile-service client, and the fixture used throughout the tests.
#[derive(Default)]
pub struct StaticCatalog {
    rates: RwLock<HashMap<(MentorId, CallType), u64>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rate(&self, mentor: MentorId, call_type: CallType, rate_per_minute: u64) {
        self.rates.write().insert((mentor, call_type), rate_per_minute);
    }

    pub fn clear_rate(&self, mentor: &MentorId, call_type: CallType) {
        self.rates.write().remove(&(mentor.clone(), call_type));
    }
}

#[async_trait]
impl MentorCatalog for StaticCatalog {
    async fn rate_per_minute(&self, mentor: &MentorId, call_type: CallType) -> Option<u64> {
        self.rates.read().get(&(mentor.clone(), call_type)).copied()
    }
}

//! Deterministic 128-bit identifiers for ledger entries, sessions, and
//! packages.
//!
//! Every uid is a domain-separated blake3 hash over length-prefixed
//! fields, so identical inputs always mint the same id and ids from
//! different domains can never collide by construction.

use blake3::Hasher;

pub const UID_LEN: usize = 16;
pub type Uid = [u8; UID_LEN];

struct UidBuilder {
    hasher: Hasher,
}

impl UidBuilder {
    fn new(domain: &[u8]) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(&(domain.len() as u32).to_le_bytes());
        hasher.update(domain);
        Self { hasher }
    }

    fn write_str(&mut self, value: &str) -> &mut Self {
        self.hasher.update(&(value.len() as u32).to_le_bytes());
        self.hasher.update(value.as_bytes());
        self
    }

    fn write_u64(&mut self, value: u64) -> &mut Self {
        self.hasher.update(&value.to_le_bytes());
        self
    }

    fn write_i64(&mut self, value: i64) -> &mut Self {
        self.hasher.update(&value.to_le_bytes());
        self
    }

    fn finish(self) -> Uid {
        let hash = self.hasher.finalize();
        let mut bytes = [0u8; UID_LEN];
        bytes.copy_from_slice(&hash.as_bytes()[..UID_LEN]);
        bytes
    }
}

/// Uid for one ledger entry. `seq` is the store's append sequence, which
/// keeps repeated identical movements distinct.
pub fn ledger_entry_uid(owner: &str, direction: &str, amount: u64, seq: u64) -> Uid {
    let mut builder = UidBuilder::new(b"ledger_entry_uid.v1");
    builder
        .write_str(owner)
        .write_str(direction)
        .write_u64(amount)
        .write_u64(seq);
    builder.finish()
}

/// Uid for a session record.
pub fn session_uid(user: &str, mentor: &str, created_ts: i64, seq: u64) -> Uid {
    let mut builder = UidBuilder::new(b"session_uid.v1");
    builder
        .write_str(user)
        .write_str(mentor)
        .write_i64(created_ts)
        .write_u64(seq);
    builder.finish()
}

/// Uid for a prepaid session package.
pub fn package_uid(user: &str, mentor: &str, call_type: &str, purchased_ts: i64, seq: u64) -> Uid {
    let mut builder = UidBuilder::new(b"package_uid.v1");
    builder
        .write_str(user)
        .write_str(mentor)
        .write_str(call_type)
        .write_i64(purchased_ts)
        .write_u64(seq);
    builder.finish()
}

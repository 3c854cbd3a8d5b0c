//! Identifier newtypes shared across the engine.
//!
//! Principal and resource ids arrive from the outside world as opaque
//! strings; entries, sessions, and packages are minted internally as
//! deterministic 128-bit uids (see [`crate::uid`]).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::OwnerKind;
use crate::uid::Uid;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// A user (coin-spending) principal.
    UserId
);
string_id!(
    /// A mentor (payout-receiving) principal.
    MentorId
);
string_id!(
    /// A mentor category, carried on packages for reporting.
    CategoryId
);
string_id!(
    /// One published availability window on a mentor's schedule.
    SlotId
);

macro_rules! uid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uid);

        impl $name {
            pub fn from_uid(uid: Uid) -> Self {
                Self(uid)
            }

            pub fn as_bytes(&self) -> &Uid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for byte in &self.0 {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    };
}

uid_id!(
    /// Immutable ledger entry id.
    EntryId
);
uid_id!(
    /// Session (call) record id.
    SessionId
);
uid_id!(
    /// Prepaid session package id.
    PackageId
);

/// A wallet-owning principal. One type for both sides keeps the ledger
/// from growing parallel, divergent wallet representations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnerId {
    User(UserId),
    Mentor(MentorId),
}

impl OwnerId {
    pub fn kind(&self) -> OwnerKind {
        match self {
            OwnerId::User(_) => OwnerKind::User,
            OwnerId::Mentor(_) => OwnerKind::Mentor,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OwnerId::User(id) => id.as_str(),
            OwnerId::Mentor(id) => id.as_str(),
        }
    }
}

impl From<UserId> for OwnerId {
    fn from(value: UserId) -> Self {
        OwnerId::User(value)
    }
}

impl From<MentorId> for OwnerId {
    fn from(value: MentorId) -> Self {
        OwnerId::Mentor(value)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.as_str())
    }
}

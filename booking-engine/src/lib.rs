//! The booking saga: price a session, move funds, create the session
//! record, and pay the mentor, with every step compensated on failure.
//!
//! Ordering is deliberate. A slot is claimed before any funds move, so
//! the loser of a double-book race is turned away without ever being
//! charged. Funds are reserved before the session exists, and the mentor
//! is paid only once the session record is in place. Any failure after
//! the first side effect runs the accumulated compensations in reverse,
//! each retried on a backoff policy and safe to repeat.

pub mod engine;
pub mod error;
pub mod rooms;
pub mod session;
pub mod slots;

pub use engine::{BookingConfirmation, BookingEngine, BookingIntent, BookingRequest, PackageOrder};
pub use error::{BookingError, Result};
pub use rooms::{FallbackRoomProvisioner, Room, RoomError, RoomProvisioning};
pub use session::{SessionRecord, SessionStatus, SessionStore};
pub use slots::{Slot, SlotBoard};

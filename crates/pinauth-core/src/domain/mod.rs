//! Domain entities for the PIN auth relay.
//!
//! Pure types with no I/O: the validated [`Pin`], the [`ConnectionId`] of a
//! transport connection, and the [`Session`] that binds the two.  Time is
//! passed in as `std::time::Instant` values so that expiry rules can be
//! tested without a clock.

pub mod pin;
pub mod session;

pub use pin::{Pin, PinError, MAX_PIN_LEN, MIN_PIN_LEN};
pub use session::{ConnectionId, Session, SESSION_TTL};

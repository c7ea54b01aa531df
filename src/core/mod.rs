//! Leaf utilities shared by every layer: errors, content digests and clocks.

pub mod clock;
pub mod digest;
pub mod error;

pub use clock::{Clock, FixedClock, SystemClock};
pub use digest::digest_hex;
pub use error::{Error, ErrorKind, Result, StoreError};

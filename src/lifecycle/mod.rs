//! Chunk lifecycle management.
//!
//! This module owns every rule about a chunk's life on the ledger:
//! - Registration, alone or in validated batches
//! - Policy application with integrity checking against the stored hash
//! - Expiry anchored to the ledger creation time, never to the caller's clock
//! - Expired chunk discovery and deletion
//!
//! # Example
//!
//! ```
//! use time::macros::datetime;
//! use watchdog::codec::encode_chunk;
//! use watchdog::{ChunkData, Watchdog, WorldState};
//!
//! let engine = Watchdog::default();
//! let mut world = WorldState::new();
//! let data = encode_chunk(&ChunkData::new("c1", Default::default()))?;
//!
//! world.execute("tx1", datetime!(2024-05-01 12:00 UTC), |tx| {
//!     engine.add_chunk_with_policy(tx, "c1", &data, "signal_energy_policy_v1")
//! })?;
//! world.execute("tx2", datetime!(2024-05-01 12:05 UTC), |tx| {
//!     engine.update_chunk_expiry_date(tx, "c1")
//! })?;
//!
//! let expired = world.execute("tx3", datetime!(2024-05-01 13:00 UTC), |tx| {
//!     engine.get_expired_chunks(tx, "2024-05-01T12:30:00Z")
//! })?;
//! assert_eq!(expired.len(), 1);
//! # Ok::<(), watchdog::Error>(())
//! ```

mod engine;
mod records;

pub use engine::Watchdog;

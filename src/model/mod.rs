//! Ledger data model.
//!
//! - [`ChunkData`] / [`SensorData`]: raw measurement payloads submitted by clients.
//! - [`Asset`]: the record persisted under a chunk id.
//! - [`HistoryRecord`]: one replayed ledger entry for an asset id.
//!
//! Serialized forms are canonical: field order is fixed by the types, never by
//! map iteration, because the bytes are hashed and replicated.

mod asset;
mod chunk;
mod history;
pub mod wire;

pub use asset::Asset;
pub use chunk::{ChunkData, SensorData, CHANNEL_COUNT};
pub use history::HistoryRecord;

//! Deterministic chunk-retention engine.
//!
//! Sensor-data chunks are registered on an append-only key-value ledger as
//! assets. A retention policy derives an expiry period from the chunk
//! content; the absolute expiry date is anchored to the commit timestamp of
//! the asset's first ledger entry, so every replica executing the same
//! transaction computes the same bytes.
//!
//! Layers, leaves first:
//! - [`core`]: errors, digest, clock
//! - [`model`]: sensor chunks, assets, history records
//! - [`codec`]: base64-wrapped JSON transport encoding
//! - [`policy`]: the fixed retention policy registry
//! - [`ledger`]: the transaction stub abstraction plus an in-memory,
//!   optionally journaled, reference ledger
//! - [`store`]: typed asset access over a stub
//! - [`lifecycle`]: the asset state machine
//! - [`contract`]: string-argument dispatch for hosts

pub mod codec;
pub mod config;
pub mod contract;
pub mod core;
pub mod ledger;
pub mod lifecycle;
pub mod model;
pub mod policy;
pub mod store;

pub use crate::config::EngineConfig;
pub use crate::core::{Error, ErrorKind, Result};
pub use crate::ledger::{Stub, Transaction, WorldState};
pub use crate::lifecycle::Watchdog;
pub use crate::model::{Asset, ChunkData, HistoryRecord, SensorData};
pub use crate::policy::{PolicyId, PolicyRegistry};

//! Ledger boundary.
//!
//! The engine consumes a ledger only through [`Stub`], the per-transaction
//! view a host hands to contract code: point reads and writes, range scans,
//! and per-key history. [`WorldState`] is a reference implementation used by
//! the CLI and the tests; a replicated host supplies its own.
//!
//! # Design
//!
//! ```text
//! WorldState
//!   state:   key -> latest value (BTreeMap, ordered scans)
//!   history: key -> [KeyModification] in commit order
//!   journal: optional framed append-only file, one record per transaction
//!
//! Transaction (one per invocation)
//!   reads  -> committed state only
//!   writes -> staged, applied on commit(), discarded on drop
//! ```
//!
//! Iterators returned by [`Stub::state_by_range`] and [`Stub::history_for_key`]
//! hold a ledger cursor until they are dropped, so every exit path (end of
//! loop, `break`, `?`) releases it.

mod journal;
mod state;

use time::OffsetDateTime;

use crate::core::StoreError;

pub use journal::{Block, BlockWrite, Journal};
pub use state::{CommitReceipt, Transaction, WorldState};

/// One live key and its raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

/// One committed change to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyModification {
    pub tx_id: String,
    pub timestamp: OffsetDateTime,
    /// Empty when `is_delete` is set.
    pub value: Vec<u8>,
    pub is_delete: bool,
}

pub type StateIter<'a> = Box<dyn Iterator<Item = Result<KeyValue, StoreError>> + 'a>;
pub type HistoryIter<'a> = Box<dyn Iterator<Item = Result<KeyModification, StoreError>> + 'a>;

/// The per-transaction ledger view consumed by the engine.
pub trait Stub {
    fn tx_id(&self) -> &str;

    /// Timestamp agreed for this transaction; the engine's only notion of "now".
    fn tx_timestamp(&self) -> OffsetDateTime;

    /// `None` when the key has no live value.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    fn del_state(&mut self, key: &str) -> Result<(), StoreError>;

    /// Live keys in `[start_key, end_key)`, ascending. An empty bound is open.
    fn state_by_range(&self, start_key: &str, end_key: &str) -> Result<StateIter<'_>, StoreError>;

    /// Every committed change to `key`, oldest first.
    fn history_for_key(&self, key: &str) -> Result<HistoryIter<'_>, StoreError>;
}

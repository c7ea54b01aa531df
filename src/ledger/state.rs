use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::path::Path;

use log::{debug, info};
use time::OffsetDateTime;

use crate::core::StoreError;
use crate::ledger::journal::{Block, BlockWrite, Journal};
use crate::ledger::{HistoryIter, KeyModification, KeyValue, StateIter, Stub};

/// In-memory world state with per-key history and an optional journal.
#[derive(Debug, Default)]
pub struct WorldState {
    state: BTreeMap<String, Vec<u8>>,
    history: BTreeMap<String, Vec<KeyModification>>,
    committed: BTreeSet<String>,
    open_cursors: Cell<usize>,
    journal: Option<Journal>,
}

/// Summary of a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub tx_id: String,
    pub timestamp: OffsetDateTime,
    pub keys_written: usize,
}

impl WorldState {
    /// A volatile world state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens (or creates) a journal-backed world state and replays it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let (journal, blocks) = Journal::open(path.as_ref())?;
        let mut world = Self::default();
        let replayed = blocks.len();
        for block in blocks {
            world.apply_block(block)?;
        }
        info!(
            "replayed {} transactions from {} ({} live keys)",
            replayed,
            path.as_ref().display(),
            world.state.len()
        );
        world.journal = Some(journal);
        Ok(world)
    }

    /// Starts a transaction. Writes become visible only after
    /// [`Transaction::commit`].
    pub fn begin(
        &mut self,
        tx_id: impl Into<String>,
        timestamp: OffsetDateTime,
    ) -> Transaction<'_> {
        Transaction {
            world: self,
            tx_id: tx_id.into(),
            timestamp,
            writes: BTreeMap::new(),
        }
    }

    /// Runs `body` in a fresh transaction, committing on `Ok` and discarding
    /// every staged write on `Err`.
    pub fn execute<T, F>(
        &mut self,
        tx_id: impl Into<String>,
        timestamp: OffsetDateTime,
        body: F,
    ) -> crate::core::Result<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> crate::core::Result<T>,
    {
        let mut tx = self.begin(tx_id, timestamp);
        let value = body(&mut tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Number of range or history cursors not yet dropped.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.get()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn committed_transactions(&self) -> usize {
        self.committed.len()
    }

    fn apply_block(&mut self, block: Block) -> Result<(), StoreError> {
        if !self.committed.insert(block.tx_id.clone()) {
            return Err(StoreError::DuplicateTransaction(block.tx_id));
        }
        for write in block.writes {
            let modification = KeyModification {
                tx_id: block.tx_id.clone(),
                timestamp: block.timestamp,
                is_delete: write.value.is_none(),
                value: write.value.clone().unwrap_or_default(),
            };
            match write.value {
                Some(value) => {
                    self.state.insert(write.key.clone(), value);
                }
                None => {
                    self.state.remove(&write.key);
                }
            }
            self.history.entry(write.key).or_default().push(modification);
        }
        Ok(())
    }

    fn cursor<I>(&self, inner: I) -> Cursor<'_, I> {
        self.open_cursors.set(self.open_cursors.get() + 1);
        Cursor {
            inner,
            open: &self.open_cursors,
        }
    }
}

/// A transaction against a [`WorldState`].
///
/// Reads observe the state committed before the transaction began; the
/// transaction's own writes are not visible to it.
pub struct Transaction<'a> {
    world: &'a mut WorldState,
    tx_id: String,
    timestamp: OffsetDateTime,
    writes: BTreeMap<String, Option<Vec<u8>>>,
}

impl Transaction<'_> {
    /// Number of keys with a staged write.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Applies all staged writes as one block.
    ///
    /// The block reaches the journal before the in-memory state changes.
    pub fn commit(mut self) -> Result<CommitReceipt, StoreError> {
        if self.world.committed.contains(&self.tx_id) {
            return Err(StoreError::DuplicateTransaction(self.tx_id.clone()));
        }
        let writes: Vec<BlockWrite> = std::mem::take(&mut self.writes)
            .into_iter()
            .map(|(key, value)| BlockWrite { key, value })
            .collect();
        let block = Block {
            tx_id: self.tx_id.clone(),
            timestamp: self.timestamp,
            writes,
        };
        let keys_written = block.writes.len();

        if let Some(journal) = self.world.journal.as_mut() {
            journal.append(&block)?;
        }
        self.world.apply_block(block)?;

        debug!("committed transaction {} ({} keys)", self.tx_id, keys_written);
        Ok(CommitReceipt {
            tx_id: self.tx_id.clone(),
            timestamp: self.timestamp,
            keys_written,
        })
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.writes.is_empty() {
            debug!(
                "transaction {} aborted, discarding {} staged writes",
                self.tx_id,
                self.writes.len()
            );
        }
    }
}

impl Stub for Transaction<'_> {
    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn tx_timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.world.state.get(key).cloned())
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::Corrupt("empty key".to_string()));
        }
        if value.is_empty() {
            return Err(StoreError::Corrupt(format!("empty value for key {key}")));
        }
        self.writes.insert(key.to_string(), Some(value));
        Ok(())
    }

    fn del_state(&mut self, key: &str) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::Corrupt("empty key".to_string()));
        }
        self.writes.insert(key.to_string(), None);
        Ok(())
    }

    fn state_by_range(&self, start_key: &str, end_key: &str) -> Result<StateIter<'_>, StoreError> {
        let lower = if start_key.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Included(start_key.to_string())
        };
        let upper = if end_key.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(end_key.to_string())
        };

        let inverted = !start_key.is_empty() && !end_key.is_empty() && start_key >= end_key;
        let snapshot: Vec<KeyValue> = if inverted {
            Vec::new()
        } else {
            self.world
                .state
                .range::<String, _>((lower, upper))
                .map(|(key, value)| KeyValue {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect()
        };
        Ok(Box::new(self.world.cursor(snapshot.into_iter().map(Ok::<KeyValue, StoreError>))))
    }

    fn history_for_key(&self, key: &str) -> Result<HistoryIter<'_>, StoreError> {
        let entries = self.world.history.get(key).cloned().unwrap_or_default();
        Ok(Box::new(self.world.cursor(entries.into_iter().map(Ok::<KeyModification, StoreError>))))
    }
}

/// Iterator wrapper that holds one open-cursor slot until dropped.
struct Cursor<'a, I> {
    inner: I,
    open: &'a Cell<usize>,
}

impl<I: Iterator> Iterator for Cursor<'_, I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl<I> Drop for Cursor<'_, I> {
    fn drop(&mut self) {
        self.open.set(self.open.get().saturating_sub(1));
    }
}

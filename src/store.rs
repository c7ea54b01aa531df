//! Typed asset access over a ledger [`Stub`].
//!
//! The store only translates between raw ledger values and [`Asset`]s; it
//! applies no lifecycle rules. Every ledger failure surfaces as
//! [`Error::Store`], every undecodable value as [`Error::Decode`].

use crate::core::{Error, Result};
use crate::ledger::{HistoryIter, StateIter, Stub};
use crate::model::{Asset, HistoryRecord};

pub struct AssetStore<'a, S: Stub + ?Sized> {
    stub: &'a mut S,
}

impl<'a, S: Stub + ?Sized> AssetStore<'a, S> {
    pub fn new(stub: &'a mut S) -> Self {
        Self { stub }
    }

    pub fn stub(&self) -> &S {
        &*self.stub
    }

    /// True when `id` has a live value.
    pub fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.stub.get_state(id)?.is_some())
    }

    pub fn get(&self, id: &str) -> Result<Asset> {
        let bytes = self
            .stub
            .get_state(id)?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        Asset::from_bytes(&bytes)
    }

    /// Unconditional upsert.
    pub fn put(&mut self, id: &str, asset: &Asset) -> Result<()> {
        let bytes = asset.to_bytes()?;
        self.stub.put_state(id, bytes)?;
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> Result<()> {
        self.stub.del_state(id)?;
        Ok(())
    }

    /// Live assets in `[start, end)`; empty bounds are open.
    ///
    /// The returned iterator owns the ledger cursor until it is dropped.
    pub fn scan(&self, start: &str, end: &str) -> Result<AssetScan<'_>> {
        Ok(AssetScan {
            inner: self.stub.state_by_range(start, end)?,
        })
    }

    /// Every ledger entry of `id`, oldest first.
    pub fn history(&self, id: &str) -> Result<AssetHistory<'_>> {
        Ok(AssetHistory {
            id: id.to_string(),
            inner: self.stub.history_for_key(id)?,
        })
    }
}

/// Decoding iterator over a range scan.
pub struct AssetScan<'a> {
    inner: StateIter<'a>,
}

impl Iterator for AssetScan<'_> {
    type Item = Result<Asset>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.inner.next()?;
        Some(entry.map_err(Error::from).and_then(|kv| {
            Asset::from_bytes(&kv.value)
                .map_err(|err| Error::Decode(format!("record {}: {err}", kv.key)))
        }))
    }
}

/// Decoding iterator over a key history.
pub struct AssetHistory<'a> {
    id: String,
    inner: HistoryIter<'a>,
}

impl Iterator for AssetHistory<'_> {
    type Item = Result<HistoryRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.inner.next()? {
            Ok(entry) => entry,
            Err(err) => return Some(Err(err.into())),
        };
        let record = if entry.value.is_empty() {
            Asset::tombstone(self.id.clone())
        } else {
            match Asset::from_bytes(&entry.value) {
                Ok(asset) => asset,
                Err(err) => {
                    return Some(Err(Error::Decode(format!(
                        "history of {} at tx {}: {err}",
                        self.id, entry.tx_id
                    ))))
                }
            }
        };
        Some(Ok(HistoryRecord {
            record,
            tx_id: entry.tx_id,
            timestamp: entry.timestamp,
            is_delete: entry.is_delete,
        }))
    }
}

//! Single-record operations and history-derived timestamps.
//!
//! Each function is one step of a transaction: it reads through the store,
//! checks one precondition and issues at most one write.

use std::time::Duration;

use time::OffsetDateTime;

use crate::core::{Error, Result};
use crate::ledger::Stub;
use crate::model::{Asset, HistoryRecord};
use crate::store::AssetStore;

/// Fails with `AlreadyExists` if `id` is live or was ever written, so a
/// deleted id is never reused and creation time stays unambiguous.
pub(crate) fn ensure_unused<S: Stub + ?Sized>(
    store: &AssetStore<'_, S>,
    id: &str,
) -> Result<()> {
    if store.exists(id)? || store.history(id)?.next().is_some() {
        return Err(Error::AlreadyExists(id.to_string()));
    }
    Ok(())
}

pub(crate) fn create<S: Stub + ?Sized>(
    store: &mut AssetStore<'_, S>,
    asset: &Asset,
) -> Result<()> {
    ensure_unused(store, &asset.chunk_id)?;
    store.put(&asset.chunk_id, asset)
}

pub(crate) fn read<S: Stub + ?Sized>(store: &AssetStore<'_, S>, id: &str) -> Result<Asset> {
    store.get(id)
}

pub(crate) fn update<S: Stub + ?Sized>(
    store: &mut AssetStore<'_, S>,
    id: &str,
    asset: &Asset,
) -> Result<()> {
    if asset.chunk_id != id {
        return Err(Error::IdMismatch {
            id: id.to_string(),
            chunk_id: asset.chunk_id.clone(),
        });
    }
    if !store.exists(id)? {
        return Err(Error::NotFound(id.to_string()));
    }
    store.put(id, asset)
}

pub(crate) fn delete<S: Stub + ?Sized>(store: &mut AssetStore<'_, S>, id: &str) -> Result<()> {
    if !store.exists(id)? {
        return Err(Error::NotFound(id.to_string()));
    }
    store.delete(id)
}

/// Full history of `id`, oldest first. Fails on the first undecodable entry.
pub(crate) fn history<S: Stub + ?Sized>(
    store: &AssetStore<'_, S>,
    id: &str,
) -> Result<Vec<HistoryRecord>> {
    store.history(id)?.collect()
}

/// Commit timestamp of the first ledger entry of `id`.
pub(crate) fn creation_time<S: Stub + ?Sized>(
    store: &AssetStore<'_, S>,
    id: &str,
) -> Result<OffsetDateTime> {
    history(store, id)?
        .first()
        .map(|entry| entry.timestamp)
        .ok_or_else(|| Error::EmptyHistory(id.to_string()))
}

/// Creation instant plus `period`, as an exact elapsed interval.
pub(crate) fn expiry_date<S: Stub + ?Sized>(
    store: &AssetStore<'_, S>,
    id: &str,
    period: Duration,
) -> Result<OffsetDateTime> {
    let created = creation_time(store, id)?;
    add_period(created, period).ok_or_else(|| Error::ExpiryOverflow {
        chunk_id: id.to_string(),
        period,
    })
}

pub(crate) fn add_period(instant: OffsetDateTime, period: Duration) -> Option<OffsetDateTime> {
    let delta = time::Duration::try_from(period).ok()?;
    instant.checked_add(delta)
}

//! The watchdog engine: public chunk lifecycle transactions.

use std::collections::BTreeSet;

use log::{debug, info, warn};
use time::OffsetDateTime;

use crate::codec::decode_chunk;
use crate::config::EngineConfig;
use crate::core::{Error, Result};
use crate::ledger::Stub;
use crate::lifecycle::records;
use crate::model::wire::parse_instant;
use crate::model::{Asset, HistoryRecord};
use crate::policy::{Policy, PolicyContext, PolicyRegistry};
use crate::store::AssetStore;

/// Chunk lifecycle engine.
///
/// Stateless between calls: every operation runs inside the transaction the
/// caller hands in through a [`Stub`], and every failure aborts that
/// transaction. The present instant is always the transaction timestamp.
#[derive(Debug, Clone)]
pub struct Watchdog {
    /// Engine limits.
    config: EngineConfig,

    /// Policies selectable by id.
    registry: &'static PolicyRegistry,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Watchdog {
    /// Create an engine over the builtin policy registry.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_registry(config, PolicyRegistry::builtin())
    }

    pub fn with_registry(config: EngineConfig, registry: &'static PolicyRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &'static PolicyRegistry {
        self.registry
    }

    // ------------------------------------------------------------------
    // Record operations
    // ------------------------------------------------------------------

    /// Store a new asset. Fails with `AlreadyExists` if its id was ever used.
    pub fn create_asset<S: Stub + ?Sized>(&self, stub: &mut S, asset: &Asset) -> Result<()> {
        records::create(&mut AssetStore::new(stub), asset)
    }

    pub fn read_asset<S: Stub + ?Sized>(&self, stub: &mut S, id: &str) -> Result<Asset> {
        records::read(&AssetStore::new(stub), id)
    }

    pub fn update_asset<S: Stub + ?Sized>(
        &self,
        stub: &mut S,
        id: &str,
        asset: &Asset,
    ) -> Result<()> {
        records::update(&mut AssetStore::new(stub), id, asset)
    }

    pub fn delete_asset<S: Stub + ?Sized>(&self, stub: &mut S, id: &str) -> Result<()> {
        records::delete(&mut AssetStore::new(stub), id)
    }

    pub fn asset_history<S: Stub + ?Sized>(
        &self,
        stub: &mut S,
        id: &str,
    ) -> Result<Vec<HistoryRecord>> {
        records::history(&AssetStore::new(stub), id)
    }

    /// Timestamp of the first ledger entry for `id`.
    pub fn creation_time<S: Stub + ?Sized>(
        &self,
        stub: &mut S,
        id: &str,
    ) -> Result<OffsetDateTime> {
        records::creation_time(&AssetStore::new(stub), id)
    }

    /// Ledger creation time of `id` plus `period`.
    pub fn compute_expiry_date<S: Stub + ?Sized>(
        &self,
        stub: &mut S,
        id: &str,
        period: std::time::Duration,
    ) -> Result<OffsetDateTime> {
        records::expiry_date(&AssetStore::new(stub), id, period)
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Register a chunk without a retention policy.
    pub fn add_chunk<S: Stub + ?Sized>(
        &self,
        stub: &mut S,
        chunk_id: &str,
        encoded: &str,
    ) -> Result<()> {
        debug!("tx {}: AddChunk {chunk_id}", stub.tx_id());
        let ctx = PolicyContext::from_tx_timestamp(stub.tx_timestamp());
        let mut store = AssetStore::new(stub);
        let asset = self.prepare(&store, chunk_id, encoded, None, &ctx)?;
        records::create(&mut store, &asset)?;
        info!("registered chunk {chunk_id} (hash {})", asset.data_hash);
        Ok(())
    }

    /// Register a chunk and evaluate `policy_id` for its expiry period.
    ///
    /// The expiry date stays unset until [`Watchdog::update_chunk_expiry_date`]
    /// anchors the period to the ledger creation time.
    pub fn add_chunk_with_policy<S: Stub + ?Sized>(
        &self,
        stub: &mut S,
        chunk_id: &str,
        encoded: &str,
        policy_id: &str,
    ) -> Result<()> {
        debug!("tx {}: AddChunkWithPolicy {chunk_id} {policy_id}", stub.tx_id());
        let ctx = PolicyContext::from_tx_timestamp(stub.tx_timestamp());
        let mut store = AssetStore::new(stub);
        let asset = self.prepare(&store, chunk_id, encoded, Some(policy_id), &ctx)?;
        records::create(&mut store, &asset)?;
        info!(
            "registered chunk {chunk_id} under {policy_id} (period {:?})",
            asset.expiry_period
        );
        Ok(())
    }

    /// Register several chunks, each with its own policy.
    ///
    /// Every entry is validated before the first write. A duplicate id
    /// inside the batch is rejected with `AlreadyExists` during validation,
    /// because staged writes are not visible to reads of the same
    /// transaction.
    pub fn add_chunk_with_policy_batch<S, I, D, P>(
        &self,
        stub: &mut S,
        chunk_ids: &[I],
        encoded: &[D],
        policy_ids: &[P],
    ) -> Result<()>
    where
        S: Stub + ?Sized,
        I: AsRef<str>,
        D: AsRef<str>,
        P: AsRef<str>,
    {
        debug!("tx {}: AddChunkWithPolicyBatch of {}", stub.tx_id(), chunk_ids.len());
        if chunk_ids.len() != encoded.len() || chunk_ids.len() != policy_ids.len() {
            warn!(
                "tx {}: batch sizes differ (ids {}, data {}, policies {})",
                stub.tx_id(),
                chunk_ids.len(),
                encoded.len(),
                policy_ids.len()
            );
            return Err(Error::SizeMismatch {
                ids: chunk_ids.len(),
                data: encoded.len(),
                policies: policy_ids.len(),
            });
        }

        let ctx = PolicyContext::from_tx_timestamp(stub.tx_timestamp());
        let mut store = AssetStore::new(stub);

        let mut seen = BTreeSet::new();
        let mut validated = Vec::with_capacity(chunk_ids.len());
        for ((id, data), policy) in chunk_ids.iter().zip(encoded).zip(policy_ids) {
            let id = id.as_ref();
            if !seen.insert(id) {
                warn!("batch repeats chunk id {id}");
                return Err(Error::AlreadyExists(id.to_string()));
            }
            validated.push(self.prepare(&store, id, data.as_ref(), Some(policy.as_ref()), &ctx)?);
        }

        for (index, asset) in validated.iter().enumerate() {
            if let Err(err) = records::create(&mut store, asset) {
                warn!("batch write {index} ({}) failed: {err}", asset.chunk_id);
                return Err(err);
            }
        }
        info!("registered batch of {} chunks", validated.len());
        Ok(())
    }

    /// Apply `policy_id` to an existing chunk and anchor its expiry date.
    ///
    /// `encoded` must hash to the stored `DataHash`.
    pub fn apply_policy<S: Stub + ?Sized>(
        &self,
        stub: &mut S,
        chunk_id: &str,
        encoded: &str,
        policy_id: &str,
    ) -> Result<()> {
        debug!("tx {}: ApplyPolicy {chunk_id} {policy_id}", stub.tx_id());
        let ctx = PolicyContext::from_tx_timestamp(stub.tx_timestamp());
        let mut store = AssetStore::new(stub);
        let mut asset = records::read(&store, chunk_id)?;

        let chunk = decode_chunk(encoded)?;
        let hash = chunk.hash()?;
        if hash != asset.data_hash {
            warn!(
                "chunk {chunk_id}: supplied data hashes to {hash}, ledger holds {}",
                asset.data_hash
            );
            return Err(Error::IntegrityMismatch(chunk_id.to_string()));
        }

        let period = self.registry.apply(policy_id, &chunk, &ctx)?;
        let expiry = records::expiry_date(&store, chunk_id, period)?;
        asset.applied_policy_id = Some(policy_id.to_string());
        asset.expiry_period = Some(period);
        asset.expiry_date = Some(expiry);
        records::update(&mut store, chunk_id, &asset)?;
        info!("chunk {chunk_id}: applied {policy_id}, expires {expiry}");
        Ok(())
    }

    /// Recompute the expiry date from ledger creation time and stored period.
    pub fn update_chunk_expiry_date<S: Stub + ?Sized>(
        &self,
        stub: &mut S,
        chunk_id: &str,
    ) -> Result<()> {
        debug!("tx {}: UpdateChunkExpiryDate {chunk_id}", stub.tx_id());
        let mut store = AssetStore::new(stub);
        let mut asset = records::read(&store, chunk_id)?;
        let period = match asset.expiry_period {
            Some(period) if asset.has_policy() => period,
            _ => return Err(Error::PolicyNotApplied(chunk_id.to_string())),
        };

        let expiry = records::expiry_date(&store, chunk_id, period)?;
        if asset.expiry_date == Some(expiry) {
            return Err(Error::NoChange(chunk_id.to_string()));
        }
        asset.expiry_date = Some(expiry);
        records::update(&mut store, chunk_id, &asset)?;
        info!("chunk {chunk_id}: expiry date set to {expiry}");
        Ok(())
    }

    /// Assets whose expiry date is strictly before `cutoff`.
    ///
    /// `cutoff` is an RFC 3339 timestamp no later than the transaction
    /// timestamp. At most `expired_page_limit` assets are returned, in key
    /// order. Assets with a policy but no computed expiry date are skipped.
    pub fn get_expired_chunks<S: Stub + ?Sized>(
        &self,
        stub: &mut S,
        cutoff: &str,
    ) -> Result<Vec<Asset>> {
        debug!("tx {}: GetExpiredChunks {cutoff}", stub.tx_id());
        let cutoff = parse_instant(cutoff)?;
        let now = stub.tx_timestamp();
        if cutoff > now {
            warn!("rejecting cutoff {cutoff} after transaction time {now}");
            return Err(Error::FutureDateRejected(cutoff));
        }

        let limit = self.config.expired_page_limit;
        let store = AssetStore::new(stub);
        let mut expired = Vec::new();
        for asset in store.scan("", "")? {
            let asset = asset?;
            if matches!(asset.expiry_date, Some(date) if date < cutoff) {
                expired.push(asset);
                if expired.len() >= limit {
                    debug!("expired chunk page full at {limit}");
                    break;
                }
            }
        }
        Ok(expired)
    }

    /// Delete a chunk whose expiry date is not after the transaction time.
    pub fn delete_chunk_if_expired<S: Stub + ?Sized>(
        &self,
        stub: &mut S,
        chunk_id: &str,
    ) -> Result<()> {
        debug!("tx {}: DeleteChunkIfExpired {chunk_id}", stub.tx_id());
        let now = stub.tx_timestamp();
        let mut store = AssetStore::new(stub);
        let asset = records::read(&store, chunk_id)?;
        if asset.applied_policy_id.is_none() {
            return Err(Error::PolicyNotApplied(chunk_id.to_string()));
        }
        let expiry_date = asset
            .expiry_date
            .ok_or_else(|| Error::ExpiryNotComputed(chunk_id.to_string()))?;
        if expiry_date > now {
            return Err(Error::NotYetExpired {
                chunk_id: chunk_id.to_string(),
                expiry_date,
            });
        }
        records::delete(&mut store, chunk_id)?;
        info!("chunk {chunk_id}: deleted, expired at {expiry_date}");
        Ok(())
    }

    /// Every live asset in key order, capped by `all_assets_limit` if set.
    pub fn get_all_assets<S: Stub + ?Sized>(&self, stub: &mut S) -> Result<Vec<Asset>> {
        debug!("tx {}: GetAllAssets", stub.tx_id());
        let store = AssetStore::new(stub);
        let scan = store.scan("", "")?;
        match self.config.all_assets_limit {
            Some(limit) => scan.take(limit).collect(),
            None => scan.collect(),
        }
    }

    /// True if `chunk_id` was ever written, even if since deleted.
    pub fn chunk_existed<S: Stub + ?Sized>(&self, stub: &mut S, chunk_id: &str) -> Result<bool> {
        debug!("tx {}: ChunkExisted {chunk_id}", stub.tx_id());
        Ok(!records::history(&AssetStore::new(stub), chunk_id)?.is_empty())
    }

    pub fn read_chunk<S: Stub + ?Sized>(&self, stub: &mut S, chunk_id: &str) -> Result<Asset> {
        debug!("tx {}: ReadChunk {chunk_id}", stub.tx_id());
        records::read(&AssetStore::new(stub), chunk_id)
    }

    /// Every ledger entry of `chunk_id`, oldest first, deletions as tombstones.
    pub fn get_chunk_history<S: Stub + ?Sized>(
        &self,
        stub: &mut S,
        chunk_id: &str,
    ) -> Result<Vec<HistoryRecord>> {
        debug!("tx {}: GetChunkHistory {chunk_id}", stub.tx_id());
        records::history(&AssetStore::new(stub), chunk_id)
    }

    pub fn available_policies(&self) -> Vec<&'static Policy> {
        self.registry.enumerate()
    }

    /// Validation half of every create path: id never used, data decodable,
    /// policy known and evaluable.
    fn prepare<S: Stub + ?Sized>(
        &self,
        store: &AssetStore<'_, S>,
        chunk_id: &str,
        encoded: &str,
        policy_id: Option<&str>,
        ctx: &PolicyContext,
    ) -> Result<Asset> {
        records::ensure_unused(store, chunk_id)?;
        let chunk = decode_chunk(encoded)?;
        let asset = Asset::new(chunk_id, chunk.hash()?);
        match policy_id {
            Some(policy_id) => {
                let period = self.registry.apply(policy_id, &chunk, ctx)?;
                Ok(asset.with_policy(policy_id, period))
            }
            None => Ok(asset),
        }
    }
}

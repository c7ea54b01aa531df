use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::core::{Error, Result};
use crate::model::wire;

/// The persisted ledger record of one chunk.
///
/// Fields are declared in alphabetic order of their wire names so that
/// independent writers produce identical bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Asset {
    /// Policy that produced `expiry_period`; `None` until one is applied.
    #[serde(rename = "AppliedPolicyId", with = "wire::policy_id")]
    pub applied_policy_id: Option<String>,

    #[serde(rename = "ChunkId")]
    pub chunk_id: String,

    /// Digest of the chunk data at creation. Never rewritten.
    #[serde(rename = "DataHash")]
    pub data_hash: String,

    /// Creation instant plus `expiry_period`, once computed.
    #[serde(rename = "ExpiryDate", with = "wire::expiry_date")]
    pub expiry_date: Option<OffsetDateTime>,

    #[serde(rename = "ExpiryPeriod", with = "wire::expiry_period")]
    pub expiry_period: Option<Duration>,
}

impl Asset {
    /// A freshly registered chunk with no policy applied.
    pub fn new(chunk_id: impl Into<String>, data_hash: impl Into<String>) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            data_hash: data_hash.into(),
            ..Self::default()
        }
    }

    /// A tombstone snapshot: only the id is known.
    pub fn tombstone(chunk_id: impl Into<String>) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy_id: impl Into<String>, period: Duration) -> Self {
        self.applied_policy_id = Some(policy_id.into());
        self.expiry_period = Some(period);
        self
    }

    /// True when both a policy and a non-zero period are recorded.
    pub fn has_policy(&self) -> bool {
        self.applied_policy_id.is_some() && self.expiry_period.is_some_and(|p| !p.is_zero())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|err| {
            Error::Encode(format!("unable to serialize asset {}: {err}", self.chunk_id))
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|err| Error::Decode(format!("unable to deserialize asset: {err}")))
    }
}

use serde::Serialize;
use time::OffsetDateTime;

use crate::model::{wire, Asset};

/// One replayed ledger entry for an asset id.
///
/// Deletions carry a tombstone snapshot with only the id populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRecord {
    pub record: Asset,
    #[serde(rename = "txId")]
    pub tx_id: String,
    /// Commit timestamp assigned by the ledger.
    #[serde(with = "wire::timestamp")]
    pub timestamp: OffsetDateTime,
    #[serde(rename = "isDelete")]
    pub is_delete: bool,
}

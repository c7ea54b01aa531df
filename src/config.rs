//! Engine configuration.
//!
//! Loaded from a JSON file by hosts; every field has a default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// Default page size of `GetExpiredChunks`.
pub const DEFAULT_EXPIRED_PAGE_LIMIT: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of assets returned by one `GetExpiredChunks` call.
    /// Default: 30
    pub expired_page_limit: usize,

    /// Maximum number of assets returned by `GetAllAssets`.
    /// Default: unlimited
    pub all_assets_limit: Option<usize>,

    /// Journal file backing the local world state (CLI host only).
    /// Default: none, state is volatile
    pub journal_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            expired_page_limit: DEFAULT_EXPIRED_PAGE_LIMIT,
            all_assets_limit: None,
            journal_path: None,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|err| {
            Error::InvalidArgument(format!("unable to read config {}: {err}", path.display()))
        })?;
        let config: Self = serde_json::from_slice(&bytes).map_err(|err| {
            Error::InvalidArgument(format!("invalid config {}: {err}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.expired_page_limit == 0 {
            return Err(Error::InvalidArgument(
                "expired_page_limit must be at least 1".to_string(),
            ));
        }
        if self.all_assets_limit == Some(0) {
            return Err(Error::InvalidArgument(
                "all_assets_limit must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

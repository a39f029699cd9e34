use crate::error::LedgerError;
use crate::{AccountId, BASIS_POINTS_DIVISOR};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for LedgerError {
    fn from(err: ConfigError) -> Self {
        LedgerError::InvalidParams(err.to_string())
    }
}

/// Deployment settings. Fee rate, score range and batch sizes are fixed
/// protocol constants and cannot be set here; unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    pub admin: AccountId,
    pub publisher_share_bps: u16, // Portion of cost_per_view credited to the publisher
    pub campaign_types: Vec<String>,
    /// Accounts allowed to record views. Empty means any caller.
    pub view_operators: Vec<AccountId>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            admin: "admin".to_string(),
            publisher_share_bps: 10_000, // full pass-through
            campaign_types: vec!["banner".into(), "video".into(), "native".into()],
            view_operators: Vec::new(),
        }
    }
}

impl LedgerConfig {
    pub fn normalized(mut self) -> Self {
        self.admin = self.admin.trim().to_string();
        self.publisher_share_bps = self.publisher_share_bps.min(BASIS_POINTS_DIVISOR as u16);
        let types: BTreeSet<String> = self
            .campaign_types
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        self.campaign_types = types.into_iter().collect();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin.trim().is_empty() {
            return Err(ConfigError::Invalid("admin account must be set".into()));
        }
        if u64::from(self.publisher_share_bps) > BASIS_POINTS_DIVISOR {
            return Err(ConfigError::Invalid(format!(
                "publisher_share_bps {} exceeds {BASIS_POINTS_DIVISOR}",
                self.publisher_share_bps
            )));
        }
        if self.view_operators.iter().any(|op| op.trim().is_empty()) {
            return Err(ConfigError::Invalid("view operator ids must not be empty".into()));
        }
        Ok(())
    }

    /// Parse a JSON document; missing fields fall back to [`Default`].
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: LedgerConfig = serde_json::from_slice(bytes)?;
        config.validate()?;
        Ok(config.normalized())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_slice(&bytes)
    }

    pub fn is_admin(&self, caller: &str) -> bool {
        caller == self.admin
    }

    pub fn may_record_views(&self, caller: &str) -> bool {
        self.view_operators.is_empty()
            || self.is_admin(caller)
            || self.view_operators.iter().any(|op| op == caller)
    }
}

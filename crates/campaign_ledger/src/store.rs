use crate::error::LedgerError;
use crate::state::LedgerState;
use sled::{Config as SledConfig, Db as SledDb, Tree as SledTree};
use std::path::Path;
use thiserror::Error;

const TREE_LEDGER: &str = "ledger";
const KEY_STATE: &[u8] = b"state";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid data: {0}")]
    Invalid(String),
}

impl From<PersistenceError> for LedgerError {
    fn from(err: PersistenceError) -> Self {
        LedgerError::Persistence(err.to_string())
    }
}

/// Durable home for the committed ledger state.
pub trait LedgerStore: Send + Sync {
    fn load(&self) -> Result<Option<LedgerState>, PersistenceError>;
    fn persist(&self, state: &LedgerState) -> Result<(), PersistenceError>;
}

/// Keeps the whole state as one JSON document in a sled tree, flushed on
/// every commit.
///
/// The document includes the view outbox and the daily counters. Both grow
/// with traffic, so the owner must call [`AdLedger::drain_view_records`] and
/// [`AdLedger::prune_daily_counters`] regularly to keep commits cheap.
///
/// [`AdLedger::drain_view_records`]: crate::AdLedger::drain_view_records
/// [`AdLedger::prune_daily_counters`]: crate::AdLedger::prune_daily_counters
pub struct SledStore {
    _db: SledDb,
    tree: SledTree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let db = SledConfig::new().path(path).open()?;
        let tree = db.open_tree(TREE_LEDGER)?;
        Ok(Self { _db: db, tree })
    }
}

impl LedgerStore for SledStore {
    fn load(&self) -> Result<Option<LedgerState>, PersistenceError> {
        match self.tree.get(KEY_STATE)? {
            Some(bytes) => {
                if bytes.is_empty() {
                    return Err(PersistenceError::Invalid("empty ledger state".into()));
                }
                Ok(Some(serde_json::from_slice(&bytes)?))
            }
            None => Ok(None),
        }
    }

    fn persist(&self, state: &LedgerState) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec(state)?;
        self.tree.insert(KEY_STATE, bytes)?;
        self.tree.flush()?;
        Ok(())
    }
}

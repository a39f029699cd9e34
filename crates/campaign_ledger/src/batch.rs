//! All-or-nothing execution of bulk operations.
//!
//! Items are applied in order to a working copy of the state, so each item
//! observes the effects of the ones before it. The copy replaces the live
//! state only when every item succeeds; the first failure discards it.

use crate::error::{invalid, LedgerError};
use metrics::increment_counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const MAX_CAMPAIGN_BATCH: usize = 5;
pub const MAX_VIEW_BATCH: usize = 10;
pub const MAX_PUBLISHER_BATCH: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome<R> {
    pub total: usize,
    pub results: Vec<R>,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchProcessor {
    op: &'static str,
    max_items: usize,
}

impl BatchProcessor {
    pub fn new(op: &'static str, max_items: usize) -> Self {
        Self {
            op,
            max_items: max_items.max(1),
        }
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn check_bounds(&self, len: usize) -> Result<(), LedgerError> {
        if len == 0 || len > self.max_items {
            return Err(invalid(format!(
                "{} takes between 1 and {} items, got {len}",
                self.op, self.max_items
            )));
        }
        Ok(())
    }

    pub fn run<S, T, R, F>(
        &self,
        state: &mut S,
        items: Vec<T>,
        mut apply: F,
    ) -> Result<BatchOutcome<R>, LedgerError>
    where
        S: Clone,
        F: FnMut(&mut S, T) -> Result<R, LedgerError>,
    {
        self.check_bounds(items.len())?;
        let mut working = state.clone();
        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match apply(&mut working, item) {
                Ok(result) => results.push(result),
                Err(err) => {
                    warn!(
                        op = self.op,
                        index,
                        code = err.code(),
                        error = %err,
                        "batch rolled back"
                    );
                    increment_counter!("ad_ledger_batches_total", "op" => self.op, "result" => "rolled_back");
                    return Err(err);
                }
            }
        }
        *state = working;
        debug!(op = self.op, items = results.len(), "batch committed");
        increment_counter!("ad_ledger_batches_total", "op" => self.op, "result" => "committed");
        Ok(BatchOutcome {
            total: results.len(),
            results,
        })
    }
}

use crate::Epoch;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies the logical epoch used for campaign windows and daily caps.
///
/// Implementations must never go backwards.
pub trait EpochSource: Send + Sync {
    fn current_epoch(&self) -> Epoch;
}

/// Epoch counter driven by the caller, e.g. a block height follower.
#[derive(Debug, Default)]
pub struct ManualClock {
    epoch: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Epoch) -> Self {
        Self {
            epoch: AtomicU64::new(start),
        }
    }

    pub fn advance(&self, by: Epoch) -> Epoch {
        let previous = self
            .epoch
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(by))
            })
            .unwrap_or_else(|current| current);
        previous.saturating_add(by)
    }

    /// Moves the clock to `epoch` unless it is already past it.
    pub fn set(&self, epoch: Epoch) -> Epoch {
        let previous = self.epoch.fetch_max(epoch, Ordering::SeqCst);
        previous.max(epoch)
    }
}

impl EpochSource for ManualClock {
    fn current_epoch(&self) -> Epoch {
        self.epoch.load(Ordering::SeqCst)
    }
}

/// Wall-clock epochs of `epoch_length_secs` counted from `genesis_unix`.
#[derive(Debug, Clone)]
pub struct WallClock {
    genesis_unix: u64,
    epoch_length_secs: u64,
    floor: Arc<AtomicU64>,
}

impl WallClock {
    pub const DAY_SECS: u64 = 86_400;

    pub fn new(genesis_unix: u64, epoch_length_secs: u64) -> Self {
        Self {
            genesis_unix,
            epoch_length_secs: epoch_length_secs.max(1),
            floor: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn daily(genesis_unix: u64) -> Self {
        Self::new(genesis_unix, Self::DAY_SECS)
    }

    fn epoch_at(&self, unix_secs: u64) -> Epoch {
        unix_secs.saturating_sub(self.genesis_unix) / self.epoch_length_secs
    }
}

impl EpochSource for WallClock {
    fn current_epoch(&self) -> Epoch {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        // clamp against wall clock steps backwards
        let epoch = self.epoch_at(now);
        self.floor.fetch_max(epoch, Ordering::SeqCst).max(epoch)
    }
}

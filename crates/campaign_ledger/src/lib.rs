#![forbid(unsafe_code)]

//! Campaign ledger: budget-metered ad campaigns, publisher verification and
//! per-view payments, with single and all-or-nothing bulk operations.
//!
//! The moving parts, leaves first:
//! - [`PublisherRegistry`] tracks verified publishers and their reputation.
//! - [`CampaignLedger`] owns campaign budgets, pricing, timing and status.
//! - [`ViewMeter`] debits campaigns for views under per-publisher daily caps.
//! - [`BatchProcessor`] runs bulk variants against a working copy of state.
//!
//! [`AdLedger`] ties them together behind one lock, an injected
//! [`EpochSource`] and an optional durable [`LedgerStore`].

pub mod batch;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod meter;
pub mod registry;
pub mod state;
pub mod store;

pub use batch::{
    BatchOutcome, BatchProcessor, MAX_CAMPAIGN_BATCH, MAX_PUBLISHER_BATCH, MAX_VIEW_BATCH,
};
pub use clock::{EpochSource, ManualClock, WallClock};
pub use config::{ConfigError, LedgerConfig};
pub use engine::{AdLedger, LedgerHandle};
pub use error::LedgerError;
pub use ledger::{
    platform_fee, Campaign, CampaignCreated, CampaignLedger, CampaignMetrics, CampaignParams,
    CampaignStatus, PLATFORM_FEE_BPS,
};
pub use meter::{ViewMeter, ViewRecord, ViewRequest};
pub use registry::{
    Publisher, PublisherRegistry, PublisherVerification, PublisherVerified, MAX_REPUTATION_SCORE,
};
pub use state::LedgerState;
pub use store::{LedgerStore, PersistenceError, SledStore};

pub type AccountId = String;
pub type PublisherId = String;
pub type CampaignId = u64;
pub type Balance = u64;
pub type Epoch = u64;

pub const BASIS_POINTS_DIVISOR: u64 = 10_000;

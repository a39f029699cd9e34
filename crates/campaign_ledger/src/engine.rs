use crate::batch::BatchOutcome;
use crate::clock::EpochSource;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::ledger::{Campaign, CampaignCreated, CampaignMetrics, CampaignParams};
use crate::meter::{ViewRecord, ViewRequest};
use crate::registry::{Publisher, PublisherVerification, PublisherVerified};
use crate::state::LedgerState;
use crate::store::LedgerStore;
use crate::{Balance, CampaignId, Epoch};
use metrics::{counter, gauge, increment_counter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

pub type LedgerHandle = Arc<AdLedger>;

/// Serialized entry point for every ledger operation.
///
/// One mutex guards the whole [`LedgerState`]; each call, bulk calls
/// included, holds it from the first check to the final commit.
pub struct AdLedger {
    config: LedgerConfig,
    clock: Arc<dyn EpochSource>,
    state: Mutex<LedgerState>,
    store: Option<Box<dyn LedgerStore>>,
}

impl AdLedger {
    pub fn new(config: LedgerConfig, clock: Arc<dyn EpochSource>) -> Result<Self, LedgerError> {
        config.validate()?;
        let config = config.normalized();
        let state = LedgerState::new(&config);
        Ok(Self {
            config,
            clock,
            state: Mutex::new(state),
            store: None,
        })
    }

    /// Restores state from `store` when present, otherwise seeds and persists
    /// a fresh one. Campaign types from `config` are merged into restored state.
    pub fn open<S>(
        config: LedgerConfig,
        clock: Arc<dyn EpochSource>,
        store: S,
    ) -> Result<Self, LedgerError>
    where
        S: LedgerStore + 'static,
    {
        config.validate()?;
        let config = config.normalized();
        let state = match store.load()? {
            Some(mut state) => {
                state
                    .ledger
                    .extend_campaign_types(config.campaign_types.iter().cloned());
                info!(
                    campaigns = state.ledger.campaigns().count(),
                    publishers = state.registry.publishers().count(),
                    "restored ledger state"
                );
                state
            }
            None => LedgerState::new(&config),
        };
        store.persist(&state)?;
        Ok(Self {
            config,
            clock,
            state: Mutex::new(state),
            store: Some(Box::new(store)),
        })
    }

    pub fn into_handle(self) -> LedgerHandle {
        Arc::new(self)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn current_epoch(&self) -> Epoch {
        self.clock.current_epoch()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        // state is only ever replaced whole, so a poisoned guard still holds a committed value
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transact<R, F>(&self, op: &'static str, f: F) -> Result<R, LedgerError>
    where
        F: FnOnce(&mut LedgerState, &LedgerConfig, Epoch) -> Result<R, LedgerError>,
    {
        let mut guard = self.lock();
        // read under the lock so commits are ordered by epoch
        let epoch = self.clock.current_epoch();
        let backup = self.store.as_ref().map(|_| guard.clone());
        let result = match f(&mut *guard, &self.config, epoch) {
            Ok(result) => result,
            Err(err) => {
                debug!(op, epoch, code = err.code(), error = %err, "operation rejected");
                increment_counter!("ad_ledger_rejections_total", "op" => op, "code" => err.label());
                return Err(err);
            }
        };
        if let (Some(store), Some(backup)) = (self.store.as_ref(), backup) {
            if let Err(err) = store.persist(&guard) {
                *guard = backup;
                warn!(op, error = %err, "failed to persist ledger state; rolled back");
                let err = LedgerError::from(err);
                increment_counter!("ad_ledger_rejections_total", "op" => op, "code" => err.label());
                return Err(err);
            }
        }
        Ok(result)
    }

    fn read<R>(&self, f: impl FnOnce(&LedgerState) -> R) -> R {
        let guard = self.lock();
        f(&*guard)
    }

    fn read_at<R>(&self, f: impl FnOnce(&LedgerState, Epoch) -> R) -> R {
        let guard = self.lock();
        let epoch = self.clock.current_epoch();
        f(&*guard, epoch)
    }

    pub fn create_campaign(
        &self,
        owner: &str,
        params: CampaignParams,
    ) -> Result<CampaignCreated, LedgerError> {
        let (created, active) = self.transact("create_campaign", |state, _, epoch| {
            let created = state.create_campaign(owner, params, epoch)?;
            Ok((created, state.ledger.active_count(epoch)))
        })?;
        self.note_created(owner, std::slice::from_ref(&created), active);
        Ok(created)
    }

    pub fn bulk_create_campaigns(
        &self,
        owner: &str,
        items: Vec<CampaignParams>,
    ) -> Result<BatchOutcome<CampaignCreated>, LedgerError> {
        let (outcome, active) = self.transact("bulk_create_campaigns", |state, _, epoch| {
            let outcome = state.bulk_create_campaigns(owner, items, epoch)?;
            Ok((outcome, state.ledger.active_count(epoch)))
        })?;
        self.note_created(owner, &outcome.results, active);
        Ok(outcome)
    }

    pub fn record_view(
        &self,
        caller: &str,
        campaign_id: CampaignId,
        publisher_id: &str,
        view_proof: Option<Vec<u8>>,
    ) -> Result<ViewRecord, LedgerError> {
        let request = ViewRequest {
            campaign_id,
            publisher_id: publisher_id.to_string(),
            view_proof,
        };
        let record = self.transact("record_view", |state, config, epoch| {
            state.record_view(config, caller, request, epoch)
        })?;
        note_views(std::slice::from_ref(&record));
        Ok(record)
    }

    pub fn bulk_record_views(
        &self,
        caller: &str,
        items: Vec<ViewRequest>,
    ) -> Result<BatchOutcome<ViewRecord>, LedgerError> {
        let outcome = self.transact("bulk_record_views", |state, config, epoch| {
            state.bulk_record_views(config, caller, items, epoch)
        })?;
        note_views(&outcome.results);
        Ok(outcome)
    }

    pub fn verify_publisher(
        &self,
        caller: &str,
        publisher_id: &str,
        initial_score: u32,
    ) -> Result<PublisherVerified, LedgerError> {
        let verified = self.transact("verify_publisher", |state, config, epoch| {
            state.verify_publisher(config, caller, publisher_id, initial_score, epoch)
        })?;
        info!(
            publisher = %verified.publisher_id,
            score = verified.score,
            epoch = verified.verified_at_epoch,
            "publisher verified"
        );
        Ok(verified)
    }

    pub fn bulk_verify_publishers(
        &self,
        caller: &str,
        items: Vec<PublisherVerification>,
    ) -> Result<BatchOutcome<PublisherVerified>, LedgerError> {
        let outcome = self.transact("bulk_verify_publishers", |state, config, epoch| {
            state.bulk_verify_publishers(config, caller, items, epoch)
        })?;
        info!(publishers = outcome.total, "publishers verified");
        Ok(outcome)
    }

    pub fn register_campaign_type(&self, caller: &str, name: &str) -> Result<bool, LedgerError> {
        let added = self.transact("register_campaign_type", |state, config, _| {
            state.ledger.register_campaign_type(config, caller, name)
        })?;
        if added {
            info!(campaign_type = name.trim(), "campaign type registered");
        }
        Ok(added)
    }

    /// Writes time and budget transitions into stored statuses.
    pub fn sweep_statuses(&self) -> Result<Vec<CampaignId>, LedgerError> {
        let (transitioned, active) = self.transact("sweep_statuses", |state, _, epoch| {
            let transitioned = state.ledger.sweep_statuses(epoch);
            Ok((transitioned, state.ledger.active_count(epoch)))
        })?;
        if !transitioned.is_empty() {
            info!(count = transitioned.len(), "campaign statuses swept");
        }
        gauge!("ad_ledger_campaigns_active", active as f64);
        Ok(transitioned)
    }

    /// Drops counters for past epochs. Call once per epoch rollover; with a
    /// durable store every commit rewrites whatever is still held.
    pub fn prune_daily_counters(&self) -> Result<usize, LedgerError> {
        let pruned = self.transact("prune_daily_counters", |state, _, epoch| {
            Ok(state.meter.prune_before(epoch))
        })?;
        debug!(pruned, "stale daily view counters pruned");
        Ok(pruned)
    }

    /// Hands committed view records to settlement and fraud detection.
    /// Undrained records are carried in every persisted commit.
    pub fn drain_view_records(&self) -> Result<Vec<ViewRecord>, LedgerError> {
        self.transact("drain_view_records", |state, _, _| {
            Ok(state.meter.drain_records())
        })
    }

    pub fn get_campaign_metrics(
        &self,
        campaign_id: CampaignId,
    ) -> Result<CampaignMetrics, LedgerError> {
        self.read_at(|state, epoch| state.ledger.metrics(campaign_id, epoch))
    }

    pub fn campaign(&self, campaign_id: CampaignId) -> Option<Campaign> {
        self.read(|state| state.ledger.campaign(campaign_id).cloned())
    }

    pub fn campaign_ids(&self) -> Vec<CampaignId> {
        self.read(|state| state.ledger.campaigns().map(|c| c.id).collect())
    }

    pub fn campaign_types(&self) -> Vec<String> {
        self.read(|state| state.ledger.campaign_types().map(str::to_string).collect())
    }

    pub fn is_verified(&self, publisher_id: &str) -> bool {
        self.read(|state| state.registry.is_verified(publisher_id))
    }

    pub fn publisher(&self, publisher_id: &str) -> Option<Publisher> {
        self.read(|state| state.registry.publisher(publisher_id).cloned())
    }

    pub fn daily_view_count(&self, campaign_id: CampaignId, publisher_id: &str) -> u32 {
        self.read_at(|state, epoch| state.meter.daily_count(campaign_id, publisher_id, epoch))
    }

    pub fn pending_view_records(&self) -> usize {
        self.read(|state| state.meter.pending_records().len())
    }

    pub fn treasury_fees(&self) -> Balance {
        self.read(|state| state.ledger.fees_accrued())
    }

    pub fn snapshot(&self) -> LedgerState {
        self.read(LedgerState::clone)
    }

    fn note_created(&self, owner: &str, created: &[CampaignCreated], active: usize) {
        let fees: Balance = created.iter().map(|c| c.platform_fee).sum();
        for campaign in created {
            info!(
                campaign_id = campaign.campaign_id,
                owner,
                platform_fee = campaign.platform_fee,
                end_epoch = campaign.end_epoch,
                "campaign created"
            );
        }
        counter!("ad_ledger_campaigns_created_total", created.len() as u64);
        counter!("ad_ledger_platform_fees_total", fees);
        gauge!("ad_ledger_campaigns_active", active as f64);
    }
}

fn note_views(records: &[ViewRecord]) {
    let paid: Balance = records.iter().map(|r| r.amount_paid).sum();
    for record in records {
        debug!(
            campaign_id = record.campaign_id,
            publisher = %record.publisher_id,
            amount_paid = record.amount_paid,
            epoch = record.epoch,
            "view recorded"
        );
    }
    counter!("ad_ledger_views_recorded_total", records.len() as u64);
    counter!("ad_ledger_view_payout_total", paid);
}

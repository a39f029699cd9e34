use crate::batch::{
    BatchOutcome, BatchProcessor, MAX_CAMPAIGN_BATCH, MAX_PUBLISHER_BATCH, MAX_VIEW_BATCH,
};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::ledger::{CampaignCreated, CampaignLedger, CampaignParams};
use crate::meter::{ViewMeter, ViewRecord, ViewRequest};
use crate::registry::{PublisherRegistry, PublisherVerification, PublisherVerified};
use crate::Epoch;
use serde::{Deserialize, Serialize};

/// Everything the ledger mutates, cloned whole for batch working copies and
/// persisted whole by durable stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub registry: PublisherRegistry,
    pub ledger: CampaignLedger,
    pub meter: ViewMeter,
}

impl LedgerState {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            registry: PublisherRegistry::new(),
            ledger: CampaignLedger::new(config.campaign_types.iter().cloned()),
            meter: ViewMeter::new(),
        }
    }

    pub fn create_campaign(
        &mut self,
        owner: &str,
        params: CampaignParams,
        epoch: Epoch,
    ) -> Result<CampaignCreated, LedgerError> {
        self.ledger.create_campaign(owner, params, epoch)
    }

    pub fn bulk_create_campaigns(
        &mut self,
        owner: &str,
        items: Vec<CampaignParams>,
        epoch: Epoch,
    ) -> Result<BatchOutcome<CampaignCreated>, LedgerError> {
        BatchProcessor::new("bulk_create_campaigns", MAX_CAMPAIGN_BATCH).run(
            self,
            items,
            |state, params| state.create_campaign(owner, params, epoch),
        )
    }

    pub fn record_view(
        &mut self,
        config: &LedgerConfig,
        caller: &str,
        request: ViewRequest,
        epoch: Epoch,
    ) -> Result<ViewRecord, LedgerError> {
        self.meter.record_view(
            config,
            &mut self.ledger,
            &self.registry,
            caller,
            request,
            epoch,
        )
    }

    pub fn bulk_record_views(
        &mut self,
        config: &LedgerConfig,
        caller: &str,
        items: Vec<ViewRequest>,
        epoch: Epoch,
    ) -> Result<BatchOutcome<ViewRecord>, LedgerError> {
        BatchProcessor::new("bulk_record_views", MAX_VIEW_BATCH).run(
            self,
            items,
            |state, request| state.record_view(config, caller, request, epoch),
        )
    }

    pub fn verify_publisher(
        &mut self,
        config: &LedgerConfig,
        caller: &str,
        publisher_id: &str,
        score: u32,
        epoch: Epoch,
    ) -> Result<PublisherVerified, LedgerError> {
        self.registry
            .verify_publisher(config, caller, publisher_id, score, epoch)
    }

    pub fn bulk_verify_publishers(
        &mut self,
        config: &LedgerConfig,
        caller: &str,
        items: Vec<PublisherVerification>,
        epoch: Epoch,
    ) -> Result<BatchOutcome<PublisherVerified>, LedgerError> {
        BatchProcessor::new("bulk_verify_publishers", MAX_PUBLISHER_BATCH).run(
            self,
            items,
            |state, item| {
                state.verify_publisher(config, caller, &item.publisher_id, item.score, epoch)
            },
        )
    }
}

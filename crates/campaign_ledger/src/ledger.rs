use crate::config::LedgerConfig;
use crate::error::{invalid, LedgerError};
use crate::{AccountId, Balance, CampaignId, Epoch, BASIS_POINTS_DIVISOR};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_DAILY_VIEW_LIMIT: u32 = 100;
/// 2% of the declared budget, charged on top of it.
pub const PLATFORM_FEE_BPS: u16 = 200;

/// Platform fee charged on top of the declared budget.
pub fn platform_fee(budget: Balance, fee_bps: u16) -> Balance {
    (u128::from(budget) * u128::from(fee_bps) / u128::from(BASIS_POINTS_DIVISOR)) as Balance
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampaignStatus {
    Active,
    Exhausted,
    Expired,
}

impl CampaignStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CampaignStatus::Active => "active",
            CampaignStatus::Exhausted => "exhausted",
            CampaignStatus::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub owner: AccountId,
    pub campaign_type: String,
    pub total_budget: Balance,
    pub remaining_budget: Balance,
    pub cost_per_view: Balance,
    pub start_epoch: Epoch,
    pub end_epoch: Epoch,
    pub target_views: u64,
    pub daily_view_limit: u32,
    #[serde(default)]
    pub targeting_data: Option<String>,
    pub refundable: bool,
    pub status: CampaignStatus,
    pub views_recorded: u64,
}

impl Campaign {
    /// Stored status with the time and budget transitions applied.
    pub fn effective_status(&self, epoch: Epoch) -> CampaignStatus {
        match self.status {
            CampaignStatus::Active if epoch > self.end_epoch => CampaignStatus::Expired,
            CampaignStatus::Active if self.remaining_budget < self.cost_per_view => {
                CampaignStatus::Exhausted
            }
            status => status,
        }
    }

    pub fn accepts_views_at(&self, epoch: Epoch) -> bool {
        self.status == CampaignStatus::Active
            && epoch >= self.start_epoch
            && epoch <= self.end_epoch
    }

    pub fn spent(&self) -> Balance {
        self.total_budget.saturating_sub(self.remaining_budget)
    }

    pub(crate) fn debit_view(&mut self) -> Result<Balance, LedgerError> {
        if self.remaining_budget < self.cost_per_view {
            return Err(LedgerError::BudgetExhausted {
                campaign_id: self.id,
                remaining: self.remaining_budget,
                cost_per_view: self.cost_per_view,
            });
        }
        self.remaining_budget -= self.cost_per_view;
        self.views_recorded = self.views_recorded.saturating_add(1);
        Ok(self.cost_per_view)
    }
}

/// Advertiser-supplied terms for a new campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignParams {
    pub campaign_type: String,
    pub budget: Balance,
    pub cost_per_view: Balance,
    pub duration: Epoch,
    pub target_views: u64,
    pub daily_view_limit: u32,
    #[serde(default)]
    pub targeting_data: Option<String>,
    #[serde(default)]
    pub refundable: bool,
}

impl CampaignParams {
    /// Terms with `target_views` sized to the budget and the default daily cap.
    pub fn new(
        campaign_type: impl Into<String>,
        budget: Balance,
        cost_per_view: Balance,
        duration: Epoch,
    ) -> Self {
        Self {
            campaign_type: campaign_type.into(),
            budget,
            cost_per_view,
            duration,
            target_views: budget.checked_div(cost_per_view).unwrap_or(0),
            daily_view_limit: DEFAULT_DAILY_VIEW_LIMIT,
            targeting_data: None,
            refundable: false,
        }
    }

    pub fn with_target_views(mut self, target_views: u64) -> Self {
        self.target_views = target_views;
        self
    }

    pub fn with_daily_view_limit(mut self, limit: u32) -> Self {
        self.daily_view_limit = limit;
        self
    }

    pub fn with_targeting(mut self, data: impl Into<String>) -> Self {
        self.targeting_data = Some(data.into());
        self
    }

    pub fn refundable(mut self, refundable: bool) -> Self {
        self.refundable = refundable;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignCreated {
    pub campaign_id: CampaignId,
    pub platform_fee: Balance,
    pub start_epoch: Epoch,
    pub end_epoch: Epoch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignMetrics {
    pub campaign_id: CampaignId,
    pub owner: AccountId,
    pub campaign_type: String,
    pub status: CampaignStatus,
    pub total_budget: Balance,
    pub remaining_budget: Balance,
    pub spent: Balance,
    pub cost_per_view: Balance,
    pub views_recorded: u64,
    pub target_views: u64,
    pub daily_view_limit: u32,
    pub start_epoch: Epoch,
    pub end_epoch: Epoch,
    pub refundable: bool,
    pub observed_at_epoch: Epoch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignLedger {
    campaigns: BTreeMap<CampaignId, Campaign>,
    campaign_types: BTreeSet<String>,
    next_campaign_id: CampaignId,
    fees_accrued: Balance,
}

impl Default for CampaignLedger {
    fn default() -> Self {
        Self {
            campaigns: BTreeMap::new(),
            campaign_types: BTreeSet::new(),
            next_campaign_id: 1,
            fees_accrued: 0,
        }
    }
}

impl CampaignLedger {
    pub fn new<I, S>(campaign_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ledger = Self::default();
        ledger.extend_campaign_types(campaign_types);
        ledger
    }

    pub(crate) fn extend_campaign_types<I, S>(&mut self, campaign_types: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in campaign_types {
            let name = name.into().trim().to_string();
            if !name.is_empty() {
                self.campaign_types.insert(name);
            }
        }
    }

    /// Returns `true` when the type was not registered before.
    pub fn register_campaign_type(
        &mut self,
        config: &LedgerConfig,
        caller: &str,
        name: &str,
    ) -> Result<bool, LedgerError> {
        if !config.is_admin(caller) {
            return Err(LedgerError::NotAuthorized {
                caller: caller.to_string(),
                action: "register campaign types",
            });
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid("campaign type must not be empty"));
        }
        Ok(self.campaign_types.insert(name.to_string()))
    }

    pub fn has_campaign_type(&self, name: &str) -> bool {
        self.campaign_types.contains(name)
    }

    pub fn campaign_types(&self) -> impl Iterator<Item = &str> {
        self.campaign_types.iter().map(String::as_str)
    }

    pub fn validate(&self, params: &CampaignParams) -> Result<(), LedgerError> {
        if !self.has_campaign_type(&params.campaign_type) {
            return Err(invalid(format!(
                "unknown campaign type {:?}",
                params.campaign_type
            )));
        }
        if params.budget == 0 {
            return Err(invalid("budget must be positive"));
        }
        if params.cost_per_view == 0 || params.cost_per_view > params.budget {
            return Err(invalid(format!(
                "cost per view {} must be positive and at most the budget {}",
                params.cost_per_view, params.budget
            )));
        }
        if params.duration == 0 {
            return Err(invalid("duration must be positive"));
        }
        if params.target_views == 0 {
            return Err(invalid("target views must be positive"));
        }
        if params.daily_view_limit == 0 {
            return Err(invalid("daily view limit must be positive"));
        }
        Ok(())
    }

    pub fn create_campaign(
        &mut self,
        owner: &str,
        params: CampaignParams,
        epoch: Epoch,
    ) -> Result<CampaignCreated, LedgerError> {
        self.validate(&params)?;
        let end_epoch = epoch
            .checked_add(params.duration)
            .ok_or_else(|| invalid(format!("duration {} overflows epoch", params.duration)))?;
        let fee = platform_fee(params.budget, PLATFORM_FEE_BPS);
        let campaign_id = self.next_campaign_id;
        self.next_campaign_id = self.next_campaign_id.saturating_add(1);
        self.fees_accrued = self.fees_accrued.saturating_add(fee);
        self.campaigns.insert(
            campaign_id,
            Campaign {
                id: campaign_id,
                owner: owner.to_string(),
                campaign_type: params.campaign_type,
                total_budget: params.budget,
                remaining_budget: params.budget,
                cost_per_view: params.cost_per_view,
                start_epoch: epoch,
                end_epoch,
                target_views: params.target_views,
                daily_view_limit: params.daily_view_limit,
                targeting_data: params.targeting_data,
                refundable: params.refundable,
                status: CampaignStatus::Active,
                views_recorded: 0,
            },
        );
        Ok(CampaignCreated {
            campaign_id,
            platform_fee: fee,
            start_epoch: epoch,
            end_epoch,
        })
    }

    pub fn campaign(&self, campaign_id: CampaignId) -> Option<&Campaign> {
        self.campaigns.get(&campaign_id)
    }

    pub(crate) fn campaign_mut(&mut self, campaign_id: CampaignId) -> Option<&mut Campaign> {
        self.campaigns.get_mut(&campaign_id)
    }

    pub fn campaigns(&self) -> impl Iterator<Item = &Campaign> {
        self.campaigns.values()
    }

    pub fn metrics(
        &self,
        campaign_id: CampaignId,
        epoch: Epoch,
    ) -> Result<CampaignMetrics, LedgerError> {
        let campaign = self
            .campaign(campaign_id)
            .ok_or(LedgerError::NotFound(campaign_id))?;
        Ok(CampaignMetrics {
            campaign_id,
            owner: campaign.owner.clone(),
            campaign_type: campaign.campaign_type.clone(),
            status: campaign.effective_status(epoch),
            total_budget: campaign.total_budget,
            remaining_budget: campaign.remaining_budget,
            spent: campaign.spent(),
            cost_per_view: campaign.cost_per_view,
            views_recorded: campaign.views_recorded,
            target_views: campaign.target_views,
            daily_view_limit: campaign.daily_view_limit,
            start_epoch: campaign.start_epoch,
            end_epoch: campaign.end_epoch,
            refundable: campaign.refundable,
            observed_at_epoch: epoch,
        })
    }

    /// Persists effective statuses, returning the ids that transitioned.
    pub fn sweep_statuses(&mut self, epoch: Epoch) -> Vec<CampaignId> {
        let mut transitioned = Vec::new();
        for campaign in self.campaigns.values_mut() {
            let status = campaign.effective_status(epoch);
            if status != campaign.status {
                campaign.status = status;
                transitioned.push(campaign.id);
            }
        }
        transitioned
    }

    pub fn active_count(&self, epoch: Epoch) -> usize {
        self.campaigns
            .values()
            .filter(|c| c.effective_status(epoch) == CampaignStatus::Active)
            .count()
    }

    pub fn next_campaign_id(&self) -> CampaignId {
        self.next_campaign_id
    }

    /// Cumulative platform fees owed to the treasury.
    pub fn fees_accrued(&self) -> Balance {
        self.fees_accrued
    }
}

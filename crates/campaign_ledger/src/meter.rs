use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::ledger::CampaignLedger;
use crate::registry::PublisherRegistry;
use crate::{Balance, CampaignId, Epoch, PublisherId, BASIS_POINTS_DIVISOR};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct DailyKey {
    campaign_id: CampaignId,
    publisher_id: PublisherId,
    epoch: Epoch,
}

/// A single view submission as reported by the indexing operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRequest {
    pub campaign_id: CampaignId,
    pub publisher_id: PublisherId,
    /// Opaque evidence forwarded to fraud detection; never inspected here.
    #[serde(default)]
    pub view_proof: Option<Vec<u8>>,
}

impl ViewRequest {
    pub fn new(campaign_id: CampaignId, publisher_id: impl Into<PublisherId>) -> Self {
        Self {
            campaign_id,
            publisher_id: publisher_id.into(),
            view_proof: None,
        }
    }

    pub fn with_proof(mut self, proof: Vec<u8>) -> Self {
        self.view_proof = Some(proof);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRecord {
    pub campaign_id: CampaignId,
    pub publisher_id: PublisherId,
    pub amount_paid: Balance,
    /// Part of the debit kept by the platform when the publisher share is below 100%.
    pub platform_retained: Balance,
    pub epoch: Epoch,
    #[serde(default)]
    pub view_proof: Option<Vec<u8>>,
}

/// Daily counters and the outbox only shrink through [`ViewMeter::prune_before`]
/// and [`ViewMeter::drain_records`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewMeter {
    #[serde(with = "daily_counter_entries")]
    daily_counts: BTreeMap<DailyKey, u32>,
    outbox: Vec<ViewRecord>,
    total_paid: Balance,
}

impl ViewMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Meters one view. Checks run in a fixed order and nothing is mutated
    /// unless all of them pass.
    pub fn record_view(
        &mut self,
        config: &LedgerConfig,
        ledger: &mut CampaignLedger,
        registry: &PublisherRegistry,
        caller: &str,
        request: ViewRequest,
        epoch: Epoch,
    ) -> Result<ViewRecord, LedgerError> {
        if !config.may_record_views(caller) {
            return Err(LedgerError::NotAuthorized {
                caller: caller.to_string(),
                action: "record views",
            });
        }
        let ViewRequest {
            campaign_id,
            publisher_id,
            view_proof,
        } = request;
        let campaign = ledger
            .campaign_mut(campaign_id)
            .ok_or(LedgerError::NotFound(campaign_id))?;
        if !campaign.accepts_views_at(epoch) {
            return Err(LedgerError::CampaignInactive { campaign_id, epoch });
        }
        if !registry.is_verified(&publisher_id) {
            return Err(LedgerError::PublisherNotVerified(publisher_id));
        }
        let key = DailyKey {
            campaign_id,
            publisher_id,
            epoch,
        };
        let seen = self.daily_counts.get(&key).copied().unwrap_or(0);
        if seen >= campaign.daily_view_limit {
            return Err(LedgerError::ViewLimitReached {
                campaign_id,
                publisher_id: key.publisher_id,
                epoch,
                limit: campaign.daily_view_limit,
            });
        }
        let debited = campaign.debit_view()?;
        let amount_paid = publisher_cut(debited, config.publisher_share_bps);
        let record = ViewRecord {
            campaign_id,
            publisher_id: key.publisher_id.clone(),
            amount_paid,
            platform_retained: debited - amount_paid,
            epoch,
            view_proof,
        };
        self.daily_counts.insert(key, seen + 1);
        self.total_paid = self.total_paid.saturating_add(amount_paid);
        self.outbox.push(record.clone());
        Ok(record)
    }

    pub fn daily_count(&self, campaign_id: CampaignId, publisher_id: &str, epoch: Epoch) -> u32 {
        let key = DailyKey {
            campaign_id,
            publisher_id: publisher_id.to_string(),
            epoch,
        };
        self.daily_counts.get(&key).copied().unwrap_or(0)
    }

    /// Records awaiting pickup by settlement and fraud detection.
    pub fn pending_records(&self) -> &[ViewRecord] {
        &self.outbox
    }

    pub fn drain_records(&mut self) -> Vec<ViewRecord> {
        std::mem::take(&mut self.outbox)
    }

    pub fn total_paid(&self) -> Balance {
        self.total_paid
    }

    /// Drops counters for epochs before `epoch`; they can never be read again.
    pub fn prune_before(&mut self, epoch: Epoch) -> usize {
        let before = self.daily_counts.len();
        self.daily_counts.retain(|key, _| key.epoch >= epoch);
        before - self.daily_counts.len()
    }

    pub fn counter_len(&self) -> usize {
        self.daily_counts.len()
    }
}

fn publisher_cut(amount: Balance, share_bps: u16) -> Balance {
    if u64::from(share_bps) >= BASIS_POINTS_DIVISOR {
        return amount;
    }
    (u128::from(amount) * u128::from(share_bps) / u128::from(BASIS_POINTS_DIVISOR)) as Balance
}

mod daily_counter_entries {
    use super::DailyKey;
    use crate::{CampaignId, Epoch, PublisherId};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize)]
    struct Entry {
        campaign_id: CampaignId,
        publisher_id: PublisherId,
        epoch: Epoch,
        count: u32,
    }

    pub fn serialize<S>(counts: &BTreeMap<DailyKey, u32>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let entries: Vec<Entry> = counts
            .iter()
            .map(|(key, count)| Entry {
                campaign_id: key.campaign_id,
                publisher_id: key.publisher_id.clone(),
                epoch: key.epoch,
                count: *count,
            })
            .collect();
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<DailyKey, u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<Entry>::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|entry| {
                (
                    DailyKey {
                        campaign_id: entry.campaign_id,
                        publisher_id: entry.publisher_id,
                        epoch: entry.epoch,
                    },
                    entry.count,
                )
            })
            .collect())
    }
}

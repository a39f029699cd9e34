use crate::{AccountId, Balance, CampaignId, Epoch, PublisherId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("caller {caller} is not authorized to {action}")]
    NotAuthorized {
        caller: AccountId,
        action: &'static str,
    },
    #[error("unknown campaign {0}")]
    NotFound(CampaignId),
    #[error("publisher {publisher_id} reached the daily limit of {limit} views on campaign {campaign_id} for epoch {epoch}")]
    ViewLimitReached {
        campaign_id: CampaignId,
        publisher_id: PublisherId,
        epoch: Epoch,
        limit: u32,
    },
    #[error("publisher {0} is not verified")]
    PublisherNotVerified(PublisherId),
    #[error("campaign {campaign_id} is not active at epoch {epoch}")]
    CampaignInactive { campaign_id: CampaignId, epoch: Epoch },
    #[error("campaign {campaign_id} has {remaining} left, below cost per view {cost_per_view}")]
    BudgetExhausted {
        campaign_id: CampaignId,
        remaining: Balance,
        cost_per_view: Balance,
    },
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl LedgerError {
    /// Stable numeric code exposed to callers. 408 and 409 are local to this
    /// ledger; the rest match the status codes clients already handle.
    pub const fn code(&self) -> u16 {
        match self {
            LedgerError::InvalidParams(_) => 400,
            LedgerError::NotAuthorized { .. } => 401,
            LedgerError::NotFound(_) => 404,
            LedgerError::ViewLimitReached { .. } => 406,
            LedgerError::PublisherNotVerified(_) => 407,
            LedgerError::CampaignInactive { .. } => 408,
            LedgerError::BudgetExhausted { .. } => 409,
            LedgerError::Persistence(_) => 500,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LedgerError::InvalidParams(_) => "invalid_params",
            LedgerError::NotAuthorized { .. } => "not_authorized",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::ViewLimitReached { .. } => "view_limit_reached",
            LedgerError::PublisherNotVerified(_) => "publisher_not_verified",
            LedgerError::CampaignInactive { .. } => "campaign_inactive",
            LedgerError::BudgetExhausted { .. } => "budget_exhausted",
            LedgerError::Persistence(_) => "persistence",
        }
    }
}

pub(crate) fn invalid<T: Into<String>>(msg: T) -> LedgerError {
    LedgerError::InvalidParams(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let errors = [
            invalid("x"),
            LedgerError::NotAuthorized {
                caller: "mallory".into(),
                action: "verify publishers",
            },
            LedgerError::NotFound(7),
            LedgerError::ViewLimitReached {
                campaign_id: 1,
                publisher_id: "p".into(),
                epoch: 0,
                limit: 1,
            },
            LedgerError::PublisherNotVerified("p".into()),
            LedgerError::CampaignInactive {
                campaign_id: 1,
                epoch: 3,
            },
            LedgerError::BudgetExhausted {
                campaign_id: 1,
                remaining: 5,
                cost_per_view: 10,
            },
            LedgerError::Persistence("disk".into()),
        ];
        let mut codes: Vec<u16> = errors.iter().map(LedgerError::code).collect();
        assert_eq!(codes, vec![400, 401, 404, 406, 407, 408, 409, 500]);
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn messages_carry_context() {
        let err = LedgerError::BudgetExhausted {
            campaign_id: 4,
            remaining: 5,
            cost_per_view: 10,
        };
        assert_eq!(
            err.to_string(),
            "campaign 4 has 5 left, below cost per view 10"
        );
        assert_eq!(err.label(), "budget_exhausted");
    }
}

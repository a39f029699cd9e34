use crate::config::LedgerConfig;
use crate::error::{invalid, LedgerError};
use crate::{Epoch, PublisherId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reputation scores live in `0..=MAX_REPUTATION_SCORE`.
pub const MAX_REPUTATION_SCORE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publisher {
    pub id: PublisherId,
    pub verified: bool,
    pub reputation_score: u32,
    pub verified_at_epoch: Epoch,
}

/// One entry of a bulk verification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherVerification {
    pub publisher_id: PublisherId,
    pub score: u32,
}

impl PublisherVerification {
    pub fn new(publisher_id: impl Into<PublisherId>, score: u32) -> Self {
        Self {
            publisher_id: publisher_id.into(),
            score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherVerified {
    pub publisher_id: PublisherId,
    pub score: u32,
    pub verified_at_epoch: Epoch,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherRegistry {
    publishers: BTreeMap<PublisherId, Publisher>,
}

impl PublisherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `publisher_id` verified with `initial_score`. Re-verifying
    /// overwrites the previous score and verification epoch.
    pub fn verify_publisher(
        &mut self,
        config: &LedgerConfig,
        caller: &str,
        publisher_id: &str,
        initial_score: u32,
        epoch: Epoch,
    ) -> Result<PublisherVerified, LedgerError> {
        if !config.is_admin(caller) {
            return Err(LedgerError::NotAuthorized {
                caller: caller.to_string(),
                action: "verify publishers",
            });
        }
        if initial_score > MAX_REPUTATION_SCORE {
            return Err(invalid(format!(
                "score {initial_score} for {publisher_id} outside 0..={MAX_REPUTATION_SCORE}"
            )));
        }
        if publisher_id.trim().is_empty() {
            return Err(invalid("publisher id must not be empty"));
        }
        let publisher = Publisher {
            id: publisher_id.to_string(),
            verified: true,
            reputation_score: initial_score,
            verified_at_epoch: epoch,
        };
        self.publishers.insert(publisher.id.clone(), publisher);
        Ok(PublisherVerified {
            publisher_id: publisher_id.to_string(),
            score: initial_score,
            verified_at_epoch: epoch,
        })
    }

    pub fn is_verified(&self, publisher_id: &str) -> bool {
        self.publishers
            .get(publisher_id)
            .map(|p| p.verified)
            .unwrap_or(false)
    }

    pub fn publisher(&self, publisher_id: &str) -> Option<&Publisher> {
        self.publishers.get(publisher_id)
    }

    pub fn publishers(&self) -> impl Iterator<Item = &Publisher> {
        self.publishers.values()
    }

    pub fn verified_count(&self) -> usize {
        self.publishers.values().filter(|p| p.verified).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_verifies_and_reverification_overwrites() {
        let cfg = LedgerConfig::default();
        let mut registry = PublisherRegistry::new();
        let verified = registry
            .verify_publisher(&cfg, "admin", "pub-1", 80, 3)
            .expect("admin may verify");
        assert_eq!(verified.score, 80);
        assert_eq!(verified.verified_at_epoch, 3);
        assert!(registry.is_verified("pub-1"));

        registry
            .verify_publisher(&cfg, "admin", "pub-1", 55, 9)
            .expect("re-verification succeeds");
        let publisher = registry.publisher("pub-1").expect("publisher stored");
        assert_eq!(publisher.reputation_score, 55);
        assert_eq!(publisher.verified_at_epoch, 9);
        assert_eq!(registry.verified_count(), 1);
    }

    #[test]
    fn non_admin_is_rejected_before_score_check() {
        let cfg = LedgerConfig::default();
        let mut registry = PublisherRegistry::new();
        let err = registry
            .verify_publisher(&cfg, "mallory", "pub-1", 500, 0)
            .unwrap_err();
        assert_eq!(err.code(), 401);
        assert!(!registry.is_verified("pub-1"));
    }

    #[test]
    fn score_bounds_are_inclusive() {
        let cfg = LedgerConfig::default();
        let mut registry = PublisherRegistry::new();
        registry
            .verify_publisher(&cfg, "admin", "low", 0, 0)
            .expect("zero allowed");
        registry
            .verify_publisher(&cfg, "admin", "high", 100, 0)
            .expect("hundred allowed");
        let err = registry
            .verify_publisher(&cfg, "admin", "over", 101, 0)
            .unwrap_err();
        assert_eq!(err.code(), 400);
        assert!(registry.publisher("over").is_none());
    }

    #[test]
    fn unknown_publisher_is_not_verified() {
        let registry = PublisherRegistry::new();
        assert!(!registry.is_verified("ghost"));
        assert_eq!(registry.publishers().count(), 0);
    }
}

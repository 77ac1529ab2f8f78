use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use super::features::FeatureVector;
use super::normalizer::ResponseNormalizer;
use super::policy::ResolutionPolicy;
use super::rules::RuleBasedScorer;
use crate::domain::profile::UserProfile;
use crate::domain::recommendation::{ClassifierMode, RankedOffer};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("classifier is disabled")]
    Disabled,
    #[error("classifier request failed: {0}")]
    Transport(String),
    #[error("classifier returned status {0}")]
    Status(u16),
    #[error("classifier reply could not be decoded: {0}")]
    Decode(String),
    #[error("classifier did not answer within {0} ms")]
    Timeout(u64),
}

/// Transport to the external offer classifier.
#[async_trait]
pub trait ClassifierClient: Send + Sync {
    /// Posts the feature vector and returns the raw JSON reply.
    async fn fetch(&self, features: &FeatureVector) -> Result<Value, ClassifierError>;

    /// Cheap reachability check used by health endpoints.
    async fn probe(&self) -> Result<(), ClassifierError>;
}

/// Client used when the classifier is switched off; the engine serves from the rule table.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledClassifier;

#[async_trait]
impl ClassifierClient for DisabledClassifier {
    async fn fetch(&self, _features: &FeatureVector) -> Result<Value, ClassifierError> {
        Err(ClassifierError::Disabled)
    }

    async fn probe(&self) -> Result<(), ClassifierError> {
        Err(ClassifierError::Disabled)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedOffers {
    pub offers: Vec<RankedOffer>,
    pub mode: ClassifierMode,
    pub features: FeatureVector,
}

pub struct ClassifierGateway {
    client: Arc<dyn ClassifierClient>,
    normalizer: ResponseNormalizer,
    rules: RuleBasedScorer,
    timeout: Duration,
}

impl ClassifierGateway {
    pub fn new(
        client: Arc<dyn ClassifierClient>,
        policy: &ResolutionPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            normalizer: ResponseNormalizer::new(policy.clone()),
            rules: RuleBasedScorer::new(policy),
            timeout,
        }
    }

    /// Calls the classifier once; any failure or an empty normalized list
    /// switches to the rule table.
    pub async fn score(&self, profile: &UserProfile, correlation_id: &str) -> ClassifiedOffers {
        let features = FeatureVector::from_profile(profile);

        match self.call(&features).await {
            Ok(raw) => {
                let offers = self.normalizer.normalize(&raw);
                if !offers.is_empty() {
                    info!(
                        event_name = "resolution.classifier.scored",
                        correlation_id = %correlation_id,
                        offer_count = offers.len(),
                        "classifier returned ranked offers"
                    );
                    return ClassifiedOffers { offers, mode: ClassifierMode::Model, features };
                }
                warn!(
                    event_name = "resolution.classifier.degraded",
                    correlation_id = %correlation_id,
                    reason = "empty_reply",
                    "classifier reply normalized to no offers; using rule table"
                );
            }
            Err(error) => {
                warn!(
                    event_name = "resolution.classifier.degraded",
                    correlation_id = %correlation_id,
                    reason = %error,
                    "classifier unavailable; using rule table"
                );
            }
        }

        let offers = self.rules.score(profile, &features);
        ClassifiedOffers { offers, mode: ClassifierMode::Rules, features }
    }

    pub async fn probe(&self) -> Result<(), ClassifierError> {
        match tokio::time::timeout(self.timeout, self.client.probe()).await {
            Ok(result) => result,
            Err(_) => Err(ClassifierError::Timeout(duration_ms(self.timeout))),
        }
    }

    async fn call(&self, features: &FeatureVector) -> Result<Value, ClassifierError> {
        match tokio::time::timeout(self.timeout, self.client.fetch(features)).await {
            Ok(result) => result,
            Err(_) => Err(ClassifierError::Timeout(duration_ms(self.timeout))),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

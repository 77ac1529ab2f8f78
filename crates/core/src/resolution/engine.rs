//! Recommendation pipeline: classify, resolve each ranked offer, fill the shortfall.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::budget::BudgetFilter;
use super::fallback::FallbackFiller;
use super::gateway::{ClassifierClient, ClassifierError, ClassifierGateway};
use super::policy::ResolutionPolicy;
use super::ports::{CatalogStore, HistoryStore};
use super::resolver::CandidateResolver;
use super::selector::DeterministicSelector;
use super::{MAX_RECOMMENDATIONS, MODEL_VERSION};
use crate::domain::catalog::CatalogItemId;
use crate::domain::profile::{AlgorithmHint, UserProfile};
use crate::domain::recommendation::{
    OfferSource, Provenance, RecommendationEntry, RecommendationMetadata, RecommendationRecord,
    RecommendationResult, ScoreDistribution,
};
use crate::errors::{ApplicationError, DomainError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionStage {
    Init,
    Classify,
    ResolveLoop,
    Fallback,
    Done,
}

impl ResolutionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStage::Init => "init",
            ResolutionStage::Classify => "classify",
            ResolutionStage::ResolveLoop => "resolve_loop",
            ResolutionStage::Fallback => "fallback",
            ResolutionStage::Done => "done",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecommendationRequest {
    pub user_id: Option<String>,
    pub profile: UserProfile,
    pub limit: usize,
    pub algorithm: AlgorithmHint,
    pub correlation_id: String,
}

impl RecommendationRequest {
    pub fn new(profile: UserProfile, limit: usize) -> Self {
        Self {
            user_id: None,
            profile,
            limit,
            algorithm: AlgorithmHint::default(),
            correlation_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_algorithm(mut self, algorithm: AlgorithmHint) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }
}

pub struct RecommendationEngine {
    catalog: Arc<dyn CatalogStore>,
    history: Arc<dyn HistoryStore>,
    gateway: ClassifierGateway,
    budget: BudgetFilter,
    selector: DeterministicSelector,
    fallback: FallbackFiller,
}

impl RecommendationEngine {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        history: Arc<dyn HistoryStore>,
        classifier: Arc<dyn ClassifierClient>,
        policy: ResolutionPolicy,
        classifier_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            history,
            gateway: ClassifierGateway::new(classifier, &policy, classifier_timeout),
            budget: BudgetFilter::new(policy.budget_ranges),
            selector: DeterministicSelector,
            fallback: FallbackFiller::new(policy),
        }
    }

    pub async fn recommend(
        &self,
        request: RecommendationRequest,
    ) -> Result<RecommendationResult, ApplicationError> {
        let started = Instant::now();
        let RecommendationRequest { user_id, profile, limit, algorithm, correlation_id } = request;
        let cid = correlation_id.as_str();

        if !(1..=MAX_RECOMMENDATIONS).contains(&limit) {
            return Err(DomainError::InvariantViolation(format!(
                "limit must be between 1 and {MAX_RECOMMENDATIONS}, got {limit}"
            ))
            .into());
        }

        transition(cid, ResolutionStage::Init);
        let catalog = self.catalog.list_active_items().await?;

        transition(cid, ResolutionStage::Classify);
        let classified = self.gateway.score(&profile, cid).await;

        transition(cid, ResolutionStage::ResolveLoop);
        let resolver = CandidateResolver::new(&catalog);
        let mut used: HashSet<CatalogItemId> = HashSet::new();
        let mut entries: Vec<RecommendationEntry> = Vec::with_capacity(limit);

        let mut offers = classified.offers.iter().collect::<Vec<_>>();
        offers.sort_by_key(|offer| offer.rank);
        for offer in offers {
            if entries.len() >= limit {
                break;
            }
            let candidates = resolver.resolve(offer.label, &used);
            if candidates.is_empty() {
                debug!(
                    event_name = "resolution.offer.skipped",
                    correlation_id = %cid,
                    offer_label = %offer.label,
                    "no catalog candidates for offer"
                );
                continue;
            }
            let candidates = self.budget.filter(candidates, profile.budget);
            let Some(item) = self.selector.select_one(&candidates, profile.budget) else {
                continue;
            };

            used.insert(item.id.clone());
            entries.push(RecommendationEntry {
                catalog_item_id: item.id.clone(),
                score: offer.score,
                reason: offer.explanation.clone(),
                provenance: match offer.source {
                    OfferSource::Classifier => Provenance::Primary,
                    OfferSource::RuleTable => Provenance::Fallback,
                },
                source_label: offer.label,
            });
            debug!(
                event_name = "resolution.offer.resolved",
                correlation_id = %cid,
                offer_label = %offer.label,
                catalog_item_id = %item.id,
                score = offer.score,
                "resolved offer to catalog item"
            );
        }

        let resolved_count = entries.len();
        let mut filled_count = 0;
        if resolved_count < limit {
            transition(cid, ResolutionStage::Fallback);
            let shortfall = limit - resolved_count;
            let filled = self.fallback.fill(&entries, &catalog, &profile, shortfall);
            filled_count = filled.len();
            info!(
                event_name = "resolution.fallback.applied",
                correlation_id = %cid,
                shortfall,
                filled = filled_count,
                "filled recommendation shortfall"
            );
            entries.extend(filled);
        }

        transition(cid, ResolutionStage::Done);
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let generated_at = Utc::now();
        let score_distribution = ScoreDistribution::from_entries(&entries);
        let primary_count =
            entries.iter().filter(|entry| entry.provenance == Provenance::Primary).count();

        let metadata = RecommendationMetadata {
            algorithm,
            elapsed_ms,
            generated_at,
            total_recommendations: entries.len(),
            ranked_offer_count: classified.offers.len(),
            primary_count,
            fallback_count: entries.len() - primary_count,
            fallback_used: filled_count > 0,
            classifier_mode: classified.mode,
            score_distribution,
            used_features: classified.features.used_features(),
        };

        info!(
            event_name = "resolution.completed",
            correlation_id = %cid,
            total = entries.len(),
            very_high = score_distribution.very_high,
            high = score_distribution.high,
            medium = score_distribution.medium,
            low = score_distribution.low,
            elapsed_ms,
            "recommendation resolved"
        );

        let recommendation_id = Uuid::new_v4().to_string();
        let record = RecommendationRecord {
            id: recommendation_id.clone(),
            user_id,
            entries: entries.clone(),
            algorithm,
            elapsed_ms,
            model_version: MODEL_VERSION.to_string(),
            created_at: generated_at,
        };
        if let Err(error) = self.history.record(&record).await {
            warn!(
                event_name = "resolution.history.persist_failed",
                correlation_id = %cid,
                recommendation_id = %recommendation_id,
                error = %error,
                "failed to persist recommendation history"
            );
        }

        Ok(RecommendationResult { recommendation_id, entries, metadata })
    }

    pub async fn probe_classifier(&self) -> Result<(), ClassifierError> {
        self.gateway.probe().await
    }
}

fn transition(correlation_id: &str, stage: ResolutionStage) {
    debug!(
        event_name = "resolution.stage",
        correlation_id = %correlation_id,
        stage = stage.as_str(),
        "resolution stage entered"
    );
}

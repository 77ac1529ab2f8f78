//! Offer resolution engine
//!
//! Turns the classifier's ranked offer labels into a deduplicated,
//! budget-aware list of concrete catalog items, filling any shortfall with
//! relevance-scored fallback items.

mod budget;
mod engine;
mod fallback;
mod features;
mod gateway;
mod normalizer;
mod policy;
mod ports;
mod resolver;
mod rules;
mod selector;

pub use budget::BudgetFilter;
pub use engine::{RecommendationEngine, RecommendationRequest, ResolutionStage};
pub use fallback::FallbackFiller;
pub use features::{FeatureVector, PlanType};
pub use gateway::{
    ClassifiedOffers, ClassifierClient, ClassifierError, ClassifierGateway, DisabledClassifier,
};
pub use normalizer::{ClassifierReply, ResponseNormalizer};
pub use policy::{BudgetRanges, PriceRange, RelevanceWeights, ResolutionPolicy};
pub use ports::{CatalogStore, HistoryStore};
pub use resolver::CandidateResolver;
pub use rules::RuleBasedScorer;
pub use selector::DeterministicSelector;

/// Version tag recorded with every persisted recommendation.
pub const MODEL_VERSION: &str = "v1.0";

/// Largest number of entries a single request may ask for.
pub const MAX_RECOMMENDATIONS: usize = 20;

/// Entries returned when the caller does not specify a limit.
pub const DEFAULT_RECOMMENDATIONS: usize = 5;

pub const DEFAULT_POLICY: ResolutionPolicy = ResolutionPolicy {
    rank_decay: 0.97,
    score_floor: 0.35,
    default_confidence: 0.5,
    secondary_score_factor: 0.85,
    agreement_boost: 1.1,
    rule_confidence_cap: 0.79,
    max_rule_offers: 8,
    budget_ranges: BudgetRanges {
        low: PriceRange::bounded(0, 100_000),
        medium: PriceRange::bounded(30_000, 200_000),
        high: PriceRange::at_least(80_000),
    },
    fallback_band_high: 0.70,
    fallback_band_low: 0.55,
    fallback_separation: 0.01,
    fallback_budget_threshold: 3,
    relevance_weights: RelevanceWeights {
        category_match: 3.0,
        popularity: 2.0,
        budget_match: 2.0,
        low_price: 1.0,
    },
    low_price_threshold: 50_000,
};

pub mod config;
pub mod domain;
pub mod errors;
pub mod resolution;

pub use domain::catalog::{CatalogItem, CatalogItemId, Category, OfferLabel};
pub use domain::history::{
    rating_to_accuracy, AlgorithmStats, HistoryPage, Interaction, InteractionAction,
    RecommendationHistory, RecommendationStats,
};
pub use domain::profile::{AlgorithmHint, BudgetTier, UsageSignals, UsageType, UserProfile};
pub use domain::recommendation::{
    ClassifierMode, OfferSource, Provenance, RankedOffer, RecommendationEntry,
    RecommendationMetadata, RecommendationRecord, RecommendationResult, ScoreDistribution,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use resolution::{
    CatalogStore, ClassifierClient, ClassifierError, HistoryStore, RecommendationEngine,
    RecommendationRequest, ResolutionPolicy,
};

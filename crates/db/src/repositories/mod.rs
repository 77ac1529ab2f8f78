use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use offerwise_core::domain::catalog::{CatalogItem, CatalogItemId};
use offerwise_core::domain::history::{
    HistoryPage, Interaction, RecommendationHistory, RecommendationStats,
};
use offerwise_core::domain::recommendation::RecommendationRecord;
use offerwise_core::errors::{ApplicationError, DomainError};

pub mod catalog;
pub mod history;
pub mod memory;

pub use catalog::SqlCatalogRepository;
pub use history::SqlRecommendationHistoryRepository;
pub use memory::{InMemoryCatalogRepository, InMemoryHistoryRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Domain(domain) => ApplicationError::Domain(domain),
            other => ApplicationError::Persistence(other.to_string()),
        }
    }
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn upsert(&self, item: CatalogItem) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &CatalogItemId) -> Result<Option<CatalogItem>, RepositoryError>;
    /// Active items ordered by id.
    async fn list_active(&self) -> Result<Vec<CatalogItem>, RepositoryError>;
    /// Returns `false` when no item has this id.
    async fn increment_purchase_count(&self, id: &CatalogItemId) -> Result<bool, RepositoryError>;
    async fn count(&self) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn save(&self, record: &RecommendationRecord) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<RecommendationHistory>, RepositoryError>;

    /// Newest first. `page` is 1-based.
    async fn list_for_user(
        &self,
        user_id: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<HistoryPage, RepositoryError>;

    /// Appends an interaction; a purchase also bumps the item's purchase count.
    /// Returns `false` when the recommendation does not exist.
    async fn add_interaction(
        &self,
        recommendation_id: &str,
        interaction: Interaction,
    ) -> Result<bool, RepositoryError>;

    /// Stores a 1-5 rating as accuracy `rating / 5`.
    /// Returns `false` when the recommendation does not exist.
    async fn record_feedback(
        &self,
        recommendation_id: &str,
        rating: u8,
        comment: Option<String>,
    ) -> Result<bool, RepositoryError>;

    async fn stats_by_algorithm(&self) -> Result<RecommendationStats, RepositoryError>;
}

pub(crate) fn decode_err(error: impl ToString) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc)).map_err(decode_err)
}

pub(crate) fn page_offset(page: u32, limit: u32) -> u64 {
    u64::from(page.max(1) - 1) * u64::from(limit)
}

use async_trait::async_trait;

use crate::domain::catalog::CatalogItem;
use crate::domain::recommendation::RecommendationRecord;
use crate::errors::ApplicationError;

/// Read side of the product catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Snapshot of every active item, in a stable order.
    async fn list_active_items(&self) -> Result<Vec<CatalogItem>, ApplicationError>;
}

/// Write side of recommendation history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn record(&self, record: &RecommendationRecord) -> Result<(), ApplicationError>;
}

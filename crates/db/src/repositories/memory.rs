use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use offerwise_core::domain::catalog::{CatalogItem, CatalogItemId};
use offerwise_core::domain::history::{
    rating_to_accuracy, AlgorithmStats, HistoryPage, Interaction, InteractionAction,
    RecommendationHistory, RecommendationStats,
};
use offerwise_core::domain::recommendation::RecommendationRecord;
use offerwise_core::errors::ApplicationError;
use offerwise_core::resolution::{CatalogStore, HistoryStore};

use super::{page_offset, CatalogRepository, HistoryRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryCatalogRepository {
    items: RwLock<HashMap<String, CatalogItem>>,
}

impl InMemoryCatalogRepository {
    pub fn with_items(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        let items = items.into_iter().map(|item| (item.id.0.clone(), item)).collect();
        Self { items: RwLock::new(items) }
    }
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn upsert(&self, item: CatalogItem) -> Result<(), RepositoryError> {
        let mut items = self.items.write().await;
        items.insert(item.id.0.clone(), item);
        Ok(())
    }

    async fn find_by_id(&self, id: &CatalogItemId) -> Result<Option<CatalogItem>, RepositoryError> {
        let items = self.items.read().await;
        Ok(items.get(&id.0).cloned())
    }

    async fn list_active(&self) -> Result<Vec<CatalogItem>, RepositoryError> {
        let items = self.items.read().await;
        let mut active = items.values().filter(|item| item.is_active).cloned().collect::<Vec<_>>();
        active.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(active)
    }

    async fn increment_purchase_count(&self, id: &CatalogItemId) -> Result<bool, RepositoryError> {
        let mut items = self.items.write().await;
        match items.get_mut(&id.0) {
            Some(item) => {
                item.purchase_count = item.purchase_count.saturating_add(1);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.items.read().await.len() as u64)
    }
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryCatalogRepository {
    async fn list_active_items(&self) -> Result<Vec<CatalogItem>, ApplicationError> {
        Ok(self.list_active().await?)
    }
}

#[derive(Default)]
pub struct InMemoryHistoryRepository {
    records: RwLock<HashMap<String, RecommendationHistory>>,
    catalog: Option<Arc<InMemoryCatalogRepository>>,
}

impl InMemoryHistoryRepository {
    /// Purchases recorded through this repository bump popularity in `catalog`.
    pub fn with_catalog(catalog: Arc<InMemoryCatalogRepository>) -> Self {
        Self { records: RwLock::default(), catalog: Some(catalog) }
    }
}

#[async_trait::async_trait]
impl HistoryRepository for InMemoryHistoryRepository {
    async fn save(&self, record: &RecommendationRecord) -> Result<(), RepositoryError> {
        let history = RecommendationHistory {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
            algorithm: record.algorithm.as_str().to_string(),
            model_version: record.model_version.clone(),
            elapsed_ms: record.elapsed_ms,
            accuracy: None,
            created_at: record.created_at,
            entries: record.entries.clone(),
            interactions: Vec::new(),
        };
        self.records.write().await.insert(history.id.clone(), history);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<RecommendationHistory>, RepositoryError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list_for_user(
        &self,
        user_id: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<HistoryPage, RepositoryError> {
        let records = self.records.read().await;
        let mut matching = records
            .values()
            .filter(|history| user_id.is_none() || history.user_id.as_deref() == user_id)
            .cloned()
            .collect::<Vec<_>>();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        let total = matching.len() as u64;
        let offset = usize::try_from(page_offset(page, limit)).unwrap_or(usize::MAX);
        let items = matching.into_iter().skip(offset).take(limit as usize).collect();
        Ok(HistoryPage::new(items, page.max(1), limit, total))
    }

    async fn add_interaction(
        &self,
        recommendation_id: &str,
        interaction: Interaction,
    ) -> Result<bool, RepositoryError> {
        let mut records = self.records.write().await;
        let Some(history) = records.get_mut(recommendation_id) else {
            return Ok(false);
        };

        if interaction.action == InteractionAction::Purchased {
            if let Some(catalog) = &self.catalog {
                catalog.increment_purchase_count(&interaction.catalog_item_id).await?;
            }
        }
        history.interactions.push(interaction);
        Ok(true)
    }

    async fn record_feedback(
        &self,
        recommendation_id: &str,
        rating: u8,
        _comment: Option<String>,
    ) -> Result<bool, RepositoryError> {
        let accuracy = rating_to_accuracy(rating)?;
        let mut records = self.records.write().await;
        match records.get_mut(recommendation_id) {
            Some(history) => {
                history.accuracy = Some(accuracy);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn stats_by_algorithm(&self) -> Result<RecommendationStats, RepositoryError> {
        let records = self.records.read().await;

        let mut grouped: HashMap<&str, Vec<&RecommendationHistory>> = HashMap::new();
        for history in records.values() {
            grouped.entry(history.algorithm.as_str()).or_default().push(history);
        }

        let mut by_algorithm = grouped
            .into_iter()
            .map(|(algorithm, group)| {
                let count = group.len();
                let elapsed = group.iter().map(|history| history.elapsed_ms as f64).sum::<f64>();
                let rated = group.iter().filter_map(|history| history.accuracy).collect::<Vec<_>>();
                AlgorithmStats {
                    algorithm: algorithm.to_string(),
                    count: count as u64,
                    avg_elapsed_ms: elapsed / count as f64,
                    avg_accuracy: (!rated.is_empty())
                        .then(|| rated.iter().sum::<f64>() / rated.len() as f64),
                }
            })
            .collect::<Vec<_>>();
        by_algorithm.sort_by(|a, b| a.algorithm.cmp(&b.algorithm));

        let total_users = records
            .values()
            .filter_map(|history| history.user_id.as_deref())
            .collect::<HashSet<_>>()
            .len();

        Ok(RecommendationStats {
            total_recommendations: records.len() as u64,
            total_users: total_users as u64,
            by_algorithm,
        })
    }
}

#[async_trait::async_trait]
impl HistoryStore for InMemoryHistoryRepository {
    async fn record(&self, record: &RecommendationRecord) -> Result<(), ApplicationError> {
        Ok(self.save(record).await?)
    }
}

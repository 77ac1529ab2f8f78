use chrono::Utc;
use sqlx::Row;

use offerwise_core::domain::catalog::{CatalogItemId, OfferLabel};
use offerwise_core::domain::history::{
    rating_to_accuracy, AlgorithmStats, HistoryPage, Interaction, InteractionAction,
    RecommendationHistory, RecommendationStats,
};
use offerwise_core::domain::recommendation::{
    Provenance, RecommendationEntry, RecommendationRecord,
};
use offerwise_core::errors::ApplicationError;
use offerwise_core::resolution::HistoryStore;

use super::{decode_err, page_offset, parse_timestamp, HistoryRepository, RepositoryError};
use crate::DbPool;

pub struct SqlRecommendationHistoryRepository {
    pool: DbPool,
}

impl SqlRecommendationHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_entries(
        &self,
        recommendation_id: &str,
    ) -> Result<Vec<RecommendationEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT catalog_item_id, score, reason, provenance, source_label
             FROM recommendation_entry WHERE recommendation_id = ? ORDER BY position",
        )
        .bind(recommendation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect::<Result<Vec<_>, _>>()
    }

    async fn load_interactions(
        &self,
        recommendation_id: &str,
    ) -> Result<Vec<Interaction>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT catalog_item_id, action, occurred_at
             FROM recommendation_interaction WHERE recommendation_id = ? ORDER BY id",
        )
        .bind(recommendation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_interaction).collect::<Result<Vec<_>, _>>()
    }

    async fn hydrate(
        &self,
        row: &sqlx::sqlite::SqliteRow,
    ) -> Result<RecommendationHistory, RepositoryError> {
        let mut history = row_to_history(row)?;
        history.entries = self.load_entries(&history.id).await?;
        history.interactions = self.load_interactions(&history.id).await?;
        Ok(history)
    }
}

fn parse_provenance(value: &str) -> Result<Provenance, RepositoryError> {
    match value {
        "primary" => Ok(Provenance::Primary),
        "fallback" => Ok(Provenance::Fallback),
        other => Err(RepositoryError::Decode(format!("unknown provenance `{other}`"))),
    }
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<RecommendationEntry, RepositoryError> {
    let catalog_item_id: String = row.try_get("catalog_item_id").map_err(decode_err)?;
    let score: f64 = row.try_get("score").map_err(decode_err)?;
    let reason: String = row.try_get("reason").map_err(decode_err)?;
    let provenance: String = row.try_get("provenance").map_err(decode_err)?;
    let source_label: String = row.try_get("source_label").map_err(decode_err)?;

    Ok(RecommendationEntry {
        catalog_item_id: CatalogItemId(catalog_item_id),
        score,
        reason,
        provenance: parse_provenance(&provenance)?,
        source_label: source_label.parse::<OfferLabel>()?,
    })
}

fn row_to_interaction(row: &sqlx::sqlite::SqliteRow) -> Result<Interaction, RepositoryError> {
    let catalog_item_id: String = row.try_get("catalog_item_id").map_err(decode_err)?;
    let action: String = row.try_get("action").map_err(decode_err)?;
    let occurred_at: String = row.try_get("occurred_at").map_err(decode_err)?;

    Ok(Interaction {
        catalog_item_id: CatalogItemId(catalog_item_id),
        action: action.parse::<InteractionAction>()?,
        occurred_at: parse_timestamp(&occurred_at)?,
    })
}

fn row_to_history(row: &sqlx::sqlite::SqliteRow) -> Result<RecommendationHistory, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let user_id: Option<String> = row.try_get("user_id").map_err(decode_err)?;
    let algorithm: String = row.try_get("algorithm").map_err(decode_err)?;
    let model_version: String = row.try_get("model_version").map_err(decode_err)?;
    let elapsed_ms: i64 = row.try_get("elapsed_ms").map_err(decode_err)?;
    let accuracy: Option<f64> = row.try_get("accuracy").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;

    Ok(RecommendationHistory {
        id,
        user_id,
        algorithm,
        model_version,
        elapsed_ms: u64::try_from(elapsed_ms).map_err(decode_err)?,
        accuracy,
        created_at: parse_timestamp(&created_at)?,
        entries: Vec::new(),
        interactions: Vec::new(),
    })
}

const HISTORY_COLUMNS: &str =
    "SELECT id, user_id, algorithm, model_version, elapsed_ms, accuracy, created_at FROM recommendation";

#[async_trait::async_trait]
impl HistoryRepository for SqlRecommendationHistoryRepository {
    async fn save(&self, record: &RecommendationRecord) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO recommendation (id, user_id, algorithm, model_version, elapsed_ms, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(record.algorithm.as_str())
        .bind(&record.model_version)
        .bind(i64::try_from(record.elapsed_ms).unwrap_or(i64::MAX))
        .bind(record.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for (position, entry) in record.entries.iter().enumerate() {
            sqlx::query(
                "INSERT INTO recommendation_entry (recommendation_id, position, catalog_item_id,
                                                   score, reason, provenance, source_label)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&record.id)
            .bind(i64::try_from(position).unwrap_or(i64::MAX))
            .bind(entry.catalog_item_id.as_str())
            .bind(entry.score)
            .bind(&entry.reason)
            .bind(entry.provenance.as_str())
            .bind(entry.source_label.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<RecommendationHistory>, RepositoryError> {
        let row = sqlx::query(&format!("{HISTORY_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(self.hydrate(r).await?)),
            None => Ok(None),
        }
    }

    async fn list_for_user(
        &self,
        user_id: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<HistoryPage, RepositoryError> {
        let offset = i64::try_from(page_offset(page, limit)).unwrap_or(i64::MAX);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM recommendation WHERE (?1 IS NULL OR user_id = ?1)",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            "{HISTORY_COLUMNS} WHERE (?1 IS NULL OR user_id = ?1)
             ORDER BY created_at DESC, id ASC LIMIT ?2 OFFSET ?3"
        ))
        .bind(user_id)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(self.hydrate(row).await?);
        }

        Ok(HistoryPage::new(items, page.max(1), limit, u64::try_from(total).map_err(decode_err)?))
    }

    async fn add_interaction(
        &self,
        recommendation_id: &str,
        interaction: Interaction,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM recommendation WHERE id = ?1)")
                .bind(recommendation_id)
                .fetch_one(&mut *tx)
                .await?;
        if exists == 0 {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO recommendation_interaction (recommendation_id, catalog_item_id, action, occurred_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(recommendation_id)
        .bind(interaction.catalog_item_id.as_str())
        .bind(interaction.action.as_str())
        .bind(interaction.occurred_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        if interaction.action == InteractionAction::Purchased {
            sqlx::query(
                "UPDATE catalog_item SET purchase_count = purchase_count + 1, updated_at = ?
                 WHERE id = ?",
            )
            .bind(Utc::now().to_rfc3339())
            .bind(interaction.catalog_item_id.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn record_feedback(
        &self,
        recommendation_id: &str,
        rating: u8,
        comment: Option<String>,
    ) -> Result<bool, RepositoryError> {
        let accuracy = rating_to_accuracy(rating)?;

        let result = sqlx::query(
            "UPDATE recommendation SET accuracy = ?, feedback_comment = ? WHERE id = ?",
        )
        .bind(accuracy)
        .bind(comment)
        .bind(recommendation_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn stats_by_algorithm(&self) -> Result<RecommendationStats, RepositoryError> {
        let (total, users): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(1), COUNT(DISTINCT user_id) FROM recommendation",
        )
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            "SELECT algorithm, COUNT(1) AS count, AVG(elapsed_ms) AS avg_elapsed_ms,
                    AVG(accuracy) AS avg_accuracy
             FROM recommendation GROUP BY algorithm ORDER BY algorithm",
        )
        .fetch_all(&self.pool)
        .await?;

        let by_algorithm = rows
            .iter()
            .map(|row| {
                let count: i64 = row.try_get("count").map_err(decode_err)?;
                Ok(AlgorithmStats {
                    algorithm: row.try_get("algorithm").map_err(decode_err)?,
                    count: u64::try_from(count).map_err(decode_err)?,
                    avg_elapsed_ms: row.try_get("avg_elapsed_ms").map_err(decode_err)?,
                    avg_accuracy: row.try_get("avg_accuracy").map_err(decode_err)?,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(RecommendationStats {
            total_recommendations: u64::try_from(total).map_err(decode_err)?,
            total_users: u64::try_from(users).map_err(decode_err)?,
            by_algorithm,
        })
    }
}

#[async_trait::async_trait]
impl HistoryStore for SqlRecommendationHistoryRepository {
    async fn record(&self, record: &RecommendationRecord) -> Result<(), ApplicationError> {
        Ok(self.save(record).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use offerwise_core::domain::catalog::{CatalogItem, CatalogItemId, Category, OfferLabel};
    use offerwise_core::domain::history::{Interaction, InteractionAction};
    use offerwise_core::domain::profile::AlgorithmHint;
    use offerwise_core::domain::recommendation::{
        Provenance, RecommendationEntry, RecommendationRecord,
    };
    use offerwise_core::resolution::HistoryStore;

    use super::SqlRecommendationHistoryRepository;
    use crate::repositories::{
        CatalogRepository, HistoryRepository, RepositoryError, SqlCatalogRepository,
    };
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> (DbPool, SqlRecommendationHistoryRepository) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        (pool.clone(), SqlRecommendationHistoryRepository::new(pool))
    }

    fn record(
        id: &str,
        user_id: Option<&str>,
        algorithm: AlgorithmHint,
        minute: i64,
    ) -> RecommendationRecord {
        RecommendationRecord {
            id: id.to_string(),
            user_id: user_id.map(str::to_string),
            entries: vec![
                RecommendationEntry {
                    catalog_item_id: CatalogItemId::new("data-25"),
                    score: 0.9,
                    reason: "Recommended based on your usage pattern (Top recommendation)"
                        .to_string(),
                    provenance: Provenance::Primary,
                    source_label: OfferLabel::DataBooster,
                },
                RecommendationEntry {
                    catalog_item_id: CatalogItemId::new("combo-hemat"),
                    score: 0.7,
                    reason: "Popular combo package for balanced usage".to_string(),
                    provenance: Provenance::Fallback,
                    source_label: OfferLabel::GeneralOffer,
                },
            ],
            algorithm,
            elapsed_ms: 40 + minute as u64,
            model_version: "v1.0".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).single().expect("timestamp")
                + Duration::minutes(minute),
        }
    }

    #[tokio::test]
    async fn saved_record_reads_back_with_entries_in_order() {
        let (_, repo) = setup().await;
        let saved = record("rec-1", Some("user-1"), AlgorithmHint::Hybrid, 0);
        repo.record(&saved).await.expect("record");

        let history = repo.find_by_id("rec-1").await.expect("find").expect("history exists");
        assert_eq!(history.user_id.as_deref(), Some("user-1"));
        assert_eq!(history.algorithm, "hybrid");
        assert_eq!(history.model_version, "v1.0");
        assert_eq!(history.entries, saved.entries);
        assert_eq!(history.created_at, saved.created_at);
        assert!(history.accuracy.is_none());
        assert!(repo.find_by_id("rec-missing").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn list_for_user_paginates_newest_first() {
        let (_, repo) = setup().await;
        for minute in 0..5 {
            let id = format!("rec-{minute}");
            repo.save(&record(&id, Some("user-1"), AlgorithmHint::Hybrid, minute))
                .await
                .expect("save");
        }
        repo.save(&record("rec-other", Some("user-2"), AlgorithmHint::Hybrid, 10))
            .await
            .expect("save");

        let first = repo.list_for_user(Some("user-1"), 1, 2).await.expect("page 1");
        assert_eq!(first.total, 5);
        assert_eq!(first.total_pages, 3);
        assert_eq!(
            first.items.iter().map(|item| item.id.as_str()).collect::<Vec<_>>(),
            vec!["rec-4", "rec-3"]
        );

        let last = repo.list_for_user(Some("user-1"), 3, 2).await.expect("page 3");
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].id, "rec-0");

        let everyone = repo.list_for_user(None, 1, 50).await.expect("all");
        assert_eq!(everyone.total, 6);
        assert_eq!(everyone.items[0].id, "rec-other");
    }

    #[tokio::test]
    async fn purchase_interaction_bumps_catalog_popularity() {
        let (pool, repo) = setup().await;
        let catalog = SqlCatalogRepository::new(pool);
        catalog
            .upsert(
                CatalogItem::new("data-25", "Data 25GB", Category::Data, 60_000)
                    .with_purchase_count(320),
            )
            .await
            .expect("upsert");
        repo.save(&record("rec-1", None, AlgorithmHint::Hybrid, 0)).await.expect("save");

        for action in [InteractionAction::Viewed, InteractionAction::Purchased] {
            let added = repo
                .add_interaction(
                    "rec-1",
                    Interaction {
                        catalog_item_id: CatalogItemId::new("data-25"),
                        action,
                        occurred_at: Utc::now(),
                    },
                )
                .await
                .expect("interaction");
            assert!(added);
        }

        let item = catalog
            .find_by_id(&CatalogItemId::new("data-25"))
            .await
            .expect("find")
            .expect("item exists");
        assert_eq!(item.purchase_count, 321);

        let history = repo.find_by_id("rec-1").await.expect("find").expect("history exists");
        assert_eq!(
            history.interactions.iter().map(|i| i.action).collect::<Vec<_>>(),
            vec![InteractionAction::Viewed, InteractionAction::Purchased]
        );
    }

    #[tokio::test]
    async fn interaction_on_unknown_recommendation_is_rejected() {
        let (_, repo) = setup().await;
        let added = repo
            .add_interaction(
                "rec-missing",
                Interaction {
                    catalog_item_id: CatalogItemId::new("data-25"),
                    action: InteractionAction::Clicked,
                    occurred_at: Utc::now(),
                },
            )
            .await
            .expect("interaction");
        assert!(!added);
    }

    #[tokio::test]
    async fn feedback_stores_accuracy_and_validates_rating() {
        let (_, repo) = setup().await;
        repo.save(&record("rec-1", None, AlgorithmHint::Hybrid, 0)).await.expect("save");

        assert!(repo
            .record_feedback("rec-1", 4, Some("spot on".to_string()))
            .await
            .expect("feedback"));
        assert!(!repo.record_feedback("rec-missing", 4, None).await.expect("feedback"));
        assert!(matches!(
            repo.record_feedback("rec-1", 9, None).await,
            Err(RepositoryError::Domain(_))
        ));

        let history = repo.find_by_id("rec-1").await.expect("find").expect("history exists");
        assert_eq!(history.accuracy, Some(0.8));
    }

    #[tokio::test]
    async fn stats_group_by_algorithm() {
        let (_, repo) = setup().await;
        repo.save(&record("rec-1", Some("u1"), AlgorithmHint::Hybrid, 0)).await.expect("save");
        repo.save(&record("rec-2", Some("u2"), AlgorithmHint::Hybrid, 20)).await.expect("save");
        repo.save(&record("rec-3", Some("u1"), AlgorithmHint::Collaborative, 0))
            .await
            .expect("save");
        repo.record_feedback("rec-1", 5, None).await.expect("feedback");

        let stats = repo.stats_by_algorithm().await.expect("stats");
        assert_eq!(stats.total_recommendations, 3);
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.by_algorithm.len(), 2);

        let collaborative = &stats.by_algorithm[0];
        assert_eq!(collaborative.algorithm, "collaborative");
        assert_eq!(collaborative.count, 1);
        assert!(collaborative.avg_accuracy.is_none());

        let hybrid = &stats.by_algorithm[1];
        assert_eq!(hybrid.algorithm, "hybrid");
        assert_eq!(hybrid.count, 2);
        assert!((hybrid.avg_elapsed_ms - 50.0).abs() < 1e-9);
        assert_eq!(hybrid.avg_accuracy, Some(1.0));
    }
}

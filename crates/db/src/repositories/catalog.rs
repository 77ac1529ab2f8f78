use chrono::Utc;
use sqlx::Row;

use offerwise_core::domain::catalog::{CatalogItem, CatalogItemId, Category, OfferLabel};
use offerwise_core::errors::ApplicationError;
use offerwise_core::resolution::CatalogStore;

use super::{decode_err, CatalogRepository, RepositoryError};
use crate::DbPool;

const SELECT_COLUMNS: &str =
    "SELECT id, name, category, price, target_offer, purchase_count, is_active FROM catalog_item";

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<CatalogItem, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let name: String = row.try_get("name").map_err(decode_err)?;
    let category: String = row.try_get("category").map_err(decode_err)?;
    let price: i64 = row.try_get("price").map_err(decode_err)?;
    let target_offer: Option<String> = row.try_get("target_offer").map_err(decode_err)?;
    let purchase_count: i64 = row.try_get("purchase_count").map_err(decode_err)?;
    let is_active: bool = row.try_get("is_active").map_err(decode_err)?;

    Ok(CatalogItem {
        id: CatalogItemId(id),
        name,
        category: category.parse::<Category>()?,
        price,
        target_offer: target_offer.as_deref().map(str::parse::<OfferLabel>).transpose()?,
        purchase_count: u32::try_from(purchase_count).map_err(decode_err)?,
        is_active,
    })
}

#[async_trait::async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn upsert(&self, item: CatalogItem) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO catalog_item (id, name, category, price, target_offer, purchase_count,
                                       is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 category = excluded.category,
                 price = excluded.price,
                 target_offer = excluded.target_offer,
                 purchase_count = excluded.purchase_count,
                 is_active = excluded.is_active,
                 updated_at = excluded.updated_at",
        )
        .bind(item.id.as_str())
        .bind(&item.name)
        .bind(item.category.as_str())
        .bind(item.price)
        .bind(item.target_offer.map(|label| label.as_str()))
        .bind(i64::from(item.purchase_count))
        .bind(item.is_active)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &CatalogItemId) -> Result<Option<CatalogItem>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_item(r)?)),
            None => Ok(None),
        }
    }

    async fn list_active(&self) -> Result<Vec<CatalogItem>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} WHERE is_active = 1 ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_item).collect::<Result<Vec<_>, _>>()
    }

    async fn increment_purchase_count(&self, id: &CatalogItemId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE catalog_item SET purchase_count = purchase_count + 1, updated_at = ?
             WHERE id = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM catalog_item").fetch_one(&self.pool).await?;
        u64::try_from(count).map_err(decode_err)
    }
}

#[async_trait::async_trait]
impl CatalogStore for SqlCatalogRepository {
    async fn list_active_items(&self) -> Result<Vec<CatalogItem>, ApplicationError> {
        Ok(self.list_active().await?)
    }
}

#[cfg(test)]
mod tests {
    use offerwise_core::domain::catalog::{CatalogItem, CatalogItemId, Category, OfferLabel};
    use offerwise_core::resolution::CatalogStore;

    use super::SqlCatalogRepository;
    use crate::repositories::{CatalogRepository, RepositoryError};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlCatalogRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlCatalogRepository::new(pool)
    }

    #[tokio::test]
    async fn upsert_and_find_round_trip() {
        let repo = setup().await;
        let item = CatalogItem::new("roam-asia", "Roaming Asia 7 Hari", Category::Roaming, 150_000)
            .with_target_offer(OfferLabel::RoamingPass)
            .with_purchase_count(12);

        repo.upsert(item.clone()).await.expect("upsert");

        let found = repo.find_by_id(&CatalogItemId::new("roam-asia")).await.expect("find");
        assert_eq!(found, Some(item));
        assert!(repo.find_by_id(&CatalogItemId::new("missing")).await.expect("find").is_none());
    }

    #[tokio::test]
    async fn upsert_updates_existing_rows() {
        let repo = setup().await;
        repo.upsert(CatalogItem::new("d1", "Data 10GB", Category::Data, 30_000))
            .await
            .expect("insert");
        repo.upsert(CatalogItem::new("d1", "Data 12GB", Category::Data, 32_000).inactive())
            .await
            .expect("update");

        let found = repo
            .find_by_id(&CatalogItemId::new("d1"))
            .await
            .expect("find")
            .expect("item should exist");
        assert_eq!(found.name, "Data 12GB");
        assert_eq!(found.price, 32_000);
        assert!(!found.is_active);
        assert_eq!(repo.count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn list_active_skips_inactive_items_and_orders_by_id() {
        let repo = setup().await;
        for item in [
            CatalogItem::new("v1", "Voice", Category::Voice, 20_000),
            CatalogItem::new("d1", "Data", Category::Data, 30_000),
            CatalogItem::new("x1", "Retired", Category::Combo, 10_000).inactive(),
        ] {
            repo.upsert(item).await.expect("upsert");
        }

        let ids = repo
            .list_active_items()
            .await
            .expect("list")
            .into_iter()
            .map(|item| item.id.0)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["d1".to_string(), "v1".to_string()]);
    }

    #[tokio::test]
    async fn increment_purchase_count_reports_missing_items() {
        let repo = setup().await;
        repo.upsert(CatalogItem::new("d1", "Data", Category::Data, 30_000).with_purchase_count(4))
            .await
            .expect("upsert");

        assert!(repo.increment_purchase_count(&CatalogItemId::new("d1")).await.expect("bump"));
        assert!(!repo.increment_purchase_count(&CatalogItemId::new("nope")).await.expect("bump"));

        let item = repo
            .find_by_id(&CatalogItemId::new("d1"))
            .await
            .expect("find")
            .expect("item should exist");
        assert_eq!(item.purchase_count, 5);
    }

    #[tokio::test]
    async fn unknown_stored_label_is_a_domain_error() {
        let repo = setup().await;
        sqlx::query(
            "INSERT INTO catalog_item (id, name, category, price, target_offer, created_at, updated_at)
             VALUES ('odd', 'Odd', 'data', 1000, 'Mystery Offer', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(&repo.pool)
        .await
        .expect("raw insert");

        let result = repo.find_by_id(&CatalogItemId::new("odd")).await;
        assert!(matches!(result, Err(RepositoryError::Domain(_))));
    }
}

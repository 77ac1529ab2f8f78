use offerwise_core::domain::catalog::{Category, OfferLabel};
use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Expected number of seeded items per category.
const SEED_CATEGORY_COUNTS: &[(Category, i64)] = &[
    (Category::Data, 10),
    (Category::Voice, 6),
    (Category::Sms, 4),
    (Category::Combo, 8),
    (Category::Streaming, 12),
    (Category::Roaming, 3),
    (Category::Device, 2),
    (Category::Retention, 2),
];

/// Seeded items that carry a classifier label.
const SEED_TARGETED_ITEMS: &[(&str, OfferLabel)] = &[
    ("data-50gb", OfferLabel::DataBooster),
    ("data-25gb", OfferLabel::DataBooster),
    ("data-turbo-100gb", OfferLabel::DataBooster),
    ("data-harian-2gb", OfferLabel::TopUpPromo),
    ("data-mingguan-7gb", OfferLabel::TopUpPromo),
    ("voice-harian-30-menit", OfferLabel::TopUpPromo),
    ("voice-unlimited", OfferLabel::VoiceBundle),
    ("voice-300-menit", OfferLabel::VoiceBundle),
    ("combo-keluarga", OfferLabel::FamilyPlanOffer),
    ("stream-netflix", OfferLabel::StreamingPartnerPack),
    ("stream-disney", OfferLabel::StreamingPartnerPack),
    ("stream-spotify", OfferLabel::StreamingPartnerPack),
    ("roam-asia-7d", OfferLabel::RoamingPass),
    ("roam-global-14d", OfferLabel::RoamingPass),
    ("device-cicilan-5g", OfferLabel::DeviceUpgradeOffer),
    ("retention-loyal-bonus", OfferLabel::RetentionOffer),
    ("retention-comeback", OfferLabel::RetentionOffer),
];

const SEED_ITEM_IDS: &[&str] = &[
    "data-unlimited",
    "data-50gb",
    "data-25gb",
    "data-10gb",
    "data-gaming-30gb",
    "data-harian-2gb",
    "data-mingguan-7gb",
    "data-malam-10gb",
    "data-sosmed-5gb",
    "data-turbo-100gb",
    "voice-unlimited",
    "voice-300-menit",
    "voice-100-menit",
    "voice-sesama-operator",
    "voice-harian-30-menit",
    "voice-internasional",
    "sms-unlimited",
    "sms-500",
    "sms-100",
    "sms-harian",
    "combo-hemat",
    "combo-lengkap",
    "combo-keluarga",
    "combo-student",
    "combo-bisnis",
    "combo-mini",
    "combo-harian",
    "combo-premium",
    "stream-netflix",
    "stream-disney",
    "stream-youtube",
    "stream-video-all",
    "stream-prime-video",
    "stream-hd",
    "stream-music",
    "stream-spotify",
    "stream-live",
    "stream-content-creator",
    "stream-video-conference",
    "stream-4k",
    "roam-asia-7d",
    "roam-global-14d",
    "roam-umrah-30d",
    "device-cicilan-5g",
    "device-modem-wifi",
    "retention-loyal-bonus",
    "retention-comeback",
];

/// Deterministic demo telco catalog.
///
/// Covers every category, with a subset of items targeting classifier
/// labels directly so both the target match and the category mapping paths
/// are exercised. Loading is idempotent.
pub struct CatalogSeedDataset;

impl CatalogSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/catalog_seed.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            items_seeded: SEED_ITEM_IDS.len(),
            categories: SEED_CATEGORY_COUNTS.iter().map(|(category, _)| *category).collect(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();
        let quoted_ids = sql_array_from_ids(SEED_ITEM_IDS);

        let present: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM catalog_item WHERE is_active = 1 AND id IN {quoted_ids}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("seed-items".to_string(), present == SEED_ITEM_IDS.len() as i64));

        for (category, expected) in SEED_CATEGORY_COUNTS {
            let count: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(1) FROM catalog_item WHERE category = ?1 AND id IN {quoted_ids}"
            ))
            .bind(category.as_str())
            .fetch_one(pool)
            .await?;
            checks.push((format!("category:{category}"), count == *expected));
        }

        for (id, label) in SEED_TARGETED_ITEMS {
            let matches: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM catalog_item WHERE id = ?1 AND target_offer = ?2)",
            )
            .bind(*id)
            .bind(label.as_str())
            .fetch_one(pool)
            .await?;
            checks.push((format!("target:{id}"), matches == 1));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let quoted_ids = sql_array_from_ids(SEED_ITEM_IDS);
        sqlx::query(&format!("DELETE FROM catalog_item WHERE id IN {quoted_ids}"))
            .execute(pool)
            .await?;
        Ok(())
    }
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub items_seeded: usize,
    pub categories: Vec<Category>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}

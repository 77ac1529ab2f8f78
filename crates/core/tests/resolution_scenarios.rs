use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use offerwise_core::domain::catalog::{CatalogItem, Category, OfferLabel};
use offerwise_core::domain::profile::{BudgetTier, UsageType, UserProfile};
use offerwise_core::domain::recommendation::{
    ClassifierMode, Provenance, RecommendationRecord, RecommendationResult,
};
use offerwise_core::errors::ApplicationError;
use offerwise_core::resolution::{
    BudgetFilter, CatalogStore, ClassifierClient, ClassifierError, FeatureVector, HistoryStore,
    RecommendationEngine, RecommendationRequest, ResolutionPolicy,
};
use serde_json::{json, Value};

struct StaticCatalog(Vec<CatalogItem>);

#[async_trait]
impl CatalogStore for StaticCatalog {
    async fn list_active_items(&self) -> Result<Vec<CatalogItem>, ApplicationError> {
        Ok(self.0.iter().filter(|item| item.is_active).cloned().collect())
    }
}

struct DiscardHistory;

#[async_trait]
impl HistoryStore for DiscardHistory {
    async fn record(&self, _record: &RecommendationRecord) -> Result<(), ApplicationError> {
        Ok(())
    }
}

struct FixedClassifier(Value);

#[async_trait]
impl ClassifierClient for FixedClassifier {
    async fn fetch(&self, _features: &FeatureVector) -> Result<Value, ClassifierError> {
        Ok(self.0.clone())
    }

    async fn probe(&self) -> Result<(), ClassifierError> {
        Ok(())
    }
}

/// Answers long after the engine's classifier timeout.
struct SlowClassifier;

#[async_trait]
impl ClassifierClient for SlowClassifier {
    async fn fetch(&self, _features: &FeatureVector) -> Result<Value, ClassifierError> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(json!({ "top_offers": ["Data Booster"], "confidence_score": 0.99 }))
    }

    async fn probe(&self) -> Result<(), ClassifierError> {
        Ok(())
    }
}

fn engine(
    catalog: Vec<CatalogItem>,
    classifier: Arc<dyn ClassifierClient>,
) -> RecommendationEngine {
    RecommendationEngine::new(
        Arc::new(StaticCatalog(catalog)),
        Arc::new(DiscardHistory),
        classifier,
        ResolutionPolicy::default(),
        Duration::from_millis(50),
    )
}

fn ranked(labels: &[&str], confidence: f64) -> Arc<dyn ClassifierClient> {
    Arc::new(FixedClassifier(json!({ "top_offers": labels, "confidence_score": confidence })))
}

fn scenario_a_catalog() -> Vec<CatalogItem> {
    vec![
        CatalogItem::new("booster-50", "Data Booster 50GB", Category::Data, 50_000)
            .with_target_offer(OfferLabel::DataBooster),
        CatalogItem::new("booster-30", "Data Booster 30GB", Category::Data, 30_000)
            .with_target_offer(OfferLabel::DataBooster),
        CatalogItem::new("voice-300", "Voice 300 Menit", Category::Voice, 25_000)
            .with_target_offer(OfferLabel::VoiceBundle),
        CatalogItem::new("combo-mini", "Combo Mini", Category::Combo, 45_000),
        CatalogItem::new("sms-100", "SMS 100", Category::Sms, 5_000),
        CatalogItem::new("stream-hd", "Streaming HD", Category::Streaming, 60_000),
        CatalogItem::new("roam-asia", "Roaming Asia", Category::Roaming, 120_000),
    ]
}

fn assert_well_formed(result: &RecommendationResult, limit: usize, active: usize) {
    assert_eq!(result.entries.len(), limit.min(active), "length must be min(limit, active)");

    let ids =
        result.entries.iter().map(|entry| entry.catalog_item_id.clone()).collect::<HashSet<_>>();
    assert_eq!(ids.len(), result.entries.len(), "catalog item ids must be unique");

    let primary = result
        .entries
        .iter()
        .filter(|entry| entry.provenance == Provenance::Primary)
        .collect::<Vec<_>>();
    for pair in primary.windows(2) {
        assert!(pair[0].score >= pair[1].score, "primary entries must keep rank order");
    }
    assert!(primary.iter().all(|entry| entry.score >= 0.35), "primary scores respect the floor");

    let lowest_primary = primary.iter().map(|entry| entry.score).fold(f64::INFINITY, f64::min);
    for entry in result.entries.iter().filter(|entry| entry.provenance == Provenance::Fallback) {
        assert!(entry.score < lowest_primary, "fallback must score below every primary entry");
        assert!(entry.score <= 0.79, "fallback scores stay below the classifier band");
    }

    assert!(result.entries.iter().all(|entry| (0.0..=1.0).contains(&entry.score)));
}

#[tokio::test]
async fn scenario_a_classifier_offers_resolve_then_fallback_fills() {
    let engine = engine(scenario_a_catalog(), ranked(&["Data Booster", "Voice Bundle"], 0.9));

    let result = engine
        .recommend(RecommendationRequest::new(UserProfile::new(UsageType::Data), 5))
        .await
        .expect("recommendation");

    assert_eq!(result.entries.len(), 5);
    assert_eq!(result.entries[0].catalog_item_id.as_str(), "booster-30");
    assert!((result.entries[0].score - 0.9).abs() < 1e-9);
    assert_eq!(result.entries[1].catalog_item_id.as_str(), "voice-300");
    assert!((result.entries[1].score - 0.873).abs() < 1e-9);
    assert!(result.entries[2..].iter().all(|entry| {
        entry.provenance == Provenance::Fallback && entry.score <= 0.70
    }));
    assert_eq!(result.metadata.classifier_mode, ClassifierMode::Model);
    assert_eq!(result.metadata.primary_count, 2);
    assert_eq!(result.metadata.fallback_count, 3);
    assert_well_formed(&result, 5, 7);
}

#[tokio::test]
async fn scenario_b_classifier_timeout_serves_capped_rule_offers() {
    let engine = engine(scenario_a_catalog(), Arc::new(SlowClassifier));

    let result = engine
        .recommend(RecommendationRequest::new(UserProfile::new(UsageType::Data), 4))
        .await
        .expect("recommendation");

    assert!(!result.is_empty());
    assert_eq!(result.metadata.classifier_mode, ClassifierMode::Rules);
    assert!(result.entries.iter().all(|entry| entry.provenance == Provenance::Fallback));
    assert!(result.entries.iter().all(|entry| entry.score < 0.80));
    assert_eq!(result.entries.len(), 4);
}

#[tokio::test]
async fn scenario_c_limit_larger_than_catalog_returns_every_active_item() {
    let catalog = vec![
        CatalogItem::new("data-10", "Data 10GB", Category::Data, 40_000),
        CatalogItem::new("voice-100", "Voice 100", Category::Voice, 15_000),
        CatalogItem::new("data-old", "Retired Data", Category::Data, 10_000).inactive(),
    ];
    let engine = engine(catalog, ranked(&["Data Booster"], 0.8));

    let result = engine
        .recommend(RecommendationRequest::new(UserProfile::default(), 3))
        .await
        .expect("recommendation");

    assert_eq!(result.entries.len(), 2);
    assert!(result.entries.iter().all(|entry| entry.catalog_item_id.as_str() != "data-old"));
}

#[tokio::test]
async fn zero_confidence_pair_still_ranks_fallback_below_primary() {
    let reply = json!({
        "recommendation": { "primary_offer": "Voice Bundle", "confidence_score": 0 }
    });
    let engine = engine(scenario_a_catalog(), Arc::new(FixedClassifier(reply)));

    let result = engine
        .recommend(RecommendationRequest::new(UserProfile::new(UsageType::Voice), 3))
        .await
        .expect("recommendation");

    assert_eq!(result.metadata.classifier_mode, ClassifierMode::Model);
    assert_eq!(result.entries[0].catalog_item_id.as_str(), "voice-300");
    assert_eq!(result.entries[0].provenance, Provenance::Primary);
    assert!((result.entries[0].score - 0.5).abs() < 1e-9);
    assert_eq!(result.metadata.fallback_count, 2);
    assert_well_formed(&result, 3, 7);
}

#[test]
fn scenario_d_low_budget_keeps_only_affordable_candidates() {
    let filter = BudgetFilter::new(ResolutionPolicy::default().budget_ranges);
    let priced = |prices: &[i64]| {
        prices
            .iter()
            .map(|price| CatalogItem::new(format!("item-{price}"), "Item", Category::Data, *price))
            .collect::<Vec<_>>()
    };

    let items = priced(&[40_000, 150_000, 500_000]);
    let kept = filter.filter(items.iter().collect(), Some(BudgetTier::Low));
    assert_eq!(kept.iter().map(|item| item.price).collect::<Vec<_>>(), vec![40_000]);

    let expensive = priced(&[150_000, 500_000]);
    let relaxed = filter.filter(expensive.iter().collect(), Some(BudgetTier::Low));
    assert_eq!(relaxed.len(), 2, "an empty filtered set falls back to the full set");
}

#[tokio::test]
async fn results_are_well_formed_across_catalogs_profiles_and_limits() {
    let catalogs = vec![
        scenario_a_catalog(),
        vec![CatalogItem::new("only", "Only Item", Category::Device, 900_000)],
        (0..12)
            .map(|index| {
                CatalogItem::new(
                    format!("stream-{index:02}"),
                    "Streaming",
                    Category::Streaming,
                    20_000 + index * 15_000,
                )
                .with_purchase_count(u32::try_from(index).unwrap_or_default() * 7)
            })
            .collect(),
        Vec::new(),
    ];
    let replies: Vec<Arc<dyn ClassifierClient>> = vec![
        ranked(&["Data Booster", "Voice Bundle", "Streaming Partner Pack"], 0.62),
        ranked(&["Roaming Pass", "Roaming Pass", "Unknown Label"], 0.4),
        Arc::new(FixedClassifier(json!({ "unexpected": true }))),
        Arc::new(SlowClassifier),
    ];
    let profiles = [
        UserProfile::new(UsageType::Data).with_budget(BudgetTier::Low),
        UserProfile::new(UsageType::Voice).with_budget(BudgetTier::High),
        UserProfile::new(UsageType::Mixed).with_interests(["streaming", "travel"]),
    ];

    for catalog in &catalogs {
        let active = catalog.iter().filter(|item| item.is_active).count();
        for reply in &replies {
            let engine = engine(catalog.clone(), reply.clone());
            for profile in &profiles {
                for limit in [1, 3, 5, 20] {
                    let result = engine
                        .recommend(RecommendationRequest::new(profile.clone(), limit))
                        .await
                        .expect("recommendation");
                    assert_well_formed(&result, limit, active);
                }
            }
        }
    }
}

#[tokio::test]
async fn identical_requests_resolve_identically() {
    let engine = engine(scenario_a_catalog(), ranked(&["Voice Bundle", "Data Booster"], 0.75));
    let profile = UserProfile::new(UsageType::Voice).with_budget(BudgetTier::Medium);

    let first = engine
        .recommend(RecommendationRequest::new(profile.clone(), 6))
        .await
        .expect("first recommendation");
    let second = engine
        .recommend(RecommendationRequest::new(profile, 6))
        .await
        .expect("second recommendation");

    assert_eq!(first.entries, second.entries);
    assert_ne!(first.recommendation_id, second.recommendation_id);
}

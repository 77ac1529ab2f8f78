use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::{CatalogItemId, OfferLabel};
use super::profile::AlgorithmHint;

/// Where a ranked offer came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferSource {
    Classifier,
    RuleTable,
}

/// One classifier offer after normalization. Order by `rank` is significant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedOffer {
    pub label: OfferLabel,
    /// Confidence, 0.0 - 1.0.
    pub score: f64,
    pub explanation: String,
    pub rank: usize,
    pub source: OfferSource,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Primary,
    Fallback,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Primary => "primary",
            Provenance::Fallback => "fallback",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationEntry {
    pub catalog_item_id: CatalogItemId,
    /// Final score, 0.0 - 1.0.
    pub score: f64,
    pub reason: String,
    pub provenance: Provenance,
    pub source_label: OfferLabel,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    /// score >= 0.8
    pub very_high: usize,
    /// 0.6 <= score < 0.8
    pub high: usize,
    /// 0.4 <= score < 0.6
    pub medium: usize,
    /// score < 0.4
    pub low: usize,
}

impl ScoreDistribution {
    pub fn from_entries(entries: &[RecommendationEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut distribution, entry| {
            if entry.score >= 0.8 {
                distribution.very_high += 1;
            } else if entry.score >= 0.6 {
                distribution.high += 1;
            } else if entry.score >= 0.4 {
                distribution.medium += 1;
            } else {
                distribution.low += 1;
            }
            distribution
        })
    }

    pub fn total(&self) -> usize {
        self.very_high + self.high + self.medium + self.low
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    /// Offers came from the external classifier.
    Model,
    /// The classifier was unusable; offers came from the rule table.
    Rules,
}

/// Subset of the feature vector echoed back for observability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UsedFeatures {
    pub avg_data_usage_mb: f64,
    pub user_segment: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationMetadata {
    pub algorithm: AlgorithmHint,
    pub elapsed_ms: u64,
    pub generated_at: DateTime<Utc>,
    pub total_recommendations: usize,
    pub ranked_offer_count: usize,
    pub primary_count: usize,
    pub fallback_count: usize,
    pub fallback_used: bool,
    pub classifier_mode: ClassifierMode,
    pub score_distribution: ScoreDistribution,
    pub used_features: UsedFeatures,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub recommendation_id: String,
    pub entries: Vec<RecommendationEntry>,
    pub metadata: RecommendationMetadata,
}

impl RecommendationResult {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What the history store receives once a result has been computed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub id: String,
    pub user_id: Option<String>,
    pub entries: Vec<RecommendationEntry>,
    pub algorithm: AlgorithmHint,
    pub elapsed_ms: u64,
    pub model_version: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::{Provenance, RecommendationEntry, ScoreDistribution};
    use crate::domain::catalog::{CatalogItemId, OfferLabel};

    fn entry(score: f64) -> RecommendationEntry {
        RecommendationEntry {
            catalog_item_id: CatalogItemId::new(format!("item-{score}")),
            score,
            reason: "test".to_string(),
            provenance: Provenance::Primary,
            source_label: OfferLabel::GeneralOffer,
        }
    }

    #[test]
    fn distribution_buckets_use_inclusive_lower_bounds() {
        let entries =
            vec![entry(0.8), entry(0.79), entry(0.6), entry(0.4), entry(0.39), entry(1.0)];
        let distribution = ScoreDistribution::from_entries(&entries);

        assert_eq!(distribution.very_high, 2);
        assert_eq!(distribution.high, 2);
        assert_eq!(distribution.medium, 1);
        assert_eq!(distribution.low, 1);
        assert_eq!(distribution.total(), entries.len());
    }
}

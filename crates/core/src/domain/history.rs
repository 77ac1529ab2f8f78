use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::CatalogItemId;
use super::recommendation::RecommendationEntry;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionAction {
    Viewed,
    Clicked,
    Purchased,
    Ignored,
}

impl InteractionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionAction::Viewed => "viewed",
            InteractionAction::Clicked => "clicked",
            InteractionAction::Purchased => "purchased",
            InteractionAction::Ignored => "ignored",
        }
    }
}

impl fmt::Display for InteractionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionAction {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "viewed" => Ok(Self::Viewed),
            "clicked" => Ok(Self::Clicked),
            "purchased" => Ok(Self::Purchased),
            "ignored" => Ok(Self::Ignored),
            _ => Err(DomainError::unrecognized("interaction action", value)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub catalog_item_id: CatalogItemId,
    pub action: InteractionAction,
    pub occurred_at: DateTime<Utc>,
}

/// A persisted recommendation as read back from the history store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationHistory {
    pub id: String,
    pub user_id: Option<String>,
    pub algorithm: String,
    pub model_version: String,
    pub elapsed_ms: u64,
    pub accuracy: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<RecommendationEntry>,
    pub interactions: Vec<Interaction>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub items: Vec<RecommendationHistory>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl HistoryPage {
    pub fn new(items: Vec<RecommendationHistory>, page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(u64::from(limit)) };
        Self { items, page, limit, total, total_pages }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmStats {
    pub algorithm: String,
    pub count: u64,
    pub avg_elapsed_ms: f64,
    pub avg_accuracy: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationStats {
    pub total_recommendations: u64,
    pub total_users: u64,
    pub by_algorithm: Vec<AlgorithmStats>,
}

/// Converts a 1-5 star rating into the 0.0 - 1.0 accuracy stored with history.
pub fn rating_to_accuracy(rating: u8) -> Result<f64, DomainError> {
    if !(1..=5).contains(&rating) {
        return Err(DomainError::InvariantViolation(format!(
            "rating must be between 1 and 5, got {rating}"
        )));
    }
    Ok(f64::from(rating) / 5.0)
}

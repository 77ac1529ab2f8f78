//! Tunable constants for offer resolution.

use serde::{Deserialize, Serialize};

use crate::domain::profile::BudgetTier;

/// Inclusive price range; `max: None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: i64,
    pub max: Option<i64>,
}

impl PriceRange {
    pub const fn bounded(min: i64, max: i64) -> Self {
        Self { min, max: Some(max) }
    }

    pub const fn at_least(min: i64) -> Self {
        Self { min, max: None }
    }

    pub fn contains(&self, price: i64) -> bool {
        price >= self.min && self.max.map_or(true, |max| price <= max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetRanges {
    pub low: PriceRange,
    pub medium: PriceRange,
    pub high: PriceRange,
}

impl BudgetRanges {
    pub fn range_for(&self, tier: BudgetTier) -> PriceRange {
        match tier {
            BudgetTier::Low => self.low,
            BudgetTier::Medium => self.medium,
            BudgetTier::High => self.high,
        }
    }
}

/// Additive weights for fallback relevance scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelevanceWeights {
    /// Category allowed for the usage type or implied by an interest (default: 3.0)
    pub category_match: f64,
    /// Ceiling of the normalized popularity component (default: 2.0)
    pub popularity: f64,
    /// Price inside the user's budget range (default: 2.0)
    pub budget_match: f64,
    /// Price at or below the low-price threshold (default: 1.0)
    pub low_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionPolicy {
    /// Per-rank geometric decay for ranked replies.
    pub rank_decay: f64,
    /// Lowest score a ranked classifier offer may decay to.
    pub score_floor: f64,
    /// Confidence assumed when the classifier omits one.
    pub default_confidence: f64,
    /// Secondary offer score as a fraction of the primary in paired replies.
    pub secondary_score_factor: f64,
    /// Multiplier applied when both paired labels agree (result capped at 1.0).
    pub agreement_boost: f64,
    /// Upper bound for rule-table confidence; must stay below 0.80.
    pub rule_confidence_cap: f64,
    pub max_rule_offers: usize,
    pub budget_ranges: BudgetRanges,
    pub fallback_band_high: f64,
    pub fallback_band_low: f64,
    /// Gap kept between the lowest primary score and any fallback score.
    pub fallback_separation: f64,
    /// Preferred fallback pool is budget-narrowed only when larger than this.
    pub fallback_budget_threshold: usize,
    pub relevance_weights: RelevanceWeights,
    pub low_price_threshold: i64,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        super::DEFAULT_POLICY
    }
}

impl ResolutionPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.rank_decay > 0.0 && self.rank_decay <= 1.0) {
            return Err("policy.rank_decay must be in range (0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.score_floor) {
            return Err("policy.score_floor must be in range [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.default_confidence) {
            return Err("policy.default_confidence must be in range [0, 1]".to_string());
        }
        if !(self.secondary_score_factor > 0.0 && self.secondary_score_factor <= 1.0) {
            return Err("policy.secondary_score_factor must be in range (0, 1]".to_string());
        }
        if self.agreement_boost < 1.0 {
            return Err("policy.agreement_boost must be at least 1.0".to_string());
        }
        if !(self.rule_confidence_cap > 0.0 && self.rule_confidence_cap < 0.80) {
            return Err("policy.rule_confidence_cap must be in range (0, 0.80)".to_string());
        }
        if self.max_rule_offers == 0 {
            return Err("policy.max_rule_offers must be greater than zero".to_string());
        }
        if !(0.0 <= self.fallback_band_low
            && self.fallback_band_low <= self.fallback_band_high
            && self.fallback_band_high <= 1.0)
        {
            return Err(
                "policy fallback band must satisfy 0 <= fallback_band_low <= fallback_band_high <= 1"
                    .to_string(),
            );
        }
        if !(self.fallback_separation > 0.0 && self.fallback_separation < 1.0) {
            return Err("policy.fallback_separation must be in range (0, 1)".to_string());
        }
        for (name, range) in [
            ("low", self.budget_ranges.low),
            ("medium", self.budget_ranges.medium),
            ("high", self.budget_ranges.high),
        ] {
            if range.min < 0 || range.max.is_some_and(|max| max < range.min) {
                return Err(format!("policy.budget_ranges.{name} must satisfy 0 <= min <= max"));
            }
        }
        let weights = self.relevance_weights;
        if [weights.category_match, weights.popularity, weights.budget_match, weights.low_price]
            .iter()
            .any(|weight| *weight < 0.0)
        {
            return Err("policy relevance weights must not be negative".to_string());
        }
        Ok(())
    }
}

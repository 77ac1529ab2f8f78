use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::debug;

use super::budget::BudgetFilter;
use super::policy::ResolutionPolicy;
use crate::domain::catalog::{CatalogItem, CatalogItemId, Category, OfferLabel};
use crate::domain::profile::{BudgetTier, UsageType, UserProfile};
use crate::domain::recommendation::{Provenance, RecommendationEntry};

fn allowed_categories(usage_type: UsageType) -> &'static [Category] {
    match usage_type {
        UsageType::Data => &[Category::Data, Category::Streaming],
        UsageType::Voice => &[Category::Voice, Category::Combo],
        UsageType::Sms => &[Category::Combo],
        UsageType::Mixed => &[Category::Combo, Category::Data, Category::Voice],
    }
}

fn interest_categories(profile: &UserProfile) -> Vec<Category> {
    let mut categories = Vec::new();
    if profile.has_interest("streaming") || profile.has_interest("gaming") {
        categories.push(Category::Streaming);
    }
    if profile.has_interest("travel") {
        categories.push(Category::Roaming);
    }
    categories
}

#[derive(Debug)]
struct Scored<'a> {
    item: &'a CatalogItem,
    relevance: f64,
}

/// Fills the gap between what the ranked offers produced and the requested count.
#[derive(Debug, Clone)]
pub struct FallbackFiller {
    policy: ResolutionPolicy,
    budget: BudgetFilter,
}

impl FallbackFiller {
    pub fn new(policy: ResolutionPolicy) -> Self {
        let budget = BudgetFilter::new(policy.budget_ranges);
        Self { policy, budget }
    }

    pub fn fill<'a>(
        &self,
        current: &[RecommendationEntry],
        catalog: &'a [CatalogItem],
        profile: &UserProfile,
        shortfall: usize,
    ) -> Vec<RecommendationEntry> {
        if shortfall == 0 {
            return Vec::new();
        }

        let used = current.iter().map(|entry| &entry.catalog_item_id).collect::<HashSet<_>>();
        let universe = catalog
            .iter()
            .filter(|item| item.is_active && !used.contains(&item.id))
            .collect::<Vec<_>>();
        if universe.is_empty() {
            return Vec::new();
        }

        let allowed = allowed_categories(profile.usage_type);
        let implied = interest_categories(profile);

        let mut preferred = universe
            .iter()
            .copied()
            .filter(|item| allowed.contains(&item.category))
            .collect::<Vec<_>>();
        if preferred.len() > self.policy.fallback_budget_threshold && profile.budget.is_some() {
            preferred = self.budget.filter(preferred, profile.budget);
        }
        let preferred_ids =
            preferred.iter().map(|item| item.id.clone()).collect::<HashSet<CatalogItemId>>();
        let secondary = universe
            .iter()
            .copied()
            .filter(|item| !preferred_ids.contains(&item.id))
            .collect::<Vec<_>>();

        let max_popularity = universe.iter().map(|item| item.purchase_count).max().unwrap_or(0);
        let score_pool = |pool: Vec<&'a CatalogItem>| {
            let mut scored = pool
                .into_iter()
                .map(|item| Scored {
                    item,
                    relevance: self.relevance(item, profile, allowed, &implied, max_popularity),
                })
                .collect::<Vec<_>>();
            scored.sort_by(compare_scored);
            scored
        };

        let chosen = score_pool(preferred)
            .into_iter()
            .chain(score_pool(secondary))
            .take(shortfall)
            .collect::<Vec<_>>();

        let cap = current
            .iter()
            .map(|entry| entry.score)
            .min_by(f64::total_cmp)
            .map(|lowest| (lowest - self.policy.fallback_separation).max(0.0));

        let count = chosen.len();
        let entries = chosen
            .into_iter()
            .enumerate()
            .map(|(position, scored)| {
                let banded = self.band_score(position, count);
                let score = cap.map_or(banded, |cap| banded.min(cap));
                RecommendationEntry {
                    catalog_item_id: scored.item.id.clone(),
                    score,
                    reason: self.reason(scored.item, profile),
                    provenance: Provenance::Fallback,
                    source_label: scored.item.target_offer.unwrap_or(OfferLabel::GeneralOffer),
                }
            })
            .collect::<Vec<_>>();

        debug!(
            event_name = "resolution.fallback.filled",
            shortfall,
            filled = entries.len(),
            "filled shortfall from catalog"
        );
        entries
    }

    fn relevance(
        &self,
        item: &CatalogItem,
        profile: &UserProfile,
        allowed: &[Category],
        implied: &[Category],
        max_popularity: u32,
    ) -> f64 {
        let weights = self.policy.relevance_weights;
        let mut relevance = 0.0;

        if allowed.contains(&item.category) || implied.contains(&item.category) {
            relevance += weights.category_match;
        }
        if max_popularity > 0 {
            let share = f64::from(item.purchase_count) / f64::from(max_popularity);
            relevance += weights.popularity * share.min(1.0);
        }
        if self.budget.matches(item, profile.budget) {
            relevance += weights.budget_match;
        }
        if item.price <= self.policy.low_price_threshold {
            relevance += weights.low_price;
        }
        relevance
    }

    /// Budget wording compares against the upper bound of the low tier; an unbounded low
    /// tier makes every item budget-friendly and none premium.
    fn reason(&self, item: &CatalogItem, profile: &UserProfile) -> String {
        let budget_line = self.policy.budget_ranges.low.max;
        let reason = match (item.category, profile.usage_type) {
            (Category::Data, UsageType::Data) => "Popular data package for data users like you",
            (Category::Voice, UsageType::Voice) => "Popular voice package for frequent callers",
            (Category::Streaming, _) if profile.has_interest("streaming") => {
                "Great for streaming enthusiasts"
            }
            (Category::Roaming, _) if profile.has_interest("travel") => {
                "Handy for your next trip abroad"
            }
            (Category::Combo, _) => "Popular combo package for balanced usage",
            _ => match profile.budget {
                Some(BudgetTier::Low) if budget_line.map_or(true, |line| item.price < line) => {
                    "Budget-friendly option within your range"
                }
                Some(BudgetTier::High) if budget_line.is_some_and(|line| item.price > line) => {
                    "Premium package with generous quotas"
                }
                _ => "Popular choice among users",
            },
        };
        reason.to_string()
    }

    /// Linear band from `fallback_band_high` at the first position down to
    /// `fallback_band_low` at the last.
    fn band_score(&self, position: usize, count: usize) -> f64 {
        let high = self.policy.fallback_band_high;
        if count <= 1 {
            return high;
        }
        let step = (high - self.policy.fallback_band_low) / (count - 1) as f64;
        high - step * position as f64
    }
}

fn compare_scored(a: &Scored<'_>, b: &Scored<'_>) -> Ordering {
    b.relevance
        .total_cmp(&a.relevance)
        .then_with(|| b.item.purchase_count.cmp(&a.item.purchase_count))
        .then_with(|| a.item.price.cmp(&b.item.price))
        .then_with(|| a.item.id.cmp(&b.item.id))
}

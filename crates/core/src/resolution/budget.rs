use tracing::debug;

use super::policy::BudgetRanges;
use crate::domain::catalog::CatalogItem;
use crate::domain::profile::BudgetTier;

#[derive(Debug, Clone, Copy)]
pub struct BudgetFilter {
    ranges: BudgetRanges,
}

impl BudgetFilter {
    pub fn new(ranges: BudgetRanges) -> Self {
        Self { ranges }
    }

    /// Keeps items priced inside the tier's range. Never turns a non-empty
    /// input into an empty output: when nothing fits, the input is returned.
    pub fn filter<'a>(
        &self,
        items: Vec<&'a CatalogItem>,
        tier: Option<BudgetTier>,
    ) -> Vec<&'a CatalogItem> {
        let Some(tier) = tier else {
            return items;
        };

        let range = self.ranges.range_for(tier);
        let within =
            items.iter().copied().filter(|item| range.contains(item.price)).collect::<Vec<_>>();
        if within.is_empty() && !items.is_empty() {
            debug!(
                event_name = "resolution.budget.relaxed",
                budget = %tier,
                candidate_count = items.len(),
                "no candidate fits the budget; keeping the unfiltered set"
            );
            return items;
        }
        within
    }

    pub fn matches(&self, item: &CatalogItem, tier: Option<BudgetTier>) -> bool {
        tier.is_some_and(|tier| self.ranges.range_for(tier).contains(item.price))
    }
}

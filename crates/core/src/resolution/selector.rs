use std::cmp::Ordering;

use crate::domain::catalog::CatalogItem;
use crate::domain::profile::BudgetTier;

/// Picks one item from a candidate set. Pure; item id is the last tie-break.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicSelector;

impl DeterministicSelector {
    pub fn select_one<'a>(
        &self,
        items: &[&'a CatalogItem],
        tier: Option<BudgetTier>,
    ) -> Option<&'a CatalogItem> {
        items.iter().copied().min_by(|a, b| Self::order(a, b, tier))
    }

    fn order(a: &CatalogItem, b: &CatalogItem, tier: Option<BudgetTier>) -> Ordering {
        let by_price = a.price.cmp(&b.price);
        let by_popularity = b.purchase_count.cmp(&a.purchase_count);

        let primary = match tier {
            Some(BudgetTier::Low) => by_price,
            Some(BudgetTier::High) => by_popularity.then(by_price),
            Some(BudgetTier::Medium) | None => by_price.then(by_popularity),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

#[cfg(test)]
mod tests {
    use super::DeterministicSelector;
    use crate::domain::catalog::{CatalogItem, Category};
    use crate::domain::profile::BudgetTier;

    fn items() -> Vec<CatalogItem> {
        vec![
            CatalogItem::new("b", "Mid", Category::Data, 50_000).with_purchase_count(10),
            CatalogItem::new("c", "Popular", Category::Data, 90_000).with_purchase_count(500),
            CatalogItem::new("a", "Cheap", Category::Data, 50_000).with_purchase_count(10),
            CatalogItem::new("d", "Cheap twin", Category::Data, 50_000).with_purchase_count(40),
        ]
    }

    fn pick(tier: Option<BudgetTier>) -> String {
        let items = items();
        let refs = items.iter().collect::<Vec<_>>();
        DeterministicSelector
            .select_one(&refs, tier)
            .map(|item| item.id.to_string())
            .unwrap_or_default()
    }

    #[test]
    fn default_prefers_cheapest_then_most_popular() {
        assert_eq!(pick(None), "d");
        assert_eq!(pick(Some(BudgetTier::Medium)), "d");
    }

    #[test]
    fn low_budget_uses_price_then_id() {
        assert_eq!(pick(Some(BudgetTier::Low)), "a");
    }

    #[test]
    fn high_budget_prefers_popularity() {
        assert_eq!(pick(Some(BudgetTier::High)), "c");
    }

    #[test]
    fn selection_is_independent_of_input_order() {
        let items = items();
        let mut refs = items.iter().collect::<Vec<_>>();
        let selector = DeterministicSelector;

        let first = selector.select_one(&refs, Some(BudgetTier::Low)).map(|item| item.id.clone());
        refs.reverse();
        let second = selector.select_one(&refs, Some(BudgetTier::Low)).map(|item| item.id.clone());
        assert_eq!(first, second);
        assert!(DeterministicSelector.select_one(&[], None).is_none());
    }
}

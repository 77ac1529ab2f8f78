use std::collections::HashSet;

use crate::domain::catalog::{CatalogItem, CatalogItemId, OfferLabel};

/// Finds catalog items for an offer label within one catalog snapshot.
#[derive(Debug, Clone, Copy)]
pub struct CandidateResolver<'a> {
    catalog: &'a [CatalogItem],
}

impl<'a> CandidateResolver<'a> {
    pub fn new(catalog: &'a [CatalogItem]) -> Self {
        Self { catalog }
    }

    /// Items targeting `label` directly, otherwise items of the label's mapped category.
    pub fn resolve(
        &self,
        label: OfferLabel,
        excluded: &HashSet<CatalogItemId>,
    ) -> Vec<&'a CatalogItem> {
        let available = |item: &&'a CatalogItem| item.is_active && !excluded.contains(&item.id);

        let targeted = self
            .catalog
            .iter()
            .filter(available)
            .filter(|item| item.target_offer == Some(label))
            .collect::<Vec<_>>();
        if !targeted.is_empty() {
            return targeted;
        }

        let category = label.mapped_category();
        self.catalog.iter().filter(available).filter(|item| item.category == category).collect()
    }
}

use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use offerwise_core::domain::catalog::{Category, OfferLabel};

type SeedContractTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
    ($left:expr, $right:expr, $($arg:tt)*) => {
        if $left != $right {
            return Err(format!($($arg)*));
        }
    };
}

#[derive(Debug, Deserialize)]
struct SeedItemContract {
    id: String,
    name: String,
    category: String,
    price: i64,
    target_offer: Option<String>,
    purchase_count: u32,
}

#[derive(Debug, Deserialize)]
struct SeedContract {
    dataset_version: String,
    seed_dataset: String,
    item_count: usize,
    categories: Vec<String>,
    items: Vec<SeedItemContract>,
}

fn load_contract() -> SeedContractTestResult<SeedContract> {
    serde_json::from_str(include_str!("../../../config/fixtures/catalog_seed_contract.json"))
        .map_err(|error| format!("seed contract JSON must parse: {error}"))
}

const FIXTURE_SQL: &str = include_str!("../../../config/fixtures/catalog_seed.sql");

#[test]
fn seed_contract_matches_catalog_sql_fixture() -> SeedContractTestResult {
    let contract = load_contract()?;
    let mut ids_seen = HashSet::new();

    require_eq!(contract.dataset_version, "catalog-2026.1");
    require_eq!(contract.seed_dataset, "deterministic_demo_telco_catalog");
    require_eq!(contract.items.len(), contract.item_count);

    for item in &contract.items {
        require!(ids_seen.insert(item.id.clone()), "duplicate item id: {}", item.id);
        require!(!item.name.is_empty(), "item {} should have a name", item.id);
        require!(item.price > 0, "item {} should have a positive price", item.id);

        let row_prefix =
            format!("('{}', '{}', '{}', {}, ", item.id, item.name, item.category, item.price);
        require!(
            FIXTURE_SQL.contains(&row_prefix),
            "seed SQL fixture should include row {}",
            row_prefix
        );

        let label_fragment = match &item.target_offer {
            Some(label) => format!("'{label}', {}, 1,", item.purchase_count),
            None => format!("NULL, {}, 1,", item.purchase_count),
        };
        require!(
            FIXTURE_SQL.contains(&format!("{row_prefix}{label_fragment}")),
            "seed SQL fixture row for {} should carry label and popularity from the contract",
            item.id
        );
    }

    Ok(())
}

#[test]
fn seed_contract_uses_domain_vocabulary() -> SeedContractTestResult {
    let contract = load_contract()?;

    for item in &contract.items {
        require!(
            item.category.parse::<Category>().is_ok(),
            "item {} has unknown category {}",
            item.id,
            item.category
        );
        if let Some(label) = &item.target_offer {
            let parsed = label
                .parse::<OfferLabel>()
                .map_err(|_| format!("item {} has unknown label {label}", item.id))?;
            require!(
                parsed != OfferLabel::GeneralOffer,
                "item {} should not target the catch-all label",
                item.id
            );
        }
    }

    let categories =
        contract.categories.iter().map(|category| category.as_str()).collect::<HashSet<_>>();
    for category in Category::ALL {
        require!(
            categories.contains(category.as_str()),
            "seed contract should cover category {}",
            category
        );
    }

    Ok(())
}

#[test]
fn every_actionable_label_has_a_catalog_path() -> SeedContractTestResult {
    let contract = load_contract()?;

    let mut by_category: HashMap<String, usize> = HashMap::new();
    let mut targeted = HashSet::new();
    for item in &contract.items {
        *by_category.entry(item.category.clone()).or_default() += 1;
        if let Some(label) = &item.target_offer {
            targeted.insert(label.clone());
        }
    }

    for label in OfferLabel::ALL {
        let direct = targeted.contains(label.as_str());
        let mapped = by_category.get(label.mapped_category().as_str()).copied().unwrap_or(0) > 0;
        require!(direct || mapped, "label {} resolves to no seeded item", label);
    }

    Ok(())
}

//! Read-only catalog browsing.
//!
//! - `GET /api/v1/catalog`              active items, filtered, sorted and paginated
//! - `GET /api/v1/catalog/{id}`         one item, inactive ones included
//! - `GET /api/v1/catalog/categories`   categories that have at least one active item
//! - `GET /api/v1/catalog/popular`      active items by purchase count

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use offerwise_core::domain::catalog::{CatalogItem, CatalogItemId, Category};
use offerwise_core::errors::{ApplicationError, DomainError};
use offerwise_db::repositories::CatalogRepository;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::{correlation_id, persistence_error, ApiError};

const DEFAULT_PAGE_LIMIT: u32 = 10;
const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Clone)]
pub struct CatalogState {
    pub catalog: Arc<dyn CatalogRepository>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CatalogPage {
    pub items: Vec<CatalogItem>,
    pub page: u32,
    pub limit: u32,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct CategoryList {
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize)]
pub struct PopularList {
    pub items: Vec<CatalogItem>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SortKey {
    Id,
    Name,
    Price,
    Popularity,
}

/// Validated form of [`CatalogQuery`].
#[derive(Debug)]
struct CatalogFilter {
    page: u32,
    limit: u32,
    category: Option<Category>,
    min_price: Option<i64>,
    max_price: Option<i64>,
    search: Option<String>,
    sort_key: SortKey,
    descending: bool,
}

impl TryFrom<CatalogQuery> for CatalogFilter {
    type Error = DomainError;

    fn try_from(query: CatalogQuery) -> Result<Self, Self::Error> {
        let page = query.page.unwrap_or(1);
        if page == 0 {
            return Err(DomainError::InvariantViolation("page must be at least 1".to_string()));
        }
        let limit = page_limit(query.limit)?;

        for (field, price) in [("min_price", query.min_price), ("max_price", query.max_price)] {
            if price.is_some_and(|price| price < 0) {
                return Err(DomainError::InvariantViolation(format!(
                    "{field} must not be negative"
                )));
            }
        }
        if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
            if min > max {
                return Err(DomainError::InvariantViolation(format!(
                    "min_price {min} exceeds max_price {max}"
                )));
            }
        }

        let category = query
            .category
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(str::parse::<Category>)
            .transpose()?;

        let sort_key = match query.sort_by.as_deref().map(str::trim) {
            None | Some("") | Some("id") => SortKey::Id,
            Some("name") => SortKey::Name,
            Some("price") => SortKey::Price,
            Some("popularity") => SortKey::Popularity,
            Some(other) => return Err(DomainError::unrecognized("sort_by", other)),
        };
        let descending = match query.sort_order.as_deref().map(str::trim) {
            None | Some("") | Some("asc") => false,
            Some("desc") => true,
            Some(other) => return Err(DomainError::unrecognized("sort_order", other)),
        };

        Ok(Self {
            page,
            limit,
            category,
            min_price: query.min_price,
            max_price: query.max_price,
            search: query
                .search
                .map(|text| text.trim().to_lowercase())
                .filter(|text| !text.is_empty()),
            sort_key,
            descending,
        })
    }
}

impl CatalogFilter {
    fn matches(&self, item: &CatalogItem) -> bool {
        self.category.map_or(true, |category| item.category == category)
            && self.min_price.map_or(true, |min| item.price >= min)
            && self.max_price.map_or(true, |max| item.price <= max)
            && self.search.as_deref().map_or(true, |needle| {
                item.name.to_lowercase().contains(needle) || item.id.as_str().contains(needle)
            })
    }

    fn compare(&self, a: &CatalogItem, b: &CatalogItem) -> Ordering {
        let ordering = match self.sort_key {
            SortKey::Id => Ordering::Equal,
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::Price => a.price.cmp(&b.price),
            SortKey::Popularity => a.purchase_count.cmp(&b.purchase_count),
        };
        let ordering = if self.descending { ordering.reverse() } else { ordering };
        ordering.then_with(|| a.id.cmp(&b.id))
    }

    fn apply(&self, items: Vec<CatalogItem>) -> CatalogPage {
        let mut matched = items.into_iter().filter(|item| self.matches(item)).collect::<Vec<_>>();
        matched.sort_by(|a, b| self.compare(a, b));

        let total = matched.len();
        let offset = (self.page as usize - 1).saturating_mul(self.limit as usize);
        let items = matched.into_iter().skip(offset).take(self.limit as usize).collect();
        CatalogPage { items, page: self.page, limit: self.limit, total }
    }
}

fn page_limit(raw: Option<u32>) -> Result<u32, DomainError> {
    let limit = raw.unwrap_or(DEFAULT_PAGE_LIMIT);
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(DomainError::InvariantViolation(format!(
            "limit must be between 1 and {MAX_PAGE_LIMIT}, got {limit}"
        )));
    }
    Ok(limit)
}

pub fn router(state: CatalogState) -> Router {
    Router::new()
        .route("/api/v1/catalog", get(list))
        .route("/api/v1/catalog/categories", get(categories))
        .route("/api/v1/catalog/popular", get(popular))
        .route("/api/v1/catalog/{id}", get(item))
        .with_state(state)
}

async fn list(
    State(state): State<CatalogState>,
    headers: HeaderMap,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<CatalogPage>, ApiError> {
    let cid = correlation_id(&headers);
    let filter = CatalogFilter::try_from(query).map_err(|error| ApiError::from_app(error, &cid))?;

    let items =
        state.catalog.list_active().await.map_err(|error| persistence_error(error, &cid))?;
    let page = filter.apply(items);

    debug!(
        event_name = "api.catalog.listed",
        correlation_id = %cid,
        total = page.total,
        returned = page.items.len(),
        "catalog page served"
    );
    Ok(Json(page))
}

async fn item(
    State(state): State<CatalogState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CatalogItem>, ApiError> {
    let cid = correlation_id(&headers);
    let found = state
        .catalog
        .find_by_id(&CatalogItemId::new(id.trim()))
        .await
        .map_err(|error| persistence_error(error, &cid))?;

    found.map(Json).ok_or_else(|| {
        ApiError::from_app(ApplicationError::NotFound(format!("catalog item {id}")), &cid)
    })
}

async fn categories(
    State(state): State<CatalogState>,
    headers: HeaderMap,
) -> Result<Json<CategoryList>, ApiError> {
    let cid = correlation_id(&headers);
    let items =
        state.catalog.list_active().await.map_err(|error| persistence_error(error, &cid))?;

    let categories = items.iter().map(|item| item.category).collect::<BTreeSet<_>>();
    Ok(Json(CategoryList { categories: categories.into_iter().collect() }))
}

async fn popular(
    State(state): State<CatalogState>,
    headers: HeaderMap,
    Query(query): Query<PopularQuery>,
) -> Result<Json<PopularList>, ApiError> {
    let cid = correlation_id(&headers);
    let limit = page_limit(query.limit).map_err(|error| ApiError::from_app(error, &cid))?;

    let mut items =
        state.catalog.list_active().await.map_err(|error| persistence_error(error, &cid))?;
    items.sort_by(|a, b| b.purchase_count.cmp(&a.purchase_count).then_with(|| a.id.cmp(&b.id)));
    items.truncate(limit as usize);

    Ok(Json(PopularList { items }))
}

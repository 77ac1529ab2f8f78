pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{CatalogSeedDataset, SeedResult, VerificationResult};
pub use repositories::{
    CatalogRepository, HistoryRepository, InMemoryCatalogRepository, InMemoryHistoryRepository,
    RepositoryError, SqlCatalogRepository, SqlRecommendationHistoryRepository,
};

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use offerwise_core::resolution::{ClassifierError, RecommendationEngine};
use offerwise_db::DbPool;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    pub db_pool: DbPool,
    pub engine: Arc<RecommendationEngine>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    pub classifier: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// 200 while the database answers. A classifier outage only degrades the
/// report since recommendations keep flowing from the rule table.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let classifier = classifier_check(&state.engine).await;
    let ready = database.status == "ready";

    let status = match (ready, classifier.status) {
        (false, _) => "unavailable",
        (true, "ready") => "ready",
        (true, _) => "degraded",
    };

    let payload = HealthResponse {
        status,
        service: HealthCheck {
            status: "ready",
            detail: "offerwise-server runtime initialized".to_string(),
        },
        database,
        classifier,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

async fn classifier_check(engine: &RecommendationEngine) -> HealthCheck {
    match engine.probe_classifier().await {
        Ok(()) => HealthCheck { status: "ready", detail: "classifier reachable".to_string() },
        Err(ClassifierError::Disabled) => HealthCheck {
            status: "disabled",
            detail: "classifier disabled; serving from rule table".to_string(),
        },
        Err(error) => HealthCheck {
            status: "degraded",
            detail: format!("classifier unreachable, serving from rule table: {error}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{extract::State, http::StatusCode, Json};
    use offerwise_core::resolution::{DisabledClassifier, RecommendationEngine, ResolutionPolicy};
    use offerwise_db::connect_with_settings;
    use offerwise_db::repositories::{InMemoryCatalogRepository, InMemoryHistoryRepository};

    use crate::health::{health, HealthState};

    fn engine() -> Arc<RecommendationEngine> {
        Arc::new(RecommendationEngine::new(
            Arc::new(InMemoryCatalogRepository::default()),
            Arc::new(InMemoryHistoryRepository::default()),
            Arc::new(DisabledClassifier),
            ResolutionPolicy::default(),
            Duration::from_millis(100),
        ))
    }

    #[tokio::test]
    async fn health_stays_ok_when_only_classifier_is_unavailable() {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");

        let (status, Json(payload)) =
            health(State(HealthState { db_pool: pool.clone(), engine: engine() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.database.status, "ready");
        assert_eq!(payload.classifier.status, "disabled");
        assert_eq!(payload.service.status, "ready");

        pool.close().await;
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_database_is_unavailable() {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        pool.close().await;

        let (status, Json(payload)) =
            health(State(HealthState { db_pool: pool, engine: engine() })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "unavailable");
        assert_eq!(payload.database.status, "degraded");
    }
}

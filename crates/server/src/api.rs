//! Recommendation API.
//!
//! - `POST /api/v1/recommendations`                    resolve offers for a profile
//! - `GET  /api/v1/recommendations/history`            paginated history
//! - `POST /api/v1/recommendations/{id}/interaction`   record viewed/clicked/purchased/ignored
//! - `POST /api/v1/recommendations/feedback`           1-5 star rating
//! - `GET  /api/v1/recommendations/stats`              aggregates per algorithm

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use offerwise_core::domain::catalog::CatalogItemId;
use offerwise_core::domain::history::{
    rating_to_accuracy, HistoryPage, Interaction, InteractionAction, RecommendationStats,
};
use offerwise_core::domain::profile::{AlgorithmHint, UserProfile};
use offerwise_core::domain::recommendation::{RecommendationEntry, RecommendationMetadata};
use offerwise_core::errors::{ApplicationError, DomainError, InterfaceError};
use offerwise_core::resolution::{
    RecommendationEngine, RecommendationRequest, DEFAULT_RECOMMENDATIONS,
};
use offerwise_db::repositories::HistoryRepository;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

const CORRELATION_HEADER: &str = "x-correlation-id";
const DEFAULT_HISTORY_LIMIT: u32 = 10;
const MAX_HISTORY_LIMIT: u32 = 50;

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<RecommendationEngine>,
    pub history: Arc<dyn HistoryRepository>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendBody {
    pub user_id: Option<String>,
    #[serde(default)]
    pub profile: UserProfile,
    pub limit: Option<usize>,
    pub algorithm: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub recommendation_id: String,
    pub correlation_id: String,
    pub recommendations: Vec<RecommendationEntry>,
    pub metadata: RecommendationMetadata,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user_id: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct InteractionBody {
    pub catalog_item_id: String,
    pub action: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackBody {
    pub recommendation_id: String,
    pub rating: u8,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
    pub correlation_id: String,
}

/// Wraps [`InterfaceError`] so handlers can return it directly.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    pub(crate) fn from_app(error: impl Into<ApplicationError>, correlation_id: &str) -> Self {
        Self(error.into().into_interface(correlation_id))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.0.user_message().to_string(),
            detail: self.0.message().to_string(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/recommendations", post(recommend))
        .route("/api/v1/recommendations/history", get(history))
        .route("/api/v1/recommendations/feedback", post(feedback))
        .route("/api/v1/recommendations/stats", get(stats))
        .route("/api/v1/recommendations/{id}/interaction", post(interaction))
        .with_state(state)
}

pub(crate) fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

pub(crate) fn persistence_error(error: offerwise_db::RepositoryError, cid: &str) -> ApiError {
    warn!(
        event_name = "api.persistence.failed",
        correlation_id = %cid,
        error = %error,
        "repository call failed"
    );
    ApiError::from_app(error, cid)
}

async fn recommend(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<RecommendBody>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let cid = correlation_id(&headers);

    let algorithm = match body.algorithm.as_deref() {
        Some(raw) => raw.parse::<AlgorithmHint>().map_err(|error| ApiError::from_app(error, &cid))?,
        None => AlgorithmHint::default(),
    };

    let mut request =
        RecommendationRequest::new(body.profile, body.limit.unwrap_or(DEFAULT_RECOMMENDATIONS))
            .with_algorithm(algorithm)
            .with_correlation_id(cid.clone());
    if let Some(user_id) = body.user_id.filter(|id| !id.trim().is_empty()) {
        request = request.with_user_id(user_id);
    }

    let result = state.engine.recommend(request).await.map_err(|error| {
        warn!(
            event_name = "api.recommend.failed",
            correlation_id = %cid,
            error = %error,
            "recommendation request failed"
        );
        ApiError(error.into_interface(cid.as_str()))
    })?;

    Ok(Json(RecommendResponse {
        recommendation_id: result.recommendation_id,
        correlation_id: cid,
        recommendations: result.entries,
        metadata: result.metadata,
    }))
}

async fn history(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>, ApiError> {
    let cid = correlation_id(&headers);
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    if page == 0 {
        return Err(ApiError::from_app(
            DomainError::InvariantViolation("page must be at least 1".to_string()),
            &cid,
        ));
    }
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(ApiError::from_app(
            DomainError::InvariantViolation(format!(
                "limit must be between 1 and {MAX_HISTORY_LIMIT}, got {limit}"
            )),
            &cid,
        ));
    }

    let user_id = query.user_id.as_deref().map(str::trim).filter(|id| !id.is_empty());
    let page = state
        .history
        .list_for_user(user_id, page, limit)
        .await
        .map_err(|error| persistence_error(error, &cid))?;
    Ok(Json(page))
}

async fn interaction(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(recommendation_id): Path<String>,
    Json(body): Json<InteractionBody>,
) -> Result<(StatusCode, Json<AckResponse>), ApiError> {
    let cid = correlation_id(&headers);
    let action =
        body.action.parse::<InteractionAction>().map_err(|error| ApiError::from_app(error, &cid))?;
    if body.catalog_item_id.trim().is_empty() {
        return Err(ApiError::from_app(
            DomainError::InvariantViolation("catalog_item_id must not be empty".to_string()),
            &cid,
        ));
    }

    let interaction = Interaction {
        catalog_item_id: CatalogItemId::new(body.catalog_item_id.trim()),
        action,
        occurred_at: Utc::now(),
    };
    let recorded = state
        .history
        .add_interaction(&recommendation_id, interaction)
        .await
        .map_err(|error| persistence_error(error, &cid))?;
    if !recorded {
        return Err(ApiError::from_app(
            ApplicationError::NotFound(format!("recommendation {recommendation_id}")),
            &cid,
        ));
    }

    info!(
        event_name = "api.interaction.recorded",
        correlation_id = %cid,
        recommendation_id = %recommendation_id,
        action = %action,
        "interaction recorded"
    );
    Ok((
        StatusCode::CREATED,
        Json(AckResponse { success: true, message: "Interaction tracked".to_string() }),
    ))
}

async fn feedback(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<FeedbackBody>,
) -> Result<Json<AckResponse>, ApiError> {
    let cid = correlation_id(&headers);
    rating_to_accuracy(body.rating).map_err(|error| ApiError::from_app(error, &cid))?;

    let recorded = state
        .history
        .record_feedback(&body.recommendation_id, body.rating, body.comment)
        .await
        .map_err(|error| persistence_error(error, &cid))?;
    if !recorded {
        return Err(ApiError::from_app(
            ApplicationError::NotFound(format!("recommendation {}", body.recommendation_id)),
            &cid,
        ));
    }

    info!(
        event_name = "api.feedback.recorded",
        correlation_id = %cid,
        recommendation_id = %body.recommendation_id,
        rating = body.rating,
        "feedback recorded"
    );
    Ok(Json(AckResponse { success: true, message: "Feedback submitted".to_string() }))
}

async fn stats(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<RecommendationStats>, ApiError> {
    let cid = correlation_id(&headers);
    let stats =
        state.history.stats_by_algorithm().await.map_err(|error| persistence_error(error, &cid))?;
    Ok(Json(stats))
}

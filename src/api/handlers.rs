use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::middleware::RequestId;
use crate::models::{
    RankedTitle, RecommendationQuery, RecommendationResponse, SimilarQuery, StoreStats,
    SuggestQuery, SuggestResponse,
};

use super::AppState;

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Recommend one title for a liked title
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    if params.title.trim().is_empty() {
        return Err(AppError::InvalidInput("title must not be blank".to_string()));
    }

    tracing::info!(
        request_id = %request_id,
        title = %params.title,
        "Processing recommendation request"
    );

    let seed = state.next_seed().await;
    let recommender = state.recommender.clone();
    let query = params.title.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut rng = StdRng::seed_from_u64(seed);
        recommender.recommend(&query, &mut rng)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(RecommendationResponse::new(params.title, result)))
}

/// Ranked titles similar to an exact title
pub async fn similar(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<SimilarQuery>,
) -> AppResult<Json<Vec<RankedTitle>>> {
    if params.limit == 0 {
        return Err(AppError::InvalidInput("limit must be at least 1".to_string()));
    }

    tracing::info!(
        request_id = %request_id,
        title = %params.title,
        limit = params.limit,
        "Processing similar titles request"
    );

    let recommender = state.recommender.clone();
    let title = params.title;
    let mut ranked = tokio::task::spawn_blocking(move || recommender.similar(&title))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    ranked.truncate(params.limit);
    Ok(Json(ranked))
}

/// Closest known title to free text
pub async fn suggest(
    State(state): State<AppState>,
    Query(params): Query<SuggestQuery>,
) -> AppResult<Json<SuggestResponse>> {
    if params.q.trim().is_empty() {
        return Err(AppError::InvalidInput("q must not be blank".to_string()));
    }

    let recommender = state.recommender.clone();
    let query = params.q.clone();
    let suggestion = tokio::task::spawn_blocking(move || recommender.suggest(&query))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(SuggestResponse {
        query: params.q,
        suggestion,
    }))
}

/// Size of the loaded rating store
pub async fn stats(State(state): State<AppState>) -> Json<StoreStats> {
    Json(state.recommender.store().stats())
}

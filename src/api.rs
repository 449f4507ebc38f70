// 🌐 REST API with Axum
//
// GET  /api/health       - liveness + votes cast
// GET  /api/pokemon      - every Pokemon with its tally, id order
// GET  /api/pokemon/:id  - one Pokemon with its tally
// GET  /api/pair         - random matchup for the vote screen
// GET  /api/results      - leaderboard
// POST /api/vote         - { winnerId, loserId }
//
// Store calls are blocking SQLite work, so handlers run them on the
// blocking pool and never stall the async executor.

use crate::catalog::{Catalog, Entity, EntityId};
use crate::error::VoteError;
use crate::store::VoteStore;
use crate::voting::{self, EntityStats, RankedStats, VoteRequest};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub store: VoteStore,
}

impl AppState {
    pub fn new(catalog: Catalog, store: VoteStore) -> Self {
        AppState {
            catalog: Arc::new(catalog),
            store,
        }
    }
}

// ============================================================================
// Response envelope
// ============================================================================

/// `{ success, data?, message?, error? }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn message(message: &str) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.to_string()),
            error: None,
        }
    }

    fn failure(error: String) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error),
        }
    }
}

/// Error side of every handler
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<VoteError> for ApiError {
    fn from(err: VoteError) -> Self {
        match err {
            VoteError::Validation(e) => ApiError::BadRequest(e.to_string()),
            other => {
                tracing::error!(error = %other, "request failed");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(e) => (StatusCode::BAD_REQUEST, e),
            ApiError::NotFound(e) => (StatusCode::NOT_FOUND, e),
            ApiError::Internal(e) => (StatusCode::INTERNAL_SERVER_ERROR, e),
        };
        (status, Json(ApiResponse::failure(error))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Run blocking store work off the async executor
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, VoteError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => {
            tracing::error!(error = %e, "blocking task failed");
            Err(ApiError::Internal("Internal task failure".to_string()))
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub pokemon: usize,
    pub votes_cast: u64,
}

/// GET /api/health
async fn health_check(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    let pokemon = state.catalog.len();
    let votes_cast = blocking(move || state.store.total_votes_cast()).await?;

    Ok(Json(ApiResponse::ok(HealthResponse {
        status: "OK",
        pokemon,
        votes_cast,
    })))
}

/// GET /api/pokemon
async fn get_pokemon(State(state): State<AppState>) -> ApiResult<Vec<EntityStats>> {
    let stats = blocking(move || voting::entities_with_stats(&state.catalog, &state.store)).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// GET /api/pokemon/:id
async fn get_pokemon_by_id(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<EntityStats> {
    let found =
        blocking(move || voting::entity_with_stats(&state.catalog, &state.store, id)).await?;

    match found {
        Some(stats) => Ok(Json(ApiResponse::ok(stats))),
        None => Err(ApiError::NotFound(format!("Pokemon {} not found", id))),
    }
}

/// GET /api/pair
async fn get_pair(State(state): State<AppState>) -> ApiResult<[Entity; 2]> {
    let (first, second) = voting::random_pair(&state.catalog, &mut rand::thread_rng())?;
    Ok(Json(ApiResponse::ok([first.clone(), second.clone()])))
}

/// GET /api/results
async fn get_results(State(state): State<AppState>) -> ApiResult<Vec<RankedStats>> {
    let ranked = blocking(move || voting::ranked_results(&state.catalog, &state.store)).await?;
    Ok(Json(ApiResponse::ok(ranked)))
}

/// POST /api/vote
async fn post_vote(
    State(state): State<AppState>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection, "malformed vote body");
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    blocking(move || voting::submit_vote(&state.catalog, &state.store, &request)).await?;

    Ok(Json(ApiResponse::message("Vote recorded successfully")))
}

// ============================================================================
// Router
// ============================================================================

/// All API routes nested under `/api`, with request tracing and CORS
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/pokemon", get(get_pokemon))
        .route("/pokemon/:id", get(get_pokemon_by_id))
        .route("/pair", get(get_pair))
        .route("/results", get(get_results))
        .route("/vote", post(post_vote))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}

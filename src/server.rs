//! HTTP API.
//!
//! Exposes the aggregation manager and the recommendation engine as a small
//! JSON API. Every request opens its own [`MediaManager`] and drops it before
//! the response is sent, so backend connections never outlive a request.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Service name and version |
//! | `GET`  | `/health` | Reachability per backend |
//! | `POST` | `/search` | Search both backends |
//! | `GET`  | `/emby/libraries` | Emby library names |
//! | `GET`  | `/emby/items?library=&limit=` | Emby items |
//! | `GET`  | `/booklore/books?limit=` | Booklore books |
//! | `GET`  | `/stats` | Collection statistics |
//! | `POST` | `/recommendations` | Generate acquisition suggestions |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_configured` (400),
//! `unavailable` (503), `llm_error` (502).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::manager::MediaManager;
use crate::models::{BackendRecord, Book, CollectionStats, RecommendationSet, Source, VideoItem};
use crate::recommend::RecommendationEngine;

const DEFAULT_PAGE: usize = 100;

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
}

/// Build the router over `config`. Used by [`run_server`] and by tests that
/// serve it on an ephemeral port.
pub fn router(config: Config) -> Router {
    let state = AppState {
        config: Arc::new(config),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/search", post(handle_search))
        .route("/emby/libraries", get(handle_emby_libraries))
        .route("/emby/items", get(handle_emby_items))
        .route("/booklore/books", get(handle_booklore_books))
        .route("/stats", get(handle_stats))
        .route("/recommendations", post(handle_recommendations))
        .layer(cors)
        .with_state(state)
}

/// Bind to `[server].bind` and serve until the process is stopped.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(config.clone());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Collection Helper API listening on http://{}", bind_addr);
    println!("Collection Helper API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    tracing::info!("Shutting down Collection Helper API");
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_configured(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "not_configured",
        message: message.into(),
    }
}

fn unavailable(err: anyhow::Error) -> AppError {
    tracing::error!("Failed to open backend connections: {:#}", err);
    AppError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        code: "unavailable",
        message: format!("{:#}", err),
    }
}

fn connect(state: &AppState) -> Result<MediaManager, AppError> {
    MediaManager::connect(&state.config).map_err(unavailable)
}

fn check_limit(limit: usize) -> Result<usize, AppError> {
    if limit == 0 {
        Err(bad_request("limit must be at least 1"))
    } else {
        Ok(limit)
    }
}

// ============ GET / ============

async fn handle_root() -> Json<Value> {
    Json(json!({
        "message": "Personal Collection Helper API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ============ GET /health ============

/// Reachability per backend. Unconfigured backends report `false`.
#[derive(Serialize, Deserialize, Debug)]
pub struct HealthResponse {
    pub emby: bool,
    pub booklore: bool,
}

async fn handle_health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let manager = connect(&state)?;
    let health = manager.health_all().await;
    Ok(Json(HealthResponse {
        emby: health.get(&Source::Emby).copied().unwrap_or(false),
        booklore: health.get(&Source::Booklore).copied().unwrap_or(false),
    }))
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default = "yes")]
    emby: bool,
    #[serde(default = "yes")]
    booklore: bool,
}

fn yes() -> bool {
    true
}

#[derive(Serialize)]
struct SearchResponse {
    query: String,
    results: BTreeMap<Source, Vec<BackendRecord>>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let mut sources = Vec::new();
    if req.emby {
        sources.push(Source::Emby);
    }
    if req.booklore {
        sources.push(Source::Booklore);
    }

    let manager = connect(&state)?;
    let results = manager.search_all(&req.query, &sources).await;
    Ok(Json(SearchResponse {
        query: req.query,
        results,
    }))
}

// ============ GET /emby/* ============

async fn handle_emby_libraries(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let manager = connect(&state)?;
    let libraries = manager
        .list_groupings()
        .await
        .remove(&Source::Emby)
        .unwrap_or_default();
    Ok(Json(json!({ "libraries": libraries })))
}

#[derive(Deserialize)]
struct ItemsQuery {
    library: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct ItemsResponse {
    items: Vec<VideoItem>,
    count: usize,
}

async fn handle_emby_items(
    State(state): State<AppState>,
    Query(q): Query<ItemsQuery>,
) -> Result<Json<ItemsResponse>, AppError> {
    let limit = check_limit(q.limit.unwrap_or(DEFAULT_PAGE))?;
    let manager = connect(&state)?;
    let items = manager.list_items(q.library.as_deref(), limit).await;
    Ok(Json(ItemsResponse {
        count: items.len(),
        items,
    }))
}

// ============ GET /booklore/books ============

#[derive(Deserialize)]
struct BooksQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct BooksResponse {
    books: Vec<Book>,
    count: usize,
}

async fn handle_booklore_books(
    State(state): State<AppState>,
    Query(q): Query<BooksQuery>,
) -> Result<Json<BooksResponse>, AppError> {
    let limit = check_limit(q.limit.unwrap_or(DEFAULT_PAGE))?;
    let manager = connect(&state)?;
    let books = manager.list_books(limit).await;
    Ok(Json(BooksResponse {
        count: books.len(),
        books,
    }))
}

// ============ GET /stats ============

async fn handle_stats(State(state): State<AppState>) -> Result<Json<CollectionStats>, AppError> {
    let manager = connect(&state)?;
    Ok(Json(manager.collection_stats().await))
}

// ============ POST /recommendations ============

#[derive(Deserialize, Default)]
struct RecommendationRequest {
    count: Option<usize>,
    preferences: Option<String>,
}

async fn handle_recommendations(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RecommendationSet>, AppError> {
    // An empty body means all defaults.
    let req: RecommendationRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RecommendationRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| bad_request(format!("invalid request body: {}", e)))?
    };
    let Some(llm) = &state.config.llm else {
        return Err(not_configured("no [llm] section configured"));
    };
    let count = req.count.unwrap_or(state.config.recommendations.count);
    if count == 0 {
        return Err(bad_request("count must be at least 1"));
    }

    let engine = RecommendationEngine::from_config(llm).map_err(unavailable)?;
    let manager = connect(&state)?;
    let set = engine
        .generate_daily(
            &manager,
            count,
            state.config.recommendations.fetch_limit,
            req.preferences.as_deref(),
        )
        .await
        .map_err(|e| {
            tracing::error!("Recommendation generation failed: {:#}", e);
            AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "llm_error",
                message: format!("{:#}", e),
            }
        })?;
    Ok(Json(set))
}

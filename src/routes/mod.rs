use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::Config,
    middleware::{make_span_with_request_id, request_id_middleware},
    services::{providers::BookAiProvider, staleness::StalenessPolicy, RecommendationService},
    store::RecommendationStore,
};

pub mod books;
pub mod library;
pub mod recommendations;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn BookAiProvider>,
    pub recommendations: Arc<RecommendationService>,
    pub search_result_limit: usize,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn BookAiProvider>,
        store: Arc<dyn RecommendationStore>,
        config: &Config,
    ) -> Self {
        let recommendations = RecommendationService::new(
            Arc::clone(&provider),
            store,
            StalenessPolicy::new(config.freshness_window()),
            config.max_recommendations,
        );

        Self {
            provider,
            recommendations: Arc::new(recommendations),
            search_result_limit: config.search_result_limit,
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/library", put(library::library_loaded))
        .route("/recommendations", get(recommendations::view))
        .route("/recommendations/refresh", post(recommendations::refresh))
        .route("/recommendations/chat", post(recommendations::chat))
        .route("/books/search", get(books::search))
        .route("/books/summary", post(books::summarize))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::UserId,
    models::{BookDetails, BookSearchResult, BookSummary},
    routes::AppState,
    services::book_search,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
}

/// Handler for book search endpoint
pub async fn search(
    State(state): State<Arc<AppState>>,
    _user_id: UserId,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<BookSearchResult>>> {
    let books = book_search::search_books(
        state.provider.clone(),
        &params.q,
        state.search_result_limit,
    )
    .await?;
    Ok(Json(books))
}

/// Handler for single-book summaries
pub async fn summarize(
    State(state): State<Arc<AppState>>,
    _user_id: UserId,
    Json(details): Json<BookDetails>,
) -> AppResult<Json<BookSummary>> {
    let summary = book_search::summarize_book(state.provider.clone(), &details).await?;
    Ok(Json(summary))
}

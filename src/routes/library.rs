use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    middleware::UserId,
    models::{BookList, RecommendationView},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryUpdate {
    #[serde(default)]
    pub private_lists: Vec<BookList>,
    #[serde(default)]
    pub public_lists: Vec<BookList>,
}

/// Handler called once the client has loaded the user's lists
pub async fn library_loaded(
    State(state): State<Arc<AppState>>,
    user_id: UserId,
    Json(update): Json<LibraryUpdate>,
) -> Json<RecommendationView> {
    tracing::info!(
        private_lists = update.private_lists.len(),
        public_lists = update.public_lists.len(),
        "Library loaded"
    );

    let view = state
        .recommendations
        .library_loaded(user_id.as_str(), &update.private_lists, &update.public_lists)
        .await;

    Json(view)
}

use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::UserId,
    models::{ChatReply, ChatTurn, RecommendationView},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub preferences: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    pub message: String,
}

/// Handler for the current recommendation view
pub async fn view(State(state): State<Arc<AppState>>, user_id: UserId) -> Json<RecommendationView> {
    Json(state.recommendations.view(user_id.as_str()).await)
}

/// Handler for an explicit refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    user_id: UserId,
) -> Json<RecommendationView> {
    Json(state.recommendations.refresh(user_id.as_str()).await)
}

/// Handler for the recommendation chatbot
pub async fn chat(
    State(state): State<Arc<AppState>>,
    user_id: UserId,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatReply>> {
    let reply = state
        .recommendations
        .chat(
            user_id.as_str(),
            &request.preferences,
            &request.history,
            &request.message,
        )
        .await?;
    Ok(Json(reply))
}

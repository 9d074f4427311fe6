//! Read-only HTTP endpoints next to the WebSocket

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;
use crate::types::CategoryGroup;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub rooms: usize,
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        rooms: state.room_count().await,
    })
}

/// GET /api/categories
///
/// The word bank's category groups, as shown in the lobby
pub async fn list_categories(State(state): State<Arc<AppState>>) -> Json<Vec<CategoryGroup>> {
    Json(state.words.groups().to_vec())
}

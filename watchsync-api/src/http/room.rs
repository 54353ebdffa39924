//! Read-only room endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use watchsync_core::models::{RoomId, RoomSnapshot};

use crate::http::error::AppResult;
use crate::http::AppState;

pub fn create_room_router() -> Router<AppState> {
    Router::new().route("/api/rooms/{room_id}", get(get_room))
}

/// GET /api/rooms/{room_id} - current room state, playback resolved to now
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> AppResult<Json<RoomSnapshot>> {
    let snapshot = state
        .room_service
        .snapshot(&RoomId::from_string(room_id))?;
    Ok(Json(snapshot))
}

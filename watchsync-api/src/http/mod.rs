//! HTTP router and shared handler state

pub mod drive_proxy;
pub mod error;
pub mod health;
pub mod media;
pub mod room;
pub mod upload;
pub mod websocket;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use watchsync_core::service::RoomService;
use watchsync_core::Config;

pub use error::{AppError, AppResult};

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub room_service: Arc<RoomService>,
    pub config: Arc<Config>,
    pub http_client: reqwest::Client,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("room_service", &self.room_service)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(room_service: Arc<RoomService>, config: Arc<Config>) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.proxy.user_agent.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;
        Ok(Self {
            room_service,
            config,
            http_client,
        })
    }
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .merge(health::create_health_router())
        .merge(websocket::create_websocket_router())
        .merge(room::create_room_router())
        .merge(upload::create_upload_router(state.config.media.max_upload_bytes))
        .merge(media::create_media_router())
        .merge(drive_proxy::create_drive_proxy_router());

    // Any origin may connect, as browsers embed players from anywhere
    let router = router
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    router.with_state(state)
}

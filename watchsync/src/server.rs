use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};
use watchsync_api::{create_router, AppState};
use watchsync_core::clock::SystemClock;
use watchsync_core::eviction::{spawn_sweeper, IdleTtl};
use watchsync_core::registry::RoomRegistry;
use watchsync_core::service::RoomService;
use watchsync_core::Config;
use watchsync_hub::RoomMessageHub;

/// Process-lifetime wiring of the registry, hub, room service and HTTP server
pub struct WatchSyncServer {
    config: Arc<Config>,
    registry: Arc<RoomRegistry>,
    hub: Arc<RoomMessageHub>,
    room_service: Arc<RoomService>,
}

impl WatchSyncServer {
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(RoomRegistry::new(Arc::new(SystemClock)));
        let hub = Arc::new(RoomMessageHub::new());
        let room_service = Arc::new(RoomService::new(registry.clone(), hub.clone()));
        Self {
            config: Arc::new(config),
            registry,
            hub,
            room_service,
        }
    }

    pub async fn run(self) -> Result<()> {
        tokio::fs::create_dir_all(&self.config.media.upload_dir)
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "Failed to create upload directory {}: {e}",
                    self.config.media.upload_dir
                )
            })?;

        let sweeper = self.config.rooms.idle_ttl().map(|ttl| {
            info!(idle_ttl_secs = ttl.as_secs(), "Idle room eviction enabled");
            spawn_sweeper(
                self.registry.clone(),
                Arc::new(IdleTtl::new(ttl)),
                self.config.rooms.sweep_interval(),
            )
        });

        let state = AppState::new(self.room_service.clone(), self.config.clone())?;
        let router = create_router(state);

        let http_addr = self.config.http_address();
        let listener = tokio::net::TcpListener::bind(&http_addr)
            .await
            .map_err(|e| {
                error!("Failed to bind HTTP address {}: {}", http_addr, e);
                anyhow::anyhow!("Failed to bind {http_addr}: {e}")
            })?;
        info!("HTTP server listening on {}", http_addr);

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }
        info!(
            rooms = self.registry.len(),
            connections = self.hub.connection_count(),
            "HTTP server shut down"
        );

        served.map_err(|e| anyhow::anyhow!("HTTP server error: {e}"))
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C, starting graceful shutdown"); }
        () = terminate => { info!("Received SIGTERM, starting graceful shutdown"); }
    }
}

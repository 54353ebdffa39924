mod server;

use anyhow::Result;
use tracing::info;
use watchsync_core::{logging, Config};

use server::WatchSyncServer;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = Config::load_default()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;

    // 2. Validate configuration (fail fast on misconfigurations)
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("Config validation error: {e}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s)",
            errors.len()
        ));
    }

    // 3. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("WatchSync server starting...");
    info!("HTTP address: {}", config.http_address());

    // 4. Serve until a shutdown signal arrives
    WatchSyncServer::new(config).run().await
}

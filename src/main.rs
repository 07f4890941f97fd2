//! Digit Duel Server
//!
//! Coordinates real-time two-player number duels over WebSocket.
//! Configuration comes from `DUEL_*` environment variables.

use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use digit_duel::{GameServer, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = ServerConfig::from_env();

    info!("Digit Duel Server v{}", VERSION);
    info!("Host: {}", config.host);
    info!("Probing ports from {}", config.start_port);
    info!("Wait window: {:?}", config.wait_window);

    let server = GameServer::new(config);
    server.run().await?;

    Ok(())
}

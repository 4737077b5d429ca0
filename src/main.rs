use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use agrigpt::{build_state, config::Config, create_router, utils::init_logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    // Create shared state
    let state = build_state(config).await?;

    // Create router
    let app = create_router(state);

    // Start server
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

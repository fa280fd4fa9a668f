use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use plinko_server::{router, AppState, Engine, ServerConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env();
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid listen addr")?;
    if config.admin_password.is_empty() {
        info!("moderation secret unset; admin actions disabled");
    }

    let state = AppState {
        engine: Arc::new(Mutex::new(Engine::new(config))),
    };
    let app = router(state);

    info!(%addr, "plinko table service listening");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}

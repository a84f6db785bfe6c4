use std::net::SocketAddr;

use common::storage::build_blob_store;
use server::config::AppConfig;
use server::database::init_db;
use server::state::AppState;
use tracing::{Level, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;

    let blob_store = build_blob_store(&config.storage).await?;
    let db = init_db(&config.database).await?;

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let state = AppState {
        db,
        blob_store,
        config,
    };

    let app = server::build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

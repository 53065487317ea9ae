use std::net::SocketAddr;

use anyhow::Context;
use fedspend::config::Settings;
use fedspend::download::FileStore;
use fedspend::{create_app, AppState};
use sea_orm::Database;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let settings = Settings::from_env()?;
    let db = Database::connect(&settings.database_url)
        .await
        .context("failed to connect to database")?;
    let store = FileStore::from_settings(&settings).await?;
    tokio::fs::create_dir_all(store.dir())
        .await
        .with_context(|| format!("cannot create {}", store.dir().display()))?;

    let bind_addr = settings.bind_addr.clone();
    let app = create_app(AppState::new(db, settings, store));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", bind_addr))?;
    tracing::info!("Server running on http://{}", bind_addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

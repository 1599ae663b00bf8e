//! agrinews - Bilingual corporate site CMS backend

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agrinews::{
    api::{self, AppState},
    cache::{create_cache, create_session_store},
    config::Config,
    db,
    services::build_mailer,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agrinews=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting agrinews...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    config.validate()?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Key-value stores for detail documents and refresh tokens
    let cache = create_cache(&config.cache).await?;
    let sessions = create_session_store(&config.cache).await?;
    tracing::info!("Cache initialized: {:?}", config.cache.driver);

    let mailer = build_mailer(&config.mail)?;

    tokio::fs::create_dir_all(&config.upload.path).await?;

    let state = AppState::new(pool, cache, sessions, mailer, &config);
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

//! Scooter Rental Server - Main Application Entry Point
//!
//! A REST API backend for a scooter rental marketplace: shops list scooters
//! and insurance, riders book them, and staff walk riders through an
//! onboarding workflow at pickup.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries, embedded migrations)
//! - **Authentication**: Argon2 password hashes, bearer session tokens stored as SHA-256
//! - **Format**: JSON requests/responses, multipart uploads
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Start the onboarding expiry sweeper
//! 5. Build HTTP router and start server on configured port

mod app;
mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod state;
#[cfg(test)]
mod test_support;

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::services::onboarding_service::OnboardingExpirySweeper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    OnboardingExpirySweeper::spawn(
        pool.clone(),
        Duration::from_secs(config.onboarding_sweep_interval_secs.max(1)),
    );

    let addr = format!("0.0.0.0:{}", config.server_port);
    let app = app::build_router(state::AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

//! Local development server

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hackmate_app::{create_app, AppComponents};
use hackmate_common::Config;
use hackmate_teams::Repositories;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{},sqlx=warn", config.log_level))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let repos = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("../../migrations").run(&pool).await?;
            tracing::info!("Using Postgres storage backend");
            Repositories::postgres(pool)
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory storage backend");
            Repositories::memory()
        }
    };

    let notifier = Arc::from(hackmate_notify::notifier_from_env().await);

    let app = create_app(AppComponents {
        repos,
        notifier,
        jwt_secret: config.jwt_secret.clone(),
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Hackmate listening");
    axum::serve(listener, app).await?;
    Ok(())
}

use anyhow::{Context, Result};
use tracing::info;

use evently_api::{app, config, middleware};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = config::Config::load()?;

    middleware::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;
    middleware::init_metrics().context("failed to install Prometheus recorder")?;

    info!("Starting Evently API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&(&config.database).into()).await?;

    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    if config.seed.demo_events {
        let inserted = persistence::seed::seed_demo_events(
            &pool,
            &config.seed.owner_email,
            &config.seed.owner_name,
        )
        .await
        .context("failed to seed demo events")?;
        info!(inserted, owner = %config.seed.owner_email, "Demo seed finished");
    }

    let addr = config.socket_addr()?;
    let app = app::create_app(config, pool)?;

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use shared_config::AppConfig;

/// Build the shared Postgres pool from application configuration.
///
/// The pool is created once at startup and handed to every cell; all
/// booking-engine safety properties reduce to the transaction isolation
/// this connection provides.
pub async fn connect(config: &AppConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_db_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    info!("Database pool ready ({} connections max)", config.max_db_connections);
    Ok(pool)
}

/// Apply bundled migrations. Used by the binary on startup and by
/// DB-backed integration tests against a scratch database.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../../migrations")
        .run(pool)
        .await
        .context("failed to run database migrations")?;
    Ok(())
}

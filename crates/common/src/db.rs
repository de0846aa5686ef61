//! Postgres connection for `USER_STORE=postgres`.

use anyhow::Context;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::AppConfig;

/// Connect to `DATABASE_URL` and bring the `users` table up to date.
pub async fn connect_user_store(config: &AppConfig) -> anyhow::Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required when USER_STORE=postgres")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(database_url)
        .await
        .context("Cannot reach the user database")?;

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("Failed to migrate the users table")?;

    tracing::info!(
        max_connections = config.db_max_connections,
        collection = %config.users_collection,
        "User records will be read from PostgreSQL"
    );
    Ok(pool)
}

//! Users table reader for deployments that keep user records in PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;

use busalert_common::error::AppError;
use busalert_common::types::UserRecord;

use crate::UserDirectory;

pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn list_users(&self) -> Result<Vec<UserRecord>, AppError> {
        let users: Vec<UserRecord> =
            sqlx::query_as("SELECT id, fcm_token FROM users ORDER BY created_at, id")
                .fetch_all(&self.pool)
                .await?;

        tracing::debug!(users = users.len(), "Listed user records");
        Ok(users)
    }
}

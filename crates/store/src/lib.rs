pub mod firestore;
pub mod postgres;

use async_trait::async_trait;

use busalert_common::error::AppError;
use busalert_common::types::UserRecord;

/// Read access to the full set of user records.
///
/// Implementations return every record in the store's natural order, without
/// filtering; callers decide which records carry a usable push token.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_users(&self) -> Result<Vec<UserRecord>, AppError>;
}

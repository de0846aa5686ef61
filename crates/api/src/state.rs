//! Shared application state for the Axum server.

use std::sync::Arc;
use std::time::Duration;

use busalert_common::config::{AppConfig, UserStoreKind};
use busalert_common::db::connect_user_store;
use busalert_common::google_auth::{firestore_tokens, messaging_tokens};
use busalert_notifier::{FcmGateway, IssueNotifier};
use busalert_store::UserDirectory;
use busalert_store::firestore::FirestoreUserDirectory;
use busalert_store::postgres::PgUserDirectory;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub notifier: IssueNotifier,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(notifier: IssueNotifier, config: AppConfig) -> Self {
        Self {
            notifier,
            config: Arc::new(config),
        }
    }

    /// Build the process-wide clients (HTTP, user store, FCM) once at startup.
    ///
    /// Google credentials are resolved lazily on the first request that needs them.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let users: Arc<dyn UserDirectory> = match config.user_store {
            UserStoreKind::Firestore => {
                tracing::info!(
                    collection = %config.users_collection,
                    base_url = %config.firestore_base_url(),
                    "Reading users from Firestore"
                );
                Arc::new(FirestoreUserDirectory::new(
                    http.clone(),
                    firestore_tokens(&config),
                    &config,
                ))
            }
            UserStoreKind::Postgres => {
                let pool = connect_user_store(&config).await?;
                Arc::new(PgUserDirectory::new(pool))
            }
        };

        let gateway = Arc::new(FcmGateway::new(http, messaging_tokens(&config), &config));

        Ok(Self::new(IssueNotifier::new(users, gateway), config))
    }
}

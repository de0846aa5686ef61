//! OAuth2 access tokens for Google APIs (Firestore REST and FCM HTTP v1).
//!
//! Firestore and FCM each hold their own `AccessTokenSource`. Real credentials
//! are resolved through `gcp_auth`: an explicit service account key file, or
//! Application Default Credentials (the Cloud Run metadata server, gcloud).
//! `gcp_auth` caches tokens per scope set and refreshes them before expiry.
//! The Firestore emulator accepts a fixed bearer instead. FCM has no emulator,
//! so the messaging source never uses it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use gcp_auth::CustomServiceAccount;
use tokio::sync::OnceCell;

use crate::config::AppConfig;
use crate::error::AppError;

pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
pub const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Bearer accepted by the Firestore emulator.
pub const EMULATOR_TOKEN: &str = "owner";

/// Supplies bearer tokens to one Google API client.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// A bearer token, fetched or refreshed if the cached one is near expiry.
    async fn access_token(&self) -> Result<String, AppError>;

    /// Called after the API rejected a token, before asking for another one.
    async fn invalidate(&self) {}
}

/// Google credentials for a fixed set of scopes, resolved on first use.
pub struct GoogleCredentials {
    key_path: Option<PathBuf>,
    scopes: &'static [&'static str],
    provider: OnceCell<Arc<dyn gcp_auth::TokenProvider>>,
}

impl GoogleCredentials {
    pub fn new(key_path: Option<PathBuf>, scopes: &'static [&'static str]) -> Self {
        Self {
            key_path,
            scopes,
            provider: OnceCell::new(),
        }
    }

    async fn provider(&self) -> Result<&Arc<dyn gcp_auth::TokenProvider>, AppError> {
        self.provider
            .get_or_try_init(|| resolve_provider(self.key_path.as_deref()))
            .await
    }
}

async fn resolve_provider(
    key_path: Option<&Path>,
) -> Result<Arc<dyn gcp_auth::TokenProvider>, AppError> {
    match key_path {
        Some(path) => {
            let account = CustomServiceAccount::from_file(path).map_err(|e| {
                AppError::Credentials(format!(
                    "Invalid service account key {}: {}",
                    path.display(),
                    e
                ))
            })?;
            tracing::info!(key = %path.display(), "Using service account key");
            Ok(Arc::new(account))
        }
        None => {
            let provider = gcp_auth::provider().await.map_err(|e| {
                AppError::Credentials(format!("No application default credentials: {}", e))
            })?;
            tracing::info!("Using application default credentials");
            Ok(provider)
        }
    }
}

#[async_trait]
impl AccessTokenSource for GoogleCredentials {
    async fn access_token(&self) -> Result<String, AppError> {
        let token = self
            .provider()
            .await?
            .token(self.scopes)
            .await
            .map_err(|e| AppError::Credentials(format!("Failed to obtain access token: {}", e)))?;
        Ok(token.as_str().to_string())
    }
}

/// A bearer that never changes, for emulators.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn emulator() -> Self {
        Self::new(EMULATOR_TOKEN)
    }
}

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, AppError> {
        Ok(self.0.clone())
    }
}

/// Token source for Firestore reads.
pub fn firestore_tokens(config: &AppConfig) -> Arc<dyn AccessTokenSource> {
    if config.firestore_emulator_host.is_some() {
        tracing::info!("Firestore emulator configured, using emulator bearer token");
        return Arc::new(StaticToken::emulator());
    }
    Arc::new(GoogleCredentials::new(
        config.credentials_path.clone(),
        &[DATASTORE_SCOPE],
    ))
}

/// Token source for FCM sends. Ignores `FIRESTORE_EMULATOR_HOST`.
pub fn messaging_tokens(config: &AppConfig) -> Arc<dyn AccessTokenSource> {
    Arc::new(GoogleCredentials::new(
        config.credentials_path.clone(),
        &[MESSAGING_SCOPE],
    ))
}

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where user records (and their push tokens) are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStoreKind {
    Firestore,
    Postgres,
}

impl std::str::FromStr for UserStoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "firestore" => Ok(UserStoreKind::Firestore),
            "postgres" | "postgresql" => Ok(UserStoreKind::Postgres),
            other => Err(anyhow::anyhow!(
                "USER_STORE must be 'firestore' or 'postgres', got '{}'",
                other
            )),
        }
    }
}

/// Log output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Firebase / Google Cloud project id
    pub project_id: String,

    /// HTTP listen port (Cloud Run injects `PORT`)
    pub port: u16,

    /// Collection whose document creations trigger a broadcast
    pub issues_collection: String,

    /// Collection holding user records with `fcmToken`
    pub users_collection: String,

    /// Backend the user directory reads from
    pub user_store: UserStoreKind,

    /// PostgreSQL connection string (only for `USER_STORE=postgres`)
    pub database_url: Option<String>,

    /// Maximum number of PostgreSQL connections in the pool (default: 5)
    pub db_max_connections: u32,

    /// Firestore database id
    pub firestore_database: String,

    /// `host:port` of a Firestore emulator; switches to plain HTTP and a static token
    pub firestore_emulator_host: Option<String>,

    /// Page size for listing the users collection
    pub firestore_page_size: u32,

    /// FCM HTTP v1 base URL
    pub fcm_endpoint: String,

    /// Path to a service account JSON key
    pub credentials_path: Option<PathBuf>,

    /// Maximum accepted CloudEvent body size in bytes
    pub event_body_limit_bytes: usize,

    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let project_id = var("GOOGLE_CLOUD_PROJECT")
            .or_else(|| var("GCLOUD_PROJECT"))
            .ok_or_else(|| {
                anyhow::anyhow!("GOOGLE_CLOUD_PROJECT environment variable is required")
            })?;

        let user_store: UserStoreKind = var("USER_STORE")
            .unwrap_or_else(|| "firestore".to_string())
            .parse()?;

        let database_url = var("DATABASE_URL");
        if user_store == UserStoreKind::Postgres && database_url.is_none() {
            return Err(anyhow::anyhow!(
                "DATABASE_URL environment variable is required when USER_STORE=postgres"
            ));
        }

        let log_format = match var("LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(anyhow::anyhow!(
                    "LOG_FORMAT must be 'pretty' or 'json', got '{}'",
                    other
                ));
            }
        };

        Ok(Self {
            project_id,
            port: var("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid u16"))?,
            issues_collection: var("ISSUES_COLLECTION").unwrap_or_else(|| "issues".to_string()),
            users_collection: var("USERS_COLLECTION").unwrap_or_else(|| "users".to_string()),
            user_store,
            database_url,
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            firestore_database: var("FIRESTORE_DATABASE")
                .unwrap_or_else(|| "(default)".to_string()),
            firestore_emulator_host: var("FIRESTORE_EMULATOR_HOST"),
            firestore_page_size: var("FIRESTORE_PAGE_SIZE")
                .unwrap_or_else(|| "300".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("FIRESTORE_PAGE_SIZE must be a valid u32"))?,
            fcm_endpoint: var("FCM_ENDPOINT")
                .unwrap_or_else(|| "https://fcm.googleapis.com".to_string()),
            credentials_path: var("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from),
            event_body_limit_bytes: var("EVENT_BODY_LIMIT_BYTES")
                .unwrap_or_else(|| "1048576".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("EVENT_BODY_LIMIT_BYTES must be a valid usize"))?,
            log_format,
        })
    }

    /// Base URL for Firestore REST calls.
    pub fn firestore_base_url(&self) -> String {
        match &self.firestore_emulator_host {
            Some(host) => format!("http://{}", host),
            None => "https://firestore.googleapis.com".to_string(),
        }
    }
}

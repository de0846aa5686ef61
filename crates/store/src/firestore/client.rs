//! Users collection reader over the Firestore REST API.
//!
//! Lists `{users_collection}` page by page (`pageSize` / `pageToken`) until the
//! server stops returning a `nextPageToken`, preserving server order.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use busalert_common::config::AppConfig;
use busalert_common::error::AppError;
use busalert_common::google_auth::AccessTokenSource;
use busalert_common::types::UserRecord;

use super::document::Document;
use crate::UserDirectory;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>,
}

/// `UserDirectory` backed by a Firestore collection.
pub struct FirestoreUserDirectory {
    http: reqwest::Client,
    tokens: Arc<dyn AccessTokenSource>,
    collection_url: String,
    collection: String,
    page_size: u32,
}

impl FirestoreUserDirectory {
    pub fn new(http: reqwest::Client, tokens: Arc<dyn AccessTokenSource>, config: &AppConfig) -> Self {
        let collection_url = format!(
            "{}/v1/projects/{}/databases/{}/documents/{}",
            config.firestore_base_url(),
            config.project_id,
            config.firestore_database,
            config.users_collection
        );

        Self {
            http,
            tokens,
            collection_url,
            collection: config.users_collection.clone(),
            page_size: config.firestore_page_size.max(1),
        }
    }

    async fn fetch_page(&self, page_token: Option<&str>) -> Result<ListDocumentsResponse, AppError> {
        let token = self.tokens.access_token().await?;

        let mut request = self
            .http
            .get(&self.collection_url)
            .bearer_auth(token)
            .query(&[("pageSize", self.page_size.to_string())]);
        if let Some(page_token) = page_token {
            request = request.query(&[("pageToken", page_token)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Store(format!(
                "Listing '{}' returned {}: {}",
                self.collection, status, body
            )));
        }

        response.json().await.map_err(|e| {
            AppError::Store(format!("Malformed list response for '{}': {}", self.collection, e))
        })
    }
}

#[async_trait]
impl UserDirectory for FirestoreUserDirectory {
    async fn list_users(&self) -> Result<Vec<UserRecord>, AppError> {
        let mut users = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let page = self.fetch_page(page_token.as_deref()).await?;
            pages += 1;

            users.extend(page.documents.iter().map(|doc| {
                UserRecord::from_fields(doc.id().unwrap_or_default(), &doc.field_map())
            }));

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        tracing::debug!(
            collection = %self.collection,
            users = users.len(),
            pages,
            "Listed user records"
        );
        Ok(users)
    }
}

//! Firebase Cloud Messaging HTTP v1 gateway.
//!
//! FCM v1 accepts one token per request, so a dispatch posts one
//! `messages:send` request per token, in order. Every request asks the token
//! source for its bearer, so a long fan-out picks up refreshed tokens. A 401 is
//! retried once with a fresh bearer. Refusals that concern a single token
//! (unregistered, invalid, quota) are recorded in the response. Failures that
//! would hit every token (transport errors, credentials rejected twice) abort
//! the dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use busalert_common::config::AppConfig;
use busalert_common::error::AppError;
use busalert_common::google_auth::AccessTokenSource;
use busalert_common::types::NotificationPayload;

use crate::gateway::{MessagingResponse, PushGateway, SendError, SendResult};

#[derive(Debug, Deserialize)]
struct SendResponse {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    status: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDetail {
    error_code: Option<String>,
}

/// Shorten a token for logs.
fn token_prefix(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(8)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    &token[..end]
}

/// Build the v1 request body for one token.
pub fn message_body(token: &str, payload: &NotificationPayload) -> serde_json::Value {
    json!({
        "message": {
            "token": token,
            "notification": {
                "title": payload.notification.title,
                "body": payload.notification.body,
            },
            "data": payload.data,
        }
    })
}

/// Classify a non-2xx FCM response.
///
/// Returns `Err` when the failure is not specific to the token.
pub fn classify_failure(status: StatusCode, body: &str) -> Result<SendError, AppError> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let error = envelope.error;

    // The FCM-specific code in `details` is more precise than the canonical status.
    let code = error
        .details
        .iter()
        .find_map(|d| d.error_code.clone())
        .or_else(|| error.status.clone());

    let send_error = match code.as_deref() {
        Some("UNREGISTERED") | Some("NOT_FOUND") => SendError::Unregistered,
        Some("INVALID_ARGUMENT") => SendError::InvalidArgument {
            message: error.message,
        },
        Some("SENDER_ID_MISMATCH") => SendError::SenderIdMismatch,
        Some("QUOTA_EXCEEDED") | Some("RESOURCE_EXHAUSTED") => SendError::QuotaExceeded,
        Some("UNAVAILABLE") => SendError::Unavailable,
        Some("INTERNAL") => SendError::Internal,
        Some("THIRD_PARTY_AUTH_ERROR") => SendError::ThirdPartyAuth,
        _ if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN => {
            return Err(AppError::Gateway(format!(
                "FCM rejected credentials ({}): {}",
                status, error.message
            )));
        }
        _ => SendError::Unknown {
            code: status.as_u16(),
            status: code.clone(),
        },
    };

    Ok(send_error)
}

/// `PushGateway` that talks to FCM's HTTP v1 API.
pub struct FcmGateway {
    http: reqwest::Client,
    tokens: Arc<dyn AccessTokenSource>,
    send_url: String,
}

impl FcmGateway {
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<dyn AccessTokenSource>,
        config: &AppConfig,
    ) -> Self {
        let send_url = format!(
            "{}/v1/projects/{}/messages:send",
            config.fcm_endpoint.trim_end_matches('/'),
            config.project_id
        );
        Self {
            http,
            tokens,
            send_url,
        }
    }

    async fn post_message(
        &self,
        token: &str,
        payload: &NotificationPayload,
    ) -> Result<reqwest::Response, AppError> {
        let bearer = self.tokens.access_token().await?;
        self.http
            .post(&self.send_url)
            .bearer_auth(bearer)
            .json(&message_body(token, payload))
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("FCM request failed: {}", e)))
    }

    async fn send_one(
        &self,
        token: &str,
        payload: &NotificationPayload,
    ) -> Result<Result<String, SendError>, AppError> {
        let mut response = self.post_message(token, payload).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::info!(
                token_prefix = token_prefix(token),
                "FCM rejected the access token, retrying with a fresh one"
            );
            self.tokens.invalidate().await;
            response = self.post_message(token, payload).await?;
        }

        let status = response.status();
        if status.is_success() {
            let sent: SendResponse = response
                .json()
                .await
                .map_err(|e| AppError::Gateway(format!("Malformed FCM response: {}", e)))?;
            return Ok(Ok(sent.name));
        }

        let body = response.text().await.unwrap_or_default();
        let send_error = classify_failure(status, &body)?;
        tracing::warn!(
            token_prefix = token_prefix(token),
            error = %send_error,
            "FCM refused token"
        );
        Ok(Err(send_error))
    }
}

#[async_trait]
impl PushGateway for FcmGateway {
    async fn send_to_devices(
        &self,
        tokens: &[String],
        payload: &NotificationPayload,
    ) -> Result<MessagingResponse, AppError> {
        let mut results = Vec::with_capacity(tokens.len());
        for token in tokens {
            let outcome = self.send_one(token, payload).await?;
            results.push(SendResult {
                token: token.clone(),
                outcome,
            });
        }

        Ok(MessagingResponse { results })
    }
}

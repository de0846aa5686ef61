//! CloudEvent extraction for Firestore document triggers.
//!
//! Eventarc delivers events over HTTP in either CloudEvents mode:
//! - binary: attributes in `ce-*` headers, `DocumentEventData` JSON as the body
//! - structured: `Content-Type: application/cloudevents+json`, attributes and
//!   `data` in one JSON envelope
//!
//! Only the JSON encoding of `DocumentEventData` is accepted.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::HeaderMap;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use busalert_common::error::AppError;
use busalert_store::firestore::Document;

/// `type` of a Firestore document-created event.
pub const DOCUMENT_CREATED: &str = "google.cloud.firestore.document.v1.created";

const STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json";

/// Payload of Firestore document events.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEventData {
    /// The document after the change; set for created events
    pub value: Option<Document>,
    pub old_value: Option<Document>,
}

/// A Firestore trigger event, independent of its HTTP encoding.
#[derive(Debug, Clone)]
pub struct CloudEvent {
    pub id: String,
    pub source: String,
    pub event_type: String,
    /// e.g. `documents/issues/abc123`
    pub subject: Option<String>,
    pub data: DocumentEventData,
}

#[derive(Debug, Deserialize)]
struct StructuredEvent {
    id: String,
    source: String,
    #[serde(rename = "type")]
    event_type: String,
    subject: Option<String>,
    #[serde(default)]
    data: Option<DocumentEventData>,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn required_header(headers: &HeaderMap, name: &str) -> Result<String, AppError> {
    header(headers, name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Event(format!("missing '{}' header", name)))
}

impl CloudEvent {
    fn from_binary(headers: &HeaderMap, body: &[u8]) -> Result<Self, AppError> {
        let data = serde_json::from_slice(body)
            .map_err(|e| AppError::Event(format!("undecodable event data: {}", e)))?;

        Ok(Self {
            id: required_header(headers, "ce-id")?,
            source: required_header(headers, "ce-source")?,
            event_type: required_header(headers, "ce-type")?,
            subject: header(headers, "ce-subject"),
            data,
        })
    }

    fn from_structured(body: &[u8]) -> Result<Self, AppError> {
        let envelope: StructuredEvent = serde_json::from_slice(body)
            .map_err(|e| AppError::Event(format!("undecodable CloudEvent envelope: {}", e)))?;

        Ok(Self {
            id: envelope.id,
            source: envelope.source,
            event_type: envelope.event_type,
            subject: envelope.subject,
            data: envelope.data.unwrap_or_default(),
        })
    }
}

impl<S> FromRequest<S> for CloudEvent
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let headers = req.headers().clone();
        let structured = header(&headers, CONTENT_TYPE.as_str())
            .is_some_and(|ct| ct.starts_with(STRUCTURED_CONTENT_TYPE));

        let body = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let event = if structured {
            Self::from_structured(&body)
        } else {
            Self::from_binary(&headers, &body)
        };

        event.map_err(|e| {
            tracing::warn!(error = %e, "Rejected CloudEvent");
            e.into_response()
        })
    }
}

//! Firestore trigger endpoint: `issues/{issueId}` created → broadcast.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use busalert_common::error::AppError;
use busalert_common::types::Issue;
use busalert_store::firestore::DocumentPath;

use crate::middleware::cloudevent::{CloudEvent, DOCUMENT_CREATED};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(receive_event))
}

fn ignored(reason: &str) -> Response {
    Json(json!({ "status": "ignored", "reason": reason })).into_response()
}

/// POST / — Handle one CloudEvent delivered by the trigger.
///
/// Errors from the user store or the gateway become 5xx responses so the
/// platform's retry policy decides what happens next.
async fn receive_event(
    State(state): State<AppState>,
    event: CloudEvent,
) -> Result<Response, AppError> {
    if event.event_type != DOCUMENT_CREATED {
        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            "Ignoring non-create event"
        );
        return Ok(ignored("event_type"));
    }

    let document = event
        .data
        .value
        .ok_or_else(|| AppError::Event("created event carries no document".to_string()))?;

    let path = document
        .path()
        .or_else(|| event.subject.as_deref().and_then(DocumentPath::parse))
        .ok_or_else(|| AppError::Event("event does not name a document".to_string()))?;

    if !path.is_in_collection(&state.config.issues_collection) {
        tracing::info!(
            event_id = %event.id,
            document = %path,
            "Ignoring document outside the issues collection"
        );
        return Ok(ignored("collection"));
    }

    tracing::info!(
        event_id = %event.id,
        source = %event.source,
        document = %path,
        "Received issue-created event"
    );

    let issue = Issue::from_fields(Some(path.document_id().to_string()), &document.field_map());
    let outcome = state.notifier.notify_new_issue(&issue).await?;

    Ok(Json(outcome).into_response())
}

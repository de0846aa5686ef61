use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Plain JSON view of a document's fields.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Title used when an issue has none.
pub const DEFAULT_ISSUE_TITLE: &str = "New Bus Issue";

/// Body used when an issue has no description.
pub const DEFAULT_ISSUE_DESCRIPTION: &str = "Check the app for details.";

/// Prefix of every issue notification title.
pub const WARNING_PREFIX: &str = "⚠️ ";

/// Flutter's click action so the client routes the tap itself.
pub const CLICK_ACTION: &str = "FLUTTER_NOTIFICATION_CLICK";

/// Client screen opened when the notification is tapped.
pub const TARGET_SCREEN: &str = "ReportIssueScreen";

/// Read a field as a string, treating empty and non-string values as absent.
fn non_empty_str<'a>(fields: &'a FieldMap, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

/// A reported bus issue, as created by the reporting client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl Issue {
    pub fn from_fields(id: Option<String>, fields: &FieldMap) -> Self {
        Self {
            id,
            title: non_empty_str(fields, "title").map(str::to_string),
            description: non_empty_str(fields, "description").map(str::to_string),
        }
    }

    pub fn title_or_default(&self) -> &str {
        self.title
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_ISSUE_TITLE)
    }

    pub fn description_or_default(&self) -> &str {
        self.description
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_ISSUE_DESCRIPTION)
    }
}

/// A user record. Only the push token matters here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: String,
    pub fcm_token: Option<String>,
}

impl UserRecord {
    pub fn from_fields(id: impl Into<String>, fields: &FieldMap) -> Self {
        Self {
            id: id.into(),
            fcm_token: non_empty_str(fields, "fcmToken").map(str::to_string),
        }
    }

    /// The device token, if the record has a non-empty one.
    pub fn push_token(&self) -> Option<&str> {
        self.fcm_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Visible part of a push notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Payload broadcast to every device token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub notification: Notification,
    /// String-keyed routing data for the client
    pub data: BTreeMap<String, String>,
}

impl NotificationPayload {
    /// Build the broadcast payload for a newly reported issue.
    pub fn for_issue(issue: &Issue) -> Self {
        let data = BTreeMap::from([
            ("click_action".to_string(), CLICK_ACTION.to_string()),
            ("screen".to_string(), TARGET_SCREEN.to_string()),
        ]);

        Self {
            notification: Notification {
                title: format!("{}{}", WARNING_PREFIX, issue.title_or_default()),
                body: issue.description_or_default().to_string(),
            },
            data,
        }
    }
}

/// Result of handling one issue-created event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// No user had a token; nothing was sent.
    NoTokens,
    Dispatched {
        tokens: usize,
        success: usize,
        failure: usize,
    },
}

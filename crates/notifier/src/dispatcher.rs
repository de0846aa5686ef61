//! Issue-notification dispatch.
//!
//! For each newly created issue:
//! 1. Default missing title/description
//! 2. Read every user record and keep the non-empty push tokens, in order,
//!    duplicates included
//! 3. Stop (successfully) if there are none
//! 4. Otherwise make exactly one gateway call with all tokens and one payload
//!
//! Store and gateway errors are not handled here; they fail the invocation so
//! the hosting platform's retry policy applies.

use std::sync::Arc;

use busalert_common::error::AppError;
use busalert_common::types::{DispatchOutcome, Issue, NotificationPayload, UserRecord};
use busalert_store::UserDirectory;

use crate::gateway::PushGateway;

/// Non-empty push tokens in encountered order.
pub fn collect_tokens(users: &[UserRecord]) -> Vec<String> {
    users
        .iter()
        .filter_map(|u| u.push_token())
        .map(str::to_string)
        .collect()
}

/// Broadcasts a notification for every new issue to all registered devices.
#[derive(Clone)]
pub struct IssueNotifier {
    users: Arc<dyn UserDirectory>,
    gateway: Arc<dyn PushGateway>,
}

impl IssueNotifier {
    pub fn new(users: Arc<dyn UserDirectory>, gateway: Arc<dyn PushGateway>) -> Self {
        Self { users, gateway }
    }

    pub async fn notify_new_issue(&self, issue: &Issue) -> Result<DispatchOutcome, AppError> {
        let issue_id = issue.id.as_deref().unwrap_or("unknown");
        let payload = NotificationPayload::for_issue(issue);

        let users = self.users.list_users().await?;
        let tokens = collect_tokens(&users);

        if tokens.is_empty() {
            tracing::info!(issue_id, users = users.len(), "No FCM tokens found.");
            return Ok(DispatchOutcome::NoTokens);
        }

        let response = self.gateway.send_to_devices(&tokens, &payload).await?;

        let outcome = DispatchOutcome::Dispatched {
            tokens: tokens.len(),
            success: response.success_count(),
            failure: response.failure_count(),
        };

        tracing::info!(
            issue_id,
            tokens = tokens.len(),
            success = response.success_count(),
            failure = response.failure_count(),
            "Issue notification dispatched"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::gateway::{MessagingResponse, SendError, SendResult};
    use busalert_common::types::FieldMap;

    struct StaticUsers(Vec<UserRecord>);

    #[async_trait]
    impl UserDirectory for StaticUsers {
        async fn list_users(&self) -> Result<Vec<UserRecord>, AppError> {
            Ok(self.0.clone())
        }
    }

    struct FailingUsers;

    #[async_trait]
    impl UserDirectory for FailingUsers {
        async fn list_users(&self) -> Result<Vec<UserRecord>, AppError> {
            Err(AppError::Store("users unavailable".into()))
        }
    }

    /// Records every dispatch call; optionally fails them or refuses one token.
    #[derive(Default)]
    struct RecordingGateway {
        calls: Mutex<Vec<(Vec<String>, NotificationPayload)>>,
        fail: bool,
        refuse: Option<String>,
    }

    #[async_trait]
    impl PushGateway for RecordingGateway {
        async fn send_to_devices(
            &self,
            tokens: &[String],
            payload: &NotificationPayload,
        ) -> Result<MessagingResponse, AppError> {
            self.calls
                .lock()
                .unwrap()
                .push((tokens.to_vec(), payload.clone()));
            if self.fail {
                return Err(AppError::Gateway("connection reset".into()));
            }
            let results = tokens
                .iter()
                .enumerate()
                .map(|(i, t)| SendResult {
                    token: t.clone(),
                    outcome: if self.refuse.as_deref() == Some(t.as_str()) {
                        Err(SendError::Unregistered)
                    } else {
                        Ok(format!("projects/bus-app/messages/{}", i))
                    },
                })
                .collect();
            Ok(MessagingResponse { results })
        }
    }

    fn fields(value: serde_json::Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    fn users(records: Vec<serde_json::Value>) -> Vec<UserRecord> {
        records
            .into_iter()
            .enumerate()
            .map(|(i, r)| UserRecord::from_fields(format!("u{}", i), &fields(r)))
            .collect()
    }

    fn notifier(
        records: Vec<serde_json::Value>,
        gateway: Arc<RecordingGateway>,
    ) -> IssueNotifier {
        IssueNotifier::new(Arc::new(StaticUsers(users(records))), gateway)
    }

    #[tokio::test]
    async fn test_broadcasts_to_non_empty_tokens() {
        let gateway = Arc::new(RecordingGateway::default());
        let notifier = notifier(
            vec![
                json!({"fcmToken": "T1"}),
                json!({"fcmToken": ""}),
                json!({}),
                json!({"fcmToken": "T2"}),
            ],
            gateway.clone(),
        );
        let issue = Issue::from_fields(
            Some("i1".into()),
            &fields(json!({"title": "Broken AC", "description": "Bus 12 AC not working"})),
        );

        let outcome = notifier.notify_new_issue(&issue).await.unwrap();
        assert_eq!(
            outcome,
            DispatchOutcome::Dispatched {
                tokens: 2,
                success: 2,
                failure: 0
            }
        );

        let calls = gateway.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (tokens, payload) = &calls[0];
        assert_eq!(tokens, &["T1", "T2"]);
        assert_eq!(payload.notification.title, "⚠️ Broken AC");
        assert_eq!(payload.notification.body, "Bus 12 AC not working");
        assert_eq!(payload.data["click_action"], "FLUTTER_NOTIFICATION_CLICK");
        assert_eq!(payload.data["screen"], "ReportIssueScreen");
    }

    #[tokio::test]
    async fn test_defaults_for_empty_issue() {
        let gateway = Arc::new(RecordingGateway::default());
        let notifier = notifier(vec![json!({"fcmToken": "T1"})], gateway.clone());

        let issue = Issue::from_fields(None, &fields(json!({})));
        notifier.notify_new_issue(&issue).await.unwrap();

        let calls = gateway.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1.notification.title, "⚠️ New Bus Issue");
        assert_eq!(calls[0].1.notification.body, "Check the app for details.");
    }

    #[tokio::test]
    async fn test_no_tokens_means_no_dispatch() {
        let gateway = Arc::new(RecordingGateway::default());
        let notifier = notifier(vec![json!({}), json!({})], gateway.clone());

        let issue = Issue::from_fields(None, &fields(json!({"title": "X"})));
        let outcome = notifier.notify_new_issue(&issue).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::NoTokens);
        assert!(gateway.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_users_means_no_dispatch() {
        let gateway = Arc::new(RecordingGateway::default());
        let notifier = notifier(vec![], gateway.clone());

        let outcome = notifier.notify_new_issue(&Issue::default()).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::NoTokens);
        assert!(gateway.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicates_kept_in_order() {
        let gateway = Arc::new(RecordingGateway::default());
        let notifier = notifier(
            vec![
                json!({"fcmToken": "B"}),
                json!({"fcmToken": "A"}),
                json!({"fcmToken": "B"}),
            ],
            gateway.clone(),
        );

        notifier.notify_new_issue(&Issue::default()).await.unwrap();

        let calls = gateway.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, ["B", "A", "B"]);
    }

    #[tokio::test]
    async fn test_per_token_refusals_are_counted_not_raised() {
        let gateway = Arc::new(RecordingGateway {
            refuse: Some("stale".into()),
            ..Default::default()
        });
        let notifier = notifier(
            vec![json!({"fcmToken": "fresh"}), json!({"fcmToken": "stale"})],
            gateway.clone(),
        );

        let outcome = notifier.notify_new_issue(&Issue::default()).await.unwrap();
        assert_eq!(
            outcome,
            DispatchOutcome::Dispatched {
                tokens: 2,
                success: 1,
                failure: 1
            }
        );
    }

    #[tokio::test]
    async fn test_gateway_failure_propagates() {
        let gateway = Arc::new(RecordingGateway {
            fail: true,
            ..Default::default()
        });
        let notifier = notifier(vec![json!({"fcmToken": "T1"})], gateway.clone());

        let result = notifier.notify_new_issue(&Issue::default()).await;
        assert!(matches!(result, Err(AppError::Gateway(_))));
        assert_eq!(gateway.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_user_query_failure_propagates() {
        let gateway = Arc::new(RecordingGateway::default());
        let notifier = IssueNotifier::new(Arc::new(FailingUsers), gateway.clone());

        let result = notifier.notify_new_issue(&Issue::default()).await;
        assert!(matches!(result, Err(AppError::Store(_))));
        assert!(gateway.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_collect_tokens() {
        let records = users(vec![
            json!({"fcmToken": "T1"}),
            json!({"fcmToken": 7}),
            json!({"fcmToken": null}),
            json!({"fcmToken": "T1"}),
        ]);
        assert_eq!(collect_tokens(&records), ["T1", "T1"]);
    }
}

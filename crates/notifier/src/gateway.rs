use async_trait::async_trait;
use thiserror::Error;

use busalert_common::error::AppError;
use busalert_common::types::NotificationPayload;

/// Why the gateway refused a single device token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("token is not registered")]
    Unregistered,
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
    #[error("sender id does not match the token's sender")]
    SenderIdMismatch,
    #[error("sending quota exceeded")]
    QuotaExceeded,
    #[error("messaging service unavailable")]
    Unavailable,
    #[error("messaging service internal error")]
    Internal,
    #[error("APNs or web push credentials rejected")]
    ThirdPartyAuth,
    #[error("unknown gateway error: code={code}, status={status:?}")]
    Unknown { code: u16, status: Option<String> },
}

/// Outcome for one token, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    pub token: String,
    /// Message id on success
    pub outcome: Result<String, SendError>,
}

/// Per-token results of one dispatch call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagingResponse {
    pub results: Vec<SendResult>,
}

impl MessagingResponse {
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_ok()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.len() - self.success_count()
    }
}

/// The single outbound call delivering one payload to many device tokens.
///
/// Per-token refusals are reported in the response; an `Err` means the call
/// as a whole failed and the invocation should fail with it.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send_to_devices(
        &self,
        tokens: &[String],
        payload: &NotificationPayload,
    ) -> Result<MessagingResponse, AppError>;
}

//! Issue broadcast: collects every user's push token and hands one payload to
//! the messaging gateway.

pub mod dispatcher;
pub mod fcm;
pub mod gateway;

pub use dispatcher::IssueNotifier;
pub use fcm::FcmGateway;
pub use gateway::{MessagingResponse, PushGateway, SendError, SendResult};

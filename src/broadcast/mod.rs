//! Alert broadcasting
//!
//! Consumes detection jobs, composes alert messages out of aggregated
//! provider data, and delivers them through the telegram-message queue.

pub mod format;
pub mod handler;
pub mod sender;


pub use format::{AlertContext, AlertFormatter};
pub use handler::{SendMessageHandler, TokenDetectionHandler};
pub use sender::{AlertSender, TelegramSender};

use crate::queue::JobPayload;
use serde::{Deserialize, Serialize};

/// Jobs on the telegram-message queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BroadcastJob {
    #[serde(rename = "SEND_MESSAGE", rename_all = "camelCase")]
    SendMessage {
        channel_id: String,
        caption: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        photo_url: Option<String>,
        token_address: String,
        chain_id: String,
    },
}

impl JobPayload for BroadcastJob {
    const QUEUE: &'static str = "telegram-message";

    fn job_type(&self) -> &'static str {
        match self {
            BroadcastJob::SendMessage { .. } => "SEND_MESSAGE",
        }
    }
}

//! Telegram message detection pipeline

use super::extractor::AddressExtractor;
use super::DetectionJob;
use crate::queue::JobQueue;
use crate::types::{PeerKind, TelegramMessageData};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Raw update delivered by the chat source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUpdate {
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub id: i64,
    pub date: i64,
    pub text: Option<String>,
    pub peer: Option<TelegramPeer>,
}

/// Peer variants as delivered on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelegramPeer {
    Channel { channel_id: i64 },
    Chat { chat_id: i64 },
    User { user_id: i64 },
}

/// Extracts the detection-relevant message out of a raw update.
pub struct TelegramMessageParser;

impl TelegramMessageParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse an update into message data. Updates without a message,
    /// without text, or without a peer are dropped.
    pub fn parse(&self, update: &TelegramUpdate) -> Option<TelegramMessageData> {
        let message = update.message.as_ref()?;
        let text = message.text.as_deref()?.trim();
        if text.is_empty() {
            return None;
        }

        let (chat_id, peer) = match message.peer.as_ref()? {
            TelegramPeer::Channel { channel_id } => (*channel_id, PeerKind::Channel),
            TelegramPeer::Chat { chat_id } => (*chat_id, PeerKind::Group),
            TelegramPeer::User { user_id } => (*user_id, PeerKind::Private),
        };

        Some(TelegramMessageData {
            text: text.to_string(),
            chat_id,
            message_id: message.id,
            timestamp: message.date,
            peer,
        })
    }
}

impl Default for TelegramMessageParser {
    fn default() -> Self {
        Self::new()
    }
}

/// A parsed message with the addresses found in it.
#[derive(Debug, Clone)]
pub struct ProcessedMessage {
    pub message: TelegramMessageData,
    pub evm_addresses: Vec<String>,
    pub solana_addresses: Vec<String>,
}

impl ProcessedMessage {
    pub fn has_tokens(&self) -> bool {
        !self.evm_addresses.is_empty() || !self.solana_addresses.is_empty()
    }
}

/// Consumes Telegram updates and enqueues one detection job per
/// mentioned EVM token.
pub struct TelegramDetectionPipeline {
    parser: TelegramMessageParser,
    extractor: AddressExtractor,
    queue: Arc<JobQueue<DetectionJob>>,
}

impl TelegramDetectionPipeline {
    pub fn new(queue: Arc<JobQueue<DetectionJob>>) -> Self {
        Self {
            parser: TelegramMessageParser::new(),
            extractor: AddressExtractor::new(),
            queue,
        }
    }

    /// Parse and extract without side effects.
    pub fn process(&self, update: &TelegramUpdate) -> Option<ProcessedMessage> {
        let message = self.parser.parse(update)?;
        let evm_addresses = self.extractor.evm_addresses(&message.text);
        let solana_addresses = self.extractor.solana_addresses(&message.text);
        Some(ProcessedMessage {
            message,
            evm_addresses,
            solana_addresses,
        })
    }

    /// Handle one update end to end. Returns the job ids enqueued.
    pub async fn handle_update(&self, update: &TelegramUpdate) -> Vec<i64> {
        let Some(processed) = self.process(update) else {
            return Vec::new();
        };
        if !processed.has_tokens() {
            return Vec::new();
        }

        if !processed.solana_addresses.is_empty() {
            // Solana mentions are recognized but not processed further
            tracing::debug!(
                count = processed.solana_addresses.len(),
                chat_id = processed.message.chat_id,
                "dropping solana mentions (unsupported chain)"
            );
        }

        let mut job_ids = Vec::new();
        for address in &processed.evm_addresses {
            tracing::info!(
                token = %address,
                chat_id = processed.message.chat_id,
                message_id = processed.message.message_id,
                "token mention detected"
            );
            let job = DetectionJob::ProcessTokenDetection {
                token_address: address.clone(),
                chain_id: None,
                message: Some(processed.message.clone()),
            };
            if let Some(id) = self.queue.add_job(&job).await {
                job_ids.push(id);
            }
        }
        job_ids
    }

    /// Drain updates from the chat source until the channel closes.
    pub async fn run(&self, mut updates: mpsc::Receiver<TelegramUpdate>) {
        while let Some(update) = updates.recv().await {
            self.handle_update(&update).await;
        }
        tracing::info!("telegram update channel closed");
    }
}

/// Long-polls the Bot API for updates and feeds them into the pipeline
/// channel as normalized [`TelegramUpdate`]s.
pub struct UpdatePoller {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
}

const POLL_TIMEOUT_SECS: u64 = 30;

impl UpdatePoller {
    pub fn new(bot_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://api.telegram.org".to_string(),
            bot_token,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Poll until the receiving side goes away.
    pub async fn run(&self, tx: mpsc::Sender<TelegramUpdate>) {
        let mut offset: i64 = 0;
        loop {
            let updates = match self.fetch(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!(error = %e, "getUpdates failed, backing off");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(normalized) = normalize_update(update) else {
                    continue;
                };
                if tx.send(normalized).await.is_err() {
                    tracing::info!("update consumer gone, stopping poller");
                    return;
                }
            }
        }
    }

    async fn fetch(&self, offset: i64) -> crate::error::Result<Vec<ApiUpdate>> {
        let url = format!("{}/bot{}/getUpdates", self.base_url, self.bot_token);
        let envelope: ApiEnvelope = self
            .client
            .get(&url)
            .query(&[("timeout", POLL_TIMEOUT_SECS as i64), ("offset", offset)])
            .send()
            .await?
            .json()
            .await?;

        if !envelope.ok {
            return Err(crate::error::BotError::Telegram(
                "getUpdates returned ok=false".to_string(),
            ));
        }
        Ok(envelope.result)
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    ok: bool,
    #[serde(default)]
    result: Vec<ApiUpdate>,
}

#[derive(Debug, Deserialize)]
struct ApiUpdate {
    update_id: i64,
    message: Option<ApiMessage>,
    channel_post: Option<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message_id: i64,
    date: i64,
    text: Option<String>,
    chat: ApiChat,
}

#[derive(Debug, Deserialize)]
struct ApiChat {
    id: i64,
    #[serde(rename = "type")]
    kind: String,
}

fn normalize_update(update: ApiUpdate) -> Option<TelegramUpdate> {
    let api = update.message.or(update.channel_post)?;
    let peer = match api.chat.kind.as_str() {
        "channel" => TelegramPeer::Channel {
            channel_id: api.chat.id,
        },
        "group" | "supergroup" => TelegramPeer::Chat {
            chat_id: api.chat.id,
        },
        "private" => TelegramPeer::User {
            user_id: api.chat.id,
        },
        _ => return None,
    };

    Some(TelegramUpdate {
        message: Some(TelegramMessage {
            id: api.message_id,
            date: api.date,
            text: api.text,
            peer: Some(peer),
        }),
    })
}

//! Queue handlers for the detection and messaging pipelines

use super::format::{AlertContext, AlertFormatter};
use super::sender::AlertSender;
use super::BroadcastJob;
use crate::detection::DetectionJob;
use crate::error::{BotError, Result};
use crate::providers::{ProviderSet, RawTokenData};
use crate::queue::store::Job;
use crate::queue::{JobHandler, JobQueue};
use crate::storage::Database;
use crate::types::Chain;
use serde_json::json;
use std::sync::Arc;

/// Chain assumed for mentions that do not name one.
const DEFAULT_CHAIN: Chain = Chain::Bsc;

/// Processes PROCESS_TOKEN_DETECTION jobs: dedup, enrich, compose, and
/// hand the finished alert to the telegram-message queue.
pub struct TokenDetectionHandler {
    db: Arc<Database>,
    providers: ProviderSet,
    broadcast_queue: Arc<JobQueue<BroadcastJob>>,
    alert_channel_id: String,
}

impl TokenDetectionHandler {
    pub fn new(
        db: Arc<Database>,
        providers: ProviderSet,
        broadcast_queue: Arc<JobQueue<BroadcastJob>>,
        alert_channel_id: String,
    ) -> Self {
        Self {
            db,
            providers,
            broadcast_queue,
            alert_channel_id,
        }
    }
}

#[async_trait::async_trait]
impl JobHandler<DetectionJob> for TokenDetectionHandler {
    async fn handle(&self, payload: DetectionJob, _job: &Job) -> Result<serde_json::Value> {
        let DetectionJob::ProcessTokenDetection {
            token_address,
            chain_id,
            message: _,
        } = payload;

        let chain = chain_id
            .as_deref()
            .and_then(Chain::from_id_str)
            .unwrap_or(DEFAULT_CHAIN);

        if self.db.has_alerted(&token_address, chain).await? {
            tracing::info!(token = %token_address, %chain, "token already alerted, skipping");
            return Ok(json!({
                "processed": false,
                "reason": "already_alerted",
                "tokenAddress": token_address,
            }));
        }

        let token = self.db.find_or_create_token(&token_address, chain).await?;

        let raw = RawTokenData::new(&token_address, chain, &self.providers);
        raw.collect().await;

        // Backfill identity fields discovered through the providers
        self.db
            .update_token(
                token.id,
                raw.token_name().await.as_deref(),
                raw.symbol().await.as_deref(),
                raw.decimals().await,
            )
            .await?;

        let ctx = AlertContext::build(&raw).await;
        let caption = AlertFormatter::new(&ctx).caption();
        let photo_url = ctx.logo_url.clone();

        let job = BroadcastJob::SendMessage {
            channel_id: self.alert_channel_id.clone(),
            caption,
            photo_url,
            token_address: token_address.clone(),
            chain_id: chain.id().to_string(),
        };
        // The alert log is written by the send handler once delivery
        // succeeds, so a lost enqueue must fail this job for retry.
        let Some(message_job_id) = self.broadcast_queue.add_job(&job).await else {
            return Err(BotError::Internal(format!(
                "failed to enqueue alert for {token_address}"
            )));
        };

        tracing::info!(token = %token_address, %chain, message_job_id, "alert composed");
        Ok(json!({
            "processed": true,
            "tokenAddress": token_address,
            "chainId": chain.id().to_string(),
            "messageJobId": message_job_id,
        }))
    }
}

/// Processes SEND_MESSAGE jobs: photo first when available, falling
/// back to plain text when photo delivery fails. Records the alert in
/// the dedup log only after a delivery succeeded.
pub struct SendMessageHandler {
    sender: Arc<dyn AlertSender>,
    db: Arc<Database>,
}

impl SendMessageHandler {
    pub fn new(sender: Arc<dyn AlertSender>, db: Arc<Database>) -> Self {
        Self { sender, db }
    }
}

#[async_trait::async_trait]
impl JobHandler<BroadcastJob> for SendMessageHandler {
    async fn handle(&self, payload: BroadcastJob, _job: &Job) -> Result<serde_json::Value> {
        let BroadcastJob::SendMessage {
            channel_id,
            caption,
            photo_url,
            token_address,
            chain_id,
        } = payload;

        let chain = Chain::from_id_str(&chain_id)
            .ok_or_else(|| BotError::Decode(format!("unknown chain id '{chain_id}'")))?;

        let mut used_fallback = false;
        match photo_url {
            Some(photo_url) => {
                if let Err(e) = self
                    .sender
                    .send_photo(&channel_id, &photo_url, &caption)
                    .await
                {
                    tracing::warn!(
                        channel_id = %channel_id,
                        error = %e,
                        "photo delivery failed, falling back to text"
                    );
                    used_fallback = true;
                    self.sender.send_text(&channel_id, &caption).await?;
                }
            }
            None => self.sender.send_text(&channel_id, &caption).await?,
        }

        self.db
            .record_alert(&token_address, chain, &channel_id)
            .await?;

        tracing::info!(channel_id = %channel_id, token = %token_address, "alert sent");
        Ok(json!({
            "sent": true,
            "channelId": channel_id,
            "tokenAddress": token_address,
            "usedFallback": used_fallback,
        }))
    }
}

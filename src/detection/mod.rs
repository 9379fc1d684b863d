//! Token detection
//!
//! Turns raw inputs (Telegram updates, EVM swap logs) into detection
//! jobs on the token-detection queue.

pub mod decoder;
pub mod extractor;
pub mod logs;
pub mod pair;
pub mod telegram;

#[cfg(test)]
mod tests;

pub use decoder::{Exchange, ExchangeRouter, LogListener, PairInfo, RawLog, UniLikeV2};
pub use extractor::AddressExtractor;
pub use telegram::{TelegramDetectionPipeline, TelegramMessageParser, TelegramUpdate};

use crate::events::{BusEvent, EventHandler};
use crate::queue::JobPayload;
use crate::types::TelegramMessageData;
use serde::{Deserialize, Serialize};

/// Jobs on the token-detection queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DetectionJob {
    #[serde(rename = "PROCESS_TOKEN_DETECTION", rename_all = "camelCase")]
    ProcessTokenDetection {
        token_address: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chain_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<TelegramMessageData>,
    },
}

impl JobPayload for DetectionJob {
    const QUEUE: &'static str = "token-detection";

    fn job_type(&self) -> &'static str {
        match self {
            DetectionJob::ProcessTokenDetection { .. } => "PROCESS_TOKEN_DETECTION",
        }
    }
}

/// Logs decoded swaps delivered over the event bus.
pub struct SwapConsumer;

#[async_trait::async_trait]
impl EventHandler for SwapConsumer {
    fn name(&self) -> &str {
        "swap-consumer"
    }

    async fn handle(&self, event: BusEvent) -> crate::error::Result<()> {
        let BusEvent::Swap(swap) = event;
        tracing::info!(
            chain = %swap.chain,
            pair = %swap.pair_address,
            tx = %swap.transaction_hash,
            amount_in = %decoder::format_units(swap.amount_in, swap.token_in.decimals),
            token_in = %swap.token_in.symbol,
            amount_out = %decoder::format_units(swap.amount_out, swap.token_out.decimals),
            token_out = %swap.token_out.symbol,
            "swap observed"
        );
        Ok(())
    }
}

//! UniswapV2-style swap log decoding

use crate::error::{BotError, Result};
use crate::events::{BusEvent, EventBus};
use crate::types::{Chain, ExchangeToken, Swap};
use ethers::types::{H256, U256};
use ethers::utils::keccak256;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Raw log record delivered by the chain log source.
#[derive(Debug, Clone)]
pub struct RawLog {
    /// Contract that emitted the log (the pair)
    pub address: String,
    pub topics: Vec<H256>,
    /// ABI-encoded, non-indexed event data
    pub data: Vec<u8>,
    pub transaction_hash: String,
    pub chain: Chain,
}

/// Decoded UniV2 Swap event, still side-agnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniV2SwapEvent {
    pub sender: String,
    pub to: String,
    pub amount0_in: U256,
    pub amount1_in: U256,
    pub amount0_out: U256,
    pub amount1_out: U256,
}

/// Resolves the token pair behind a pair contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PairInfo: Send + Sync {
    /// (token0, token1) of the pair contract.
    async fn token_pair(
        &self,
        pair_address: &str,
        chain: Chain,
    ) -> Result<(ExchangeToken, ExchangeToken)>;
}

/// An exchange flavor that can recognize and decode its swap logs.
#[async_trait::async_trait]
pub trait Exchange: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this log is a swap of this exchange flavor.
    fn matches(&self, log: &RawLog) -> bool;

    /// Decode the log into a normalized swap.
    async fn swap_from_log(&self, log: &RawLog) -> Result<Swap>;
}

const SWAP_EVENT_SIGNATURE: &str = "Swap(address,uint256,uint256,uint256,uint256,address)";

/// UniswapV2 and its forks: same event layout everywhere.
pub struct UniLikeV2 {
    swap_topic: H256,
    pair_info: Arc<dyn PairInfo>,
}

impl UniLikeV2 {
    pub fn new(pair_info: Arc<dyn PairInfo>) -> Self {
        Self {
            swap_topic: H256::from(keccak256(SWAP_EVENT_SIGNATURE.as_bytes())),
            pair_info,
        }
    }

    /// Topic0 of the UniV2 Swap event.
    pub fn swap_topic(&self) -> H256 {
        self.swap_topic
    }

    pub fn decode(&self, log: &RawLog) -> Result<UniV2SwapEvent> {
        if log.topics.len() != 3 {
            return Err(BotError::Decode(format!(
                "swap log must carry 3 topics, got {}",
                log.topics.len()
            )));
        }
        if log.topics[0] != self.swap_topic {
            return Err(BotError::Decode("not a UniV2 swap log".to_string()));
        }
        if log.data.len() != 128 {
            return Err(BotError::Decode(format!(
                "swap data must be 4 words, got {} bytes",
                log.data.len()
            )));
        }

        Ok(UniV2SwapEvent {
            sender: topic_to_address(&log.topics[1]),
            to: topic_to_address(&log.topics[2]),
            amount0_in: U256::from_big_endian(&log.data[0..32]),
            amount1_in: U256::from_big_endian(&log.data[32..64]),
            amount0_out: U256::from_big_endian(&log.data[64..96]),
            amount1_out: U256::from_big_endian(&log.data[96..128]),
        })
    }
}

#[async_trait::async_trait]
impl Exchange for UniLikeV2 {
    fn name(&self) -> &'static str {
        "uniLikeV2"
    }

    fn matches(&self, log: &RawLog) -> bool {
        log.topics.first() == Some(&self.swap_topic)
    }

    async fn swap_from_log(&self, log: &RawLog) -> Result<Swap> {
        let event = self.decode(log)?;
        let (token0, token1) = self
            .pair_info
            .token_pair(&log.address, log.chain)
            .await?;

        // A positive token0 delta (in > out) means token0 entered the
        // pair, so it is the input side. Amounts are absolute values.
        let (token_in, token_out, amount_in, amount_out) =
            if event.amount0_in >= event.amount0_out {
                (
                    token0,
                    token1,
                    event.amount0_in.saturating_sub(event.amount0_out),
                    event.amount1_out.saturating_sub(event.amount1_in),
                )
            } else {
                (
                    token1,
                    token0,
                    event.amount1_in.saturating_sub(event.amount1_out),
                    event.amount0_out.saturating_sub(event.amount0_in),
                )
            };

        Ok(Swap {
            sender: event.sender,
            recipient: event.to,
            token_in,
            token_out,
            amount_in,
            amount_out,
            pair_address: log.address.clone(),
            transaction_hash: log.transaction_hash.clone(),
            chain: log.chain,
        })
    }
}

fn topic_to_address(topic: &H256) -> String {
    format!("0x{}", hex::encode(&topic.as_bytes()[12..]))
}

/// Human-readable token amount from base units.
pub fn format_units(amount: U256, decimals: u8) -> String {
    let divisor = U256::exp10(decimals as usize);
    let whole = amount / divisor;
    let frac = amount % divisor;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Routes a raw log to the exchange flavor that recognizes it.
pub struct ExchangeRouter {
    exchanges: Vec<Arc<dyn Exchange>>,
}

impl ExchangeRouter {
    pub fn new(exchanges: Vec<Arc<dyn Exchange>>) -> Self {
        Self { exchanges }
    }

    pub fn route(&self, log: &RawLog) -> Option<&Arc<dyn Exchange>> {
        self.exchanges.iter().find(|e| e.matches(log))
    }
}

/// Consumes raw chain logs, decodes them, and emits swap events on the
/// bus. Undecodable logs are logged and skipped.
pub struct LogListener {
    router: ExchangeRouter,
    bus: Arc<EventBus>,
}

impl LogListener {
    pub fn new(router: ExchangeRouter, bus: Arc<EventBus>) -> Self {
        Self { router, bus }
    }

    /// Handle one raw log. Returns whether a swap was emitted.
    pub async fn handle_log(&self, log: &RawLog) -> bool {
        let Some(exchange) = self.router.route(log) else {
            tracing::error!(
                chain = %log.chain,
                address = %log.address,
                "no exchange matched log topics"
            );
            return false;
        };

        match exchange.swap_from_log(log).await {
            Ok(swap) => {
                self.bus.emit(BusEvent::Swap(swap));
                true
            }
            Err(e) => {
                tracing::error!(
                    chain = %log.chain,
                    exchange = exchange.name(),
                    tx = %log.transaction_hash,
                    error = %e,
                    "failed to decode swap log"
                );
                false
            }
        }
    }

    /// Drain logs from the chain source until the channel closes.
    pub async fn run(&self, mut logs: mpsc::Receiver<RawLog>) {
        while let Some(log) = logs.recv().await {
            self.handle_log(&log).await;
        }
        tracing::info!("chain log channel closed");
    }
}

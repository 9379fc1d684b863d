//! GeckoTerminal data source (priority 5)

use super::{usable_number, Memo, TokenDataSource};
use crate::error::{BotError, Result};
use crate::types::{Chain, SocialLinks};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "https://api.geckoterminal.com/api/v2";

/// GeckoTerminal network slug for a chain.
fn network(chain: Chain) -> &'static str {
    match chain {
        Chain::Ethereum => "eth",
        Chain::Optimism => "optimism",
        Chain::Bsc => "bsc",
        Chain::Polygon => "polygon_pos",
        Chain::ZkSync => "zksync",
        Chain::Base => "base",
        Chain::Arbitrum => "arbitrum",
        Chain::Avalanche => "avax",
    }
}

/// Attributes of the GeckoTerminal token response. Numbers arrive as
/// decimal strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeckoToken {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub image_url: Option<String>,
    pub price_usd: Option<String>,
    pub fdv_usd: Option<String>,
    pub market_cap_usd: Option<String>,
    pub total_reserve_in_usd: Option<String>,
    pub total_supply: Option<String>,
    #[serde(default)]
    pub websites: Vec<String>,
    pub twitter_handle: Option<String>,
    pub telegram_handle: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<EnvelopeData>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    attributes: Option<GeckoToken>,
}

/// GeckoTerminal HTTP API.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait GeckoTerminalApi: Send + Sync {
    async fn token_info(&self, address: &str, chain: Chain) -> Result<Option<GeckoToken>>;
}

pub struct GeckoTerminalClient {
    client: reqwest::Client,
    base_url: String,
}

impl GeckoTerminalClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

impl Default for GeckoTerminalClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl GeckoTerminalApi for GeckoTerminalClient {
    async fn token_info(&self, address: &str, chain: Chain) -> Result<Option<GeckoToken>> {
        let url = format!(
            "{}/networks/{}/tokens/{}",
            self.base_url,
            network(chain),
            address
        );
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(BotError::Api(format!(
                "geckoterminal token_info returned {}",
                response.status()
            )));
        }

        let envelope: Envelope = response.json().await?;
        Ok(envelope.data.and_then(|d| d.attributes))
    }
}

fn parse_number(value: &Option<String>) -> Option<f64> {
    value
        .as_deref()
        .and_then(|v| v.parse::<f64>().ok())
        .and_then(usable_number)
}

/// Per-token GeckoTerminal source with a memoized token payload.
pub struct GeckoTerminalRawData {
    address: String,
    chain: Chain,
    api: Arc<dyn GeckoTerminalApi>,
    token: Memo<GeckoToken>,
}

impl GeckoTerminalRawData {
    pub fn new(address: &str, chain: Chain, api: Arc<dyn GeckoTerminalApi>) -> Self {
        Self {
            address: address.to_string(),
            chain,
            api,
            token: Memo::new(),
        }
    }

    async fn token(&self) -> Option<GeckoToken> {
        self.token
            .get_or_fetch("geckoTerminal", "token_info", || {
                self.api.token_info(&self.address, self.chain)
            })
            .await
    }
}

#[async_trait::async_trait]
impl TokenDataSource for GeckoTerminalRawData {
    fn name(&self) -> &'static str {
        "geckoTerminal"
    }

    async fn collect(&self) {
        self.token().await;
    }

    async fn price(&self) -> Option<f64> {
        parse_number(&self.token().await?.price_usd)
    }

    async fn market_cap(&self) -> Option<f64> {
        let token = self.token().await?;
        // Market cap is often missing; FDV is the usual stand-in
        parse_number(&token.market_cap_usd).or_else(|| parse_number(&token.fdv_usd))
    }

    async fn liquidity(&self) -> Option<f64> {
        parse_number(&self.token().await?.total_reserve_in_usd)
    }

    async fn total_supply(&self) -> Option<f64> {
        parse_number(&self.token().await?.total_supply)
    }

    async fn decimals(&self) -> Option<u8> {
        self.token().await?.decimals
    }

    async fn token_name(&self) -> Option<String> {
        self.token().await?.name
    }

    async fn symbol(&self) -> Option<String> {
        self.token().await?.symbol
    }

    async fn logo_url(&self) -> Option<String> {
        self.token().await?.image_url
    }

    async fn socials(&self) -> Option<SocialLinks> {
        let token = self.token().await?;
        let links = SocialLinks {
            twitter: token
                .twitter_handle
                .map(|handle| format!("https://x.com/{}", handle)),
            telegram: token
                .telegram_handle
                .map(|handle| format!("https://t.me/{}", handle)),
            website: token.websites.into_iter().next(),
        };
        (!links.is_empty()).then_some(links)
    }

    async fn raw_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "tokenInfo": self.token.peek().await,
        })
    }
}

//! GmGn data source (priority 2)

use super::{usable_number, Memo, TokenDataSource};
use crate::error::{BotError, Result};
use crate::types::{Chain, SocialLinks};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "https://gmgn.ai/defi/quotation/v1";

/// Subset of the GmGn token info response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GmgnToken {
    pub price: Option<f64>,
    pub market_cap: Option<f64>,
    pub liquidity: Option<f64>,
    pub total_supply: Option<f64>,
    pub decimals: Option<u8>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub logo: Option<String>,
    pub creator_address: Option<String>,
    pub twitter_username: Option<String>,
    pub telegram: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    data: Option<EnvelopeData>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    token: Option<GmgnToken>,
}

/// GmGn HTTP API.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait GmgnApi: Send + Sync {
    async fn token_info(&self, address: &str, chain: Chain) -> Result<Option<GmgnToken>>;
}

pub struct GmgnClient {
    client: reqwest::Client,
    base_url: String,
}

impl GmgnClient {
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

impl Default for GmgnClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl GmgnApi for GmgnClient {
    async fn token_info(&self, address: &str, chain: Chain) -> Result<Option<GmgnToken>> {
        let url = format!("{}/tokens/{}/{}", self.base_url, chain.slug(), address);
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(BotError::Api(format!(
                "gmgn token_info returned {}",
                response.status()
            )));
        }

        let envelope: Envelope = response.json().await?;
        if envelope.code != 0 {
            return Ok(None);
        }
        Ok(envelope.data.and_then(|d| d.token))
    }
}

/// Per-token GmGn source with a memoized token info payload.
pub struct GmgnRawData {
    address: String,
    chain: Chain,
    api: Arc<dyn GmgnApi>,
    token: Memo<GmgnToken>,
}

impl GmgnRawData {
    pub fn new(address: &str, chain: Chain, api: Arc<dyn GmgnApi>) -> Self {
        Self {
            address: address.to_string(),
            chain,
            api,
            token: Memo::new(),
        }
    }

    async fn token(&self) -> Option<GmgnToken> {
        self.token
            .get_or_fetch("gmgn", "token_info", || {
                self.api.token_info(&self.address, self.chain)
            })
            .await
    }
}

#[async_trait::async_trait]
impl TokenDataSource for GmgnRawData {
    fn name(&self) -> &'static str {
        "gmgn"
    }

    async fn collect(&self) {
        self.token().await;
    }

    async fn price(&self) -> Option<f64> {
        self.token().await?.price.and_then(usable_number)
    }

    async fn market_cap(&self) -> Option<f64> {
        self.token().await?.market_cap.and_then(usable_number)
    }

    async fn liquidity(&self) -> Option<f64> {
        self.token().await?.liquidity.and_then(usable_number)
    }

    async fn total_supply(&self) -> Option<f64> {
        self.token().await?.total_supply.and_then(usable_number)
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
        self.token().await?.logo
    }

    async fn socials(&self) -> Option<SocialLinks> {
        let token = self.token().await?;
        let links = SocialLinks {
            twitter: token
                .twitter_username
                .map(|handle| format!("https://x.com/{}", handle)),
            telegram: token.telegram,
            website: token.website,
        };
        (!links.is_empty()).then_some(links)
    }

    async fn created_by(&self) -> Option<String> {
        self.token().await?.creator_address
    }

    async fn raw_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "tokenInfo": self.token.peek().await,
        })
    }
}

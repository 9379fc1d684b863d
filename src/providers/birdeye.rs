//! Birdeye data source (priority 1)

use super::{usable_number, Memo, TokenDataSource};
use crate::error::{BotError, Result};
use crate::types::{Chain, SocialLinks};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "https://public-api.birdeye.so";

/// Subset of the Birdeye token overview response the bot reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenOverview {
    pub price: Option<f64>,
    #[serde(rename = "mc", alias = "marketCap")]
    pub market_cap: Option<f64>,
    pub liquidity: Option<f64>,
    #[serde(rename = "supply", alias = "totalSupply")]
    pub total_supply: Option<f64>,
    pub decimals: Option<u8>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    #[serde(rename = "logoURI")]
    pub logo_uri: Option<String>,
    pub extensions: Option<TokenExtensions>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenExtensions {
    pub description: Option<String>,
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub website: Option<String>,
}

/// Subset of the Birdeye token security response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSecurity {
    pub creator_address: Option<String>,
    pub owner_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
}

/// Birdeye HTTP API.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait BirdeyeApi: Send + Sync {
    async fn token_overview(&self, address: &str, chain: Chain) -> Result<Option<TokenOverview>>;
    async fn token_security(&self, address: &str, chain: Chain) -> Result<Option<TokenSecurity>>;
}

pub struct BirdeyeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BirdeyeClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        address: &str,
        chain: Chain,
    ) -> Result<Option<T>> {
        let url = format!("{}{}?address={}", self.base_url, path, address);
        let response = self
            .client
            .get(&url)
            .header("X-API-KEY", &self.api_key)
            .header("x-chain", chain.slug())
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(BotError::Api(format!(
                "birdeye {} returned {}",
                path,
                response.status()
            )));
        }

        let envelope: Envelope<T> = response.json().await?;
        if !envelope.success {
            return Ok(None);
        }
        Ok(envelope.data)
    }
}

#[async_trait::async_trait]
impl BirdeyeApi for BirdeyeClient {
    async fn token_overview(&self, address: &str, chain: Chain) -> Result<Option<TokenOverview>> {
        self.get("/defi/token_overview", address, chain).await
    }

    async fn token_security(&self, address: &str, chain: Chain) -> Result<Option<TokenSecurity>> {
        self.get("/defi/token_security", address, chain).await
    }
}

/// Per-token Birdeye source with memoized endpoint payloads.
pub struct BirdeyeRawData {
    address: String,
    chain: Chain,
    api: Arc<dyn BirdeyeApi>,
    overview: Memo<TokenOverview>,
    security: Memo<TokenSecurity>,
}

impl BirdeyeRawData {
    pub fn new(address: &str, chain: Chain, api: Arc<dyn BirdeyeApi>) -> Self {
        Self {
            address: address.to_string(),
            chain,
            api,
            overview: Memo::new(),
            security: Memo::new(),
        }
    }

    async fn overview(&self) -> Option<TokenOverview> {
        self.overview
            .get_or_fetch_valid(
                "birdeye",
                "token_overview",
                || self.api.token_overview(&self.address, self.chain),
                // An overview quoting a non-finite price is garbage
                |o| o.price.map_or(true, f64::is_finite),
            )
            .await
    }

    async fn security(&self) -> Option<TokenSecurity> {
        self.security
            .get_or_fetch("birdeye", "token_security", || {
                self.api.token_security(&self.address, self.chain)
            })
            .await
    }
}

#[async_trait::async_trait]
impl TokenDataSource for BirdeyeRawData {
    fn name(&self) -> &'static str {
        "birdeye"
    }

    async fn collect(&self) {
        futures_util::join!(self.overview(), self.security());
    }

    async fn price(&self) -> Option<f64> {
        self.overview().await?.price.and_then(usable_number)
    }

    async fn market_cap(&self) -> Option<f64> {
        self.overview().await?.market_cap.and_then(usable_number)
    }

    async fn liquidity(&self) -> Option<f64> {
        self.overview().await?.liquidity.and_then(usable_number)
    }

    async fn total_supply(&self) -> Option<f64> {
        self.overview().await?.total_supply.and_then(usable_number)
    }

    async fn decimals(&self) -> Option<u8> {
        self.overview().await?.decimals
    }

    async fn token_name(&self) -> Option<String> {
        self.overview().await?.name
    }

    async fn symbol(&self) -> Option<String> {
        self.overview().await?.symbol
    }

    async fn logo_url(&self) -> Option<String> {
        self.overview().await?.logo_uri
    }

    async fn description(&self) -> Option<String> {
        self.overview().await?.extensions?.description
    }

    async fn socials(&self) -> Option<SocialLinks> {
        let ext = self.overview().await?.extensions?;
        let links = SocialLinks {
            twitter: ext.twitter,
            telegram: ext.telegram,
            website: ext.website,
        };
        (!links.is_empty()).then_some(links)
    }

    async fn created_by(&self) -> Option<String> {
        let security = self.security().await?;
        security.creator_address.or(security.owner_address)
    }

    async fn raw_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "tokenOverview": self.overview.peek().await,
            "tokenSecurity": self.security.peek().await,
        })
    }
}

//! ChainBase data source (priority 3)

use super::{usable_number, Memo, TokenDataSource};
use crate::error::{BotError, Result};
use crate::keys::KeyRotator;
use crate::types::{Chain, TokenHolder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "https://api.chainbase.online/v1";
const TOP_HOLDERS_LIMIT: u32 = 10;

/// Subset of the ChainBase token metadata response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub total_supply: Option<f64>,
    pub current_price: Option<f64>,
}

/// One row of the ChainBase top-holders response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolderRow {
    pub wallet_address: String,
    pub amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    data: Option<T>,
}

/// ChainBase HTTP API.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChainbaseApi: Send + Sync {
    async fn token_metadata(&self, address: &str, chain: Chain) -> Result<Option<TokenMetadata>>;
    async fn top_holders(&self, address: &str, chain: Chain) -> Result<Option<Vec<HolderRow>>>;
}

pub struct ChainbaseClient {
    client: reqwest::Client,
    base_url: String,
    keys: KeyRotator,
}

impl ChainbaseClient {
    pub fn new(api_keys: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            keys: KeyRotator::new(api_keys),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path_and_query: &str) -> Result<Option<T>> {
        let key = self
            .keys
            .next_key()
            .ok_or_else(|| BotError::Config("no chainbase API keys configured".to_string()))?;
        let url = format!("{}{}", self.base_url, path_and_query);
        let response = self
            .client
            .get(&url)
            .header("x-api-key", key)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(BotError::Api(format!(
                "chainbase {} returned {}",
                path_and_query,
                response.status()
            )));
        }

        let envelope: Envelope<T> = response.json().await?;
        if envelope.code != 0 {
            return Ok(None);
        }
        Ok(envelope.data)
    }
}

#[async_trait::async_trait]
impl ChainbaseApi for ChainbaseClient {
    async fn token_metadata(&self, address: &str, chain: Chain) -> Result<Option<TokenMetadata>> {
        self.get(&format!(
            "/token/metadata?chain_id={}&contract_address={}",
            chain.id(),
            address
        ))
        .await
    }

    async fn top_holders(&self, address: &str, chain: Chain) -> Result<Option<Vec<HolderRow>>> {
        self.get(&format!(
            "/token/top-holders?chain_id={}&contract_address={}&page=1&limit={}",
            chain.id(),
            address,
            TOP_HOLDERS_LIMIT
        ))
        .await
    }
}

/// Per-token ChainBase source with memoized metadata and holder list.
pub struct ChainbaseRawData {
    address: String,
    chain: Chain,
    api: Arc<dyn ChainbaseApi>,
    metadata: Memo<TokenMetadata>,
    holders: Memo<Vec<HolderRow>>,
}

impl ChainbaseRawData {
    pub fn new(address: &str, chain: Chain, api: Arc<dyn ChainbaseApi>) -> Self {
        Self {
            address: address.to_string(),
            chain,
            api,
            metadata: Memo::new(),
            holders: Memo::new(),
        }
    }

    async fn metadata(&self) -> Option<TokenMetadata> {
        self.metadata
            .get_or_fetch("chainbase", "token_metadata", || {
                self.api.token_metadata(&self.address, self.chain)
            })
            .await
    }

    async fn holders(&self) -> Option<Vec<HolderRow>> {
        self.holders
            .get_or_fetch("chainbase", "top_holders", || {
                self.api.top_holders(&self.address, self.chain)
            })
            .await
    }
}

#[async_trait::async_trait]
impl TokenDataSource for ChainbaseRawData {
    fn name(&self) -> &'static str {
        "chainBase"
    }

    async fn collect(&self) {
        futures_util::join!(self.metadata(), self.holders());
    }

    async fn price(&self) -> Option<f64> {
        self.metadata().await?.current_price.and_then(usable_number)
    }

    async fn market_cap(&self) -> Option<f64> {
        // Metadata carries no market cap; derive when both parts exist
        let metadata = self.metadata().await?;
        let price = metadata.current_price.and_then(usable_number)?;
        let supply = metadata.total_supply.and_then(usable_number)?;
        Some(price * supply)
    }

    async fn liquidity(&self) -> Option<f64> {
        None
    }

    async fn total_supply(&self) -> Option<f64> {
        self.metadata().await?.total_supply.and_then(usable_number)
    }

    async fn decimals(&self) -> Option<u8> {
        self.metadata().await?.decimals
    }

    async fn token_name(&self) -> Option<String> {
        self.metadata().await?.name
    }

    async fn symbol(&self) -> Option<String> {
        self.metadata().await?.symbol
    }

    async fn top_holders(&self) -> Option<Vec<TokenHolder>> {
        let rows = self.holders().await?;
        let supply = self.total_supply().await;
        let holders = rows
            .into_iter()
            .map(|row| {
                let percentage = match (row.amount, supply) {
                    (Some(amount), Some(supply)) if supply > 0.0 => amount / supply,
                    _ => 0.0,
                };
                TokenHolder {
                    address: row.wallet_address,
                    percentage,
                    is_creator: false,
                    is_pool: false,
                }
            })
            .collect::<Vec<_>>();
        (!holders.is_empty()).then_some(holders)
    }

    async fn raw_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "tokenMetadata": self.metadata.peek().await,
            "topHolders": self.holders.peek().await,
        })
    }
}

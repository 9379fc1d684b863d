//! GoPlus security data source (priority 4)
//!
//! GoPlus only serves security facts. Market accessors return `None`
//! unconditionally so the aggregator always falls through to other
//! providers for those fields.

use super::{Memo, TokenDataSource};
use crate::error::{BotError, Result};
use crate::types::{Chain, SecurityFlags};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "https://api.gopluslabs.io/api/v1";

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
const DEAD_ADDRESS: &str = "0x000000000000000000000000000000000000dead";

/// Subset of the GoPlus token security response. Boolean facts arrive
/// as "0"/"1" strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoplusTokenSecurity {
    pub owner_address: Option<String>,
    pub creator_address: Option<String>,
    pub is_honeypot: Option<String>,
    pub is_mintable: Option<String>,
    #[serde(default)]
    pub lp_holders: Vec<GoplusLpHolder>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoplusLpHolder {
    pub address: String,
    pub percent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    result: Option<HashMap<String, GoplusTokenSecurity>>,
}

/// GoPlus HTTP API.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait GoplusApi: Send + Sync {
    async fn token_security(
        &self,
        address: &str,
        chain: Chain,
    ) -> Result<Option<GoplusTokenSecurity>>;
}

pub struct GoplusClient {
    client: reqwest::Client,
    base_url: String,
}

impl GoplusClient {
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

impl Default for GoplusClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl GoplusApi for GoplusClient {
    async fn token_security(
        &self,
        address: &str,
        chain: Chain,
    ) -> Result<Option<GoplusTokenSecurity>> {
        let url = format!(
            "{}/token_security/{}?contract_addresses={}",
            self.base_url,
            chain.id(),
            address
        );
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(BotError::Api(format!(
                "goplus token_security returned {}",
                response.status()
            )));
        }

        let envelope: Envelope = response.json().await?;
        if envelope.code != 1 {
            return Ok(None);
        }

        // The result map is keyed by lowercased contract address
        let lowered = address.to_lowercase();
        Ok(envelope
            .result
            .and_then(|mut result| result.remove(&lowered)))
    }
}

fn flag(value: &Option<String>) -> Option<bool> {
    value.as_deref().map(|v| v == "1")
}

fn is_burn_address(address: &str) -> bool {
    let lowered = address.to_lowercase();
    lowered == ZERO_ADDRESS || lowered == DEAD_ADDRESS
}

impl GoplusTokenSecurity {
    /// Ownership renounced: owner absent or a burn address.
    pub fn renounced(&self) -> Option<bool> {
        self.owner_address
            .as_deref()
            .map(|owner| owner.is_empty() || is_burn_address(owner))
    }

    /// LP burned: any LP holder entry sitting at a burn address.
    pub fn lp_burned(&self) -> Option<bool> {
        if self.lp_holders.is_empty() {
            return None;
        }
        Some(self.lp_holders.iter().any(|h| is_burn_address(&h.address)))
    }
}

/// Per-token GoPlus source with a memoized security payload.
pub struct GoplusRawData {
    address: String,
    chain: Chain,
    api: Arc<dyn GoplusApi>,
    security: Memo<GoplusTokenSecurity>,
}

impl GoplusRawData {
    pub fn new(address: &str, chain: Chain, api: Arc<dyn GoplusApi>) -> Self {
        Self {
            address: address.to_string(),
            chain,
            api,
            security: Memo::new(),
        }
    }

    async fn security_data(&self) -> Option<GoplusTokenSecurity> {
        self.security
            .get_or_fetch("goPlus", "token_security", || {
                self.api.token_security(&self.address, self.chain)
            })
            .await
    }
}

#[async_trait::async_trait]
impl TokenDataSource for GoplusRawData {
    fn name(&self) -> &'static str {
        "goPlus"
    }

    async fn collect(&self) {
        self.security_data().await;
    }

    async fn price(&self) -> Option<f64> {
        None
    }

    async fn market_cap(&self) -> Option<f64> {
        None
    }

    async fn liquidity(&self) -> Option<f64> {
        None
    }

    async fn total_supply(&self) -> Option<f64> {
        None
    }

    async fn decimals(&self) -> Option<u8> {
        None
    }

    async fn token_name(&self) -> Option<String> {
        None
    }

    async fn symbol(&self) -> Option<String> {
        None
    }

    async fn created_by(&self) -> Option<String> {
        self.security_data().await?.creator_address
    }

    async fn security(&self) -> Option<SecurityFlags> {
        let data = self.security_data().await?;
        Some(SecurityFlags {
            renounced: data.renounced(),
            lp_burned: data.lp_burned(),
            honeypot: flag(&data.is_honeypot),
        })
    }

    async fn raw_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "tokenSecurity": self.security.peek().await,
        })
    }
}

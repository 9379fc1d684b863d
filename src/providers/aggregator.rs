//! Fixed-priority aggregation over all providers
//!
//! Every field accessor queries all providers concurrently, then picks
//! the first non-`None` answer in priority order: birdeye, gmgn,
//! chainBase, goPlus, geckoTerminal. A lower-priority provider can win
//! only when every provider above it has nothing, no matter which
//! response arrived first.

use super::{ProviderSet, TokenDataSource};
use crate::providers::birdeye::BirdeyeRawData;
use crate::providers::chainbase::ChainbaseRawData;
use crate::providers::gecko_terminal::GeckoTerminalRawData;
use crate::providers::gmgn::GmgnRawData;
use crate::providers::goplus::GoplusRawData;
use crate::types::{Chain, SecurityFlags, SocialLinks, TokenHolder};
use futures_util::future::join_all;
use std::sync::Arc;

/// Aggregated, memoized view of one token across all providers.
///
/// Caches live as long as this value; build a fresh instance to
/// refetch.
pub struct RawTokenData {
    address: String,
    chain: Chain,
    sources: Vec<Arc<dyn TokenDataSource>>,
}

impl RawTokenData {
    pub fn new(address: &str, chain: Chain, providers: &ProviderSet) -> Self {
        let sources: Vec<Arc<dyn TokenDataSource>> = vec![
            Arc::new(BirdeyeRawData::new(address, chain, providers.birdeye.clone())),
            Arc::new(GmgnRawData::new(address, chain, providers.gmgn.clone())),
            Arc::new(ChainbaseRawData::new(address, chain, providers.chainbase.clone())),
            Arc::new(GoplusRawData::new(address, chain, providers.goplus.clone())),
            Arc::new(GeckoTerminalRawData::new(
                address,
                chain,
                providers.gecko_terminal.clone(),
            )),
        ];
        Self::from_sources(address, chain, sources)
    }

    /// Build over an explicit source list (highest priority first).
    pub fn from_sources(
        address: &str,
        chain: Chain,
        sources: Vec<Arc<dyn TokenDataSource>>,
    ) -> Self {
        Self {
            address: address.to_string(),
            chain,
            sources,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    /// Warm every provider concurrently. Individual failures are
    /// absorbed inside each provider.
    pub async fn collect(&self) {
        join_all(self.sources.iter().map(|s| s.collect())).await;
    }

    pub async fn price(&self) -> Option<f64> {
        let results = join_all(self.sources.iter().map(|s| s.price())).await;
        results.into_iter().find_map(|v| v)
    }

    pub async fn market_cap(&self) -> Option<f64> {
        let results = join_all(self.sources.iter().map(|s| s.market_cap())).await;
        results.into_iter().find_map(|v| v)
    }

    pub async fn liquidity(&self) -> Option<f64> {
        let results = join_all(self.sources.iter().map(|s| s.liquidity())).await;
        results.into_iter().find_map(|v| v)
    }

    pub async fn total_supply(&self) -> Option<f64> {
        let results = join_all(self.sources.iter().map(|s| s.total_supply())).await;
        results.into_iter().find_map(|v| v)
    }

    pub async fn decimals(&self) -> Option<u8> {
        let results = join_all(self.sources.iter().map(|s| s.decimals())).await;
        results.into_iter().find_map(|v| v)
    }

    pub async fn token_name(&self) -> Option<String> {
        let results = join_all(self.sources.iter().map(|s| s.token_name())).await;
        results.into_iter().find_map(|v| v)
    }

    pub async fn symbol(&self) -> Option<String> {
        let results = join_all(self.sources.iter().map(|s| s.symbol())).await;
        results.into_iter().find_map(|v| v)
    }

    pub async fn logo_url(&self) -> Option<String> {
        let results = join_all(self.sources.iter().map(|s| s.logo_url())).await;
        results.into_iter().find_map(|v| v)
    }

    pub async fn description(&self) -> Option<String> {
        let results = join_all(self.sources.iter().map(|s| s.description())).await;
        results.into_iter().find_map(|v| v)
    }

    pub async fn socials(&self) -> Option<SocialLinks> {
        let results = join_all(self.sources.iter().map(|s| s.socials())).await;
        results.into_iter().find_map(|v| v)
    }

    pub async fn created_by(&self) -> Option<String> {
        let results = join_all(self.sources.iter().map(|s| s.created_by())).await;
        results.into_iter().find_map(|v| v)
    }

    pub async fn top_holders(&self) -> Option<Vec<TokenHolder>> {
        let results = join_all(self.sources.iter().map(|s| s.top_holders())).await;
        results.into_iter().find_map(|v| v)
    }

    pub async fn security(&self) -> Option<SecurityFlags> {
        let results = join_all(self.sources.iter().map(|s| s.security())).await;
        results.into_iter().find_map(|v| v)
    }

    /// Cached payloads of every provider, namespaced by provider name.
    /// Pure read: nothing is fetched.
    pub async fn raw_snapshot(&self) -> serde_json::Value {
        let mut snapshot = serde_json::Map::new();
        for source in &self.sources {
            snapshot.insert(source.name().to_string(), source.raw_snapshot().await);
        }
        serde_json::Value::Object(snapshot)
    }
}

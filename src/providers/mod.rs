//! Token data providers
//!
//! One module per upstream API. Each provider lazily fetches whole
//! endpoint payloads, memoizes them for its own lifetime, and derives
//! field accessors from the cached payload. The aggregator merges all
//! providers per field in a fixed priority order.

pub mod aggregator;
pub mod birdeye;
pub mod chainbase;
pub mod gecko_terminal;
pub mod goplus;
pub mod gmgn;

#[cfg(test)]
mod tests;

pub use aggregator::RawTokenData;

use crate::error::Result;
use crate::types::{SecurityFlags, SocialLinks, TokenHolder};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Uniform read surface over one provider for one token.
///
/// Accessors never fail: a provider that cannot answer returns `None`.
/// All methods are pure reads apart from the lazy fetch they may
/// trigger.
#[async_trait::async_trait]
pub trait TokenDataSource: Send + Sync {
    /// Provider name used for logging and raw snapshots.
    fn name(&self) -> &'static str;

    /// Warm every endpoint this provider serves, concurrently. Failures
    /// are absorbed per endpoint.
    async fn collect(&self);

    async fn price(&self) -> Option<f64>;
    async fn market_cap(&self) -> Option<f64>;
    async fn liquidity(&self) -> Option<f64>;
    async fn total_supply(&self) -> Option<f64>;
    async fn decimals(&self) -> Option<u8>;
    async fn token_name(&self) -> Option<String>;
    async fn symbol(&self) -> Option<String>;

    async fn logo_url(&self) -> Option<String> {
        None
    }

    async fn description(&self) -> Option<String> {
        None
    }

    async fn socials(&self) -> Option<SocialLinks> {
        None
    }

    /// Deployer / creator address, if the provider knows it.
    async fn created_by(&self) -> Option<String> {
        None
    }

    async fn top_holders(&self) -> Option<Vec<TokenHolder>> {
        None
    }

    async fn security(&self) -> Option<SecurityFlags> {
        None
    }

    /// Currently cached payloads, namespaced by endpoint. Never
    /// triggers a fetch.
    async fn raw_snapshot(&self) -> serde_json::Value;
}

/// Memoized endpoint payload.
///
/// The first call fetches; every later call returns the cached outcome,
/// including a cached "definitively absent" for fetch errors and empty
/// responses. A value that fails the validity check is discarded
/// without caching, so the next call may fetch again. The cache lives
/// as long as its owner; there is no time-based expiry.
pub(crate) struct Memo<T> {
    slot: Mutex<Option<Option<T>>>,
}

impl<T: Clone> Memo<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub async fn get_or_fetch<F, Fut>(&self, source: &'static str, endpoint: &'static str, fetch: F) -> Option<T>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>>> + Send,
    {
        self.get_or_fetch_valid(source, endpoint, fetch, |_| true).await
    }

    pub async fn get_or_fetch_valid<F, Fut, V>(
        &self,
        source: &'static str,
        endpoint: &'static str,
        fetch: F,
        valid: V,
    ) -> Option<T>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>>> + Send,
        V: Fn(&T) -> bool + Send,
    {
        // Holding the lock across the fetch also collapses concurrent
        // calls for the same endpoint into a single request.
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref() {
            return cached.clone();
        }

        match fetch().await {
            Ok(Some(value)) if !valid(&value) => {
                tracing::warn!(source, endpoint, "response failed validation, not cached");
                None
            }
            Ok(value) => {
                *slot = Some(value.clone());
                value
            }
            Err(e) => {
                tracing::warn!(source, endpoint, error = %e, "fetch failed");
                *slot = Some(None);
                None
            }
        }
    }

    /// Cached value, if any, without fetching.
    pub async fn peek(&self) -> Option<T> {
        self.slot.lock().await.clone().flatten()
    }
}

/// Positive finite check applied to numeric provider fields.
pub(crate) fn usable_number(value: f64) -> Option<f64> {
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// The full set of provider API clients, shared across tokens.
#[derive(Clone)]
pub struct ProviderSet {
    pub birdeye: Arc<dyn birdeye::BirdeyeApi>,
    pub gmgn: Arc<dyn gmgn::GmgnApi>,
    pub chainbase: Arc<dyn chainbase::ChainbaseApi>,
    pub goplus: Arc<dyn goplus::GoplusApi>,
    pub gecko_terminal: Arc<dyn gecko_terminal::GeckoTerminalApi>,
}

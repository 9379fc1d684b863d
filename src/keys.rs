//! API key rotation and RPC endpoint selection

use crate::types::Chain;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin rotator over a fixed list of API keys.
///
/// Each call to `next_key` hands out the key after the previously
/// returned one, wrapping at the end of the list.
#[derive(Debug)]
pub struct KeyRotator {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl KeyRotator {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Next key in rotation, or None if no keys were configured.
    pub fn next_key(&self) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        Some(self.keys[idx].as_str())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// One RPC endpoint pair for a chain.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RpcEndpoint {
    pub https: String,
    pub wss: Option<String>,
}

/// Uniform-random endpoint selection over the configured pools.
#[derive(Debug, Default)]
pub struct EndpointPool {
    endpoints: HashMap<Chain, Vec<RpcEndpoint>>,
}

impl EndpointPool {
    pub fn new(endpoints: HashMap<Chain, Vec<RpcEndpoint>>) -> Self {
        Self { endpoints }
    }

    /// Pick a random endpoint for the chain, or None if the pool is empty.
    pub fn random(&self, chain: Chain) -> Option<&RpcEndpoint> {
        let pool = self.endpoints.get(&chain)?;
        if pool.is_empty() {
            return None;
        }
        let idx = rand::rng().random_range(0..pool.len());
        Some(&pool[idx])
    }
}

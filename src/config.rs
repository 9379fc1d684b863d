//! Configuration management

use crate::keys::{EndpointPool, RpcEndpoint};
use crate::queue::QueueSettings;
use crate::types::Chain;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    /// RPC endpoint pools, keyed by numeric chain id ("56", "1", ...)
    #[serde(default)]
    pub chains: HashMap<String, ChainConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token. Absent means alerts are logged instead of sent.
    pub bot_token: Option<String>,
    /// Channel that receives the alerts
    pub alert_channel_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    /// Birdeye API key
    pub birdeye_api_key: Option<String>,
    /// Chainbase API keys, rotated round-robin across requests
    #[serde(default)]
    pub chainbase_api_keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Attempts before a job fails for good
    pub max_attempts: u32,
    /// First retry delay in milliseconds, doubled per attempt
    pub backoff_base_ms: u64,
    /// Completed jobs kept for inspection
    pub keep_completed: u64,
    /// Failed jobs kept for inspection
    pub keep_failed: u64,
    /// Worker polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Active jobs older than this are presumed orphaned
    pub stale_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub rpc_urls: Vec<RpcEndpoint>,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path
            .as_ref()
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("config path is not valid UTF-8"))?;
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("MENTIONBOT").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }

    /// Load from default locations
    pub fn load_default() -> anyhow::Result<Self> {
        let paths = ["config.toml", "~/.config/mentionbot/config.toml"];

        for path in paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::load(expanded.as_ref());
            }
        }

        anyhow::bail!("No configuration file found")
    }

    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings {
            max_attempts: self.queue.max_attempts,
            backoff_base_ms: self.queue.backoff_base_ms,
            keep_completed: self.queue.keep_completed,
            keep_failed: self.queue.keep_failed,
            poll_interval_ms: self.queue.poll_interval_ms,
            stale_timeout_ms: self.queue.stale_timeout_ms,
        }
    }

    /// RPC pools for the chains we know; entries with unknown chain ids
    /// are dropped with a warning.
    pub fn endpoint_pool(&self) -> EndpointPool {
        let mut endpoints = HashMap::new();
        for (chain_id, chain_config) in &self.chains {
            match Chain::from_id_str(chain_id) {
                Some(chain) => {
                    endpoints.insert(chain, chain_config.rpc_urls.clone());
                }
                None => tracing::warn!(chain_id, "ignoring RPC pool for unknown chain id"),
            }
        }
        EndpointPool::new(endpoints)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        let defaults = QueueSettings::default();
        Self {
            max_attempts: defaults.max_attempts,
            backoff_base_ms: defaults.backoff_base_ms,
            keep_completed: defaults.keep_completed,
            keep_failed: defaults.keep_failed,
            poll_interval_ms: defaults.poll_interval_ms,
            stale_timeout_ms: defaults.stale_timeout_ms,
        }
    }
}

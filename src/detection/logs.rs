//! Chain log polling

use super::decoder::RawLog;
use crate::keys::EndpointPool;
use crate::types::Chain;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Filter, H256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Polls JSON-RPC for new logs matching a topic and feeds them to the
/// decode channel. Tracks the last seen block per chain so a slow poll
/// never drops a range.
pub struct LogPoller {
    endpoints: Arc<EndpointPool>,
    chains: Vec<Chain>,
    topic: H256,
    poll_interval: Duration,
}

impl LogPoller {
    pub fn new(
        endpoints: Arc<EndpointPool>,
        chains: Vec<Chain>,
        topic: H256,
        poll_interval: Duration,
    ) -> Self {
        Self {
            endpoints,
            chains,
            topic,
            poll_interval,
        }
    }

    /// Poll until the receiving side goes away.
    pub async fn run(&self, tx: mpsc::Sender<RawLog>) {
        let mut cursors: HashMap<Chain, u64> = HashMap::new();

        loop {
            for &chain in &self.chains {
                if let Err(e) = self.poll_chain(chain, &mut cursors, &tx).await {
                    tracing::warn!(%chain, error = %e, "log poll failed");
                }
                if tx.is_closed() {
                    tracing::info!("log consumer gone, stopping poller");
                    return;
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn poll_chain(
        &self,
        chain: Chain,
        cursors: &mut HashMap<Chain, u64>,
        tx: &mpsc::Sender<RawLog>,
    ) -> anyhow::Result<()> {
        let Some(endpoint) = self.endpoints.random(chain) else {
            return Ok(());
        };
        let provider = Provider::<Http>::try_from(endpoint.https.as_str())?;

        let latest = provider.get_block_number().await?.as_u64();
        let from = match cursors.get(&chain) {
            Some(&cursor) => {
                if cursor >= latest {
                    return Ok(());
                }
                cursor + 1
            }
            // First poll starts at the tip, history is not replayed
            None => latest,
        };

        let filter = Filter::new()
            .from_block(from)
            .to_block(latest)
            .topic0(self.topic);
        let logs = provider.get_logs(&filter).await?;
        cursors.insert(chain, latest);

        for log in logs {
            let Some(transaction_hash) = log.transaction_hash else {
                continue;
            };
            let raw = RawLog {
                address: format!("{:#x}", log.address),
                topics: log.topics,
                data: log.data.to_vec(),
                transaction_hash: format!("{:#x}", transaction_hash),
                chain,
            };
            if tx.send(raw).await.is_err() {
                return Ok(());
            }
        }
        Ok(())
    }
}

//! On-chain pair metadata lookup

use super::decoder::PairInfo;
use crate::error::{BotError, Result};
use crate::keys::EndpointPool;
use crate::types::{Chain, ExchangeToken};
use ethers::contract::abigen;
use ethers::providers::{Http, Provider};
use ethers::types::Address;
use std::sync::Arc;

abigen!(
    UniV2Pair,
    r#"[
        function token0() external view returns (address)
        function token1() external view returns (address)
    ]"#
);

abigen!(
    Erc20,
    r#"[
        function symbol() external view returns (string)
        function decimals() external view returns (uint8)
    ]"#
);

/// Resolves pair tokens through JSON-RPC, picking a random endpoint
/// from the configured pool per call.
pub struct RpcPairInfo {
    endpoints: Arc<EndpointPool>,
}

impl RpcPairInfo {
    pub fn new(endpoints: Arc<EndpointPool>) -> Self {
        Self { endpoints }
    }

    fn provider(&self, chain: Chain) -> Result<Arc<Provider<Http>>> {
        let endpoint = self
            .endpoints
            .random(chain)
            .ok_or_else(|| BotError::UnsupportedChain(chain.to_string()))?;
        let provider = Provider::<Http>::try_from(endpoint.https.as_str())
            .map_err(|e| BotError::Api(format!("bad RPC url for {}: {}", chain, e)))?;
        Ok(Arc::new(provider))
    }

    async fn token_at(
        &self,
        provider: Arc<Provider<Http>>,
        address: Address,
        chain: Chain,
    ) -> Result<ExchangeToken> {
        let erc20 = Erc20::new(address, provider);
        let symbol = erc20
            .symbol()
            .call()
            .await
            .map_err(|e| BotError::Api(format!("symbol() call failed: {}", e)))?;
        let decimals = erc20
            .decimals()
            .call()
            .await
            .map_err(|e| BotError::Api(format!("decimals() call failed: {}", e)))?;

        Ok(ExchangeToken {
            address: format!("{:#x}", address),
            symbol,
            decimals,
            chain,
        })
    }
}

#[async_trait::async_trait]
impl PairInfo for RpcPairInfo {
    async fn token_pair(
        &self,
        pair_address: &str,
        chain: Chain,
    ) -> Result<(ExchangeToken, ExchangeToken)> {
        let provider = self.provider(chain)?;
        let pair: Address = pair_address
            .parse()
            .map_err(|_| BotError::Decode(format!("bad pair address: {}", pair_address)))?;

        let contract = UniV2Pair::new(pair, provider.clone());
        let token0 = contract
            .token_0()
            .call()
            .await
            .map_err(|e| BotError::Api(format!("token0() call failed: {}", e)))?;
        let token1 = contract
            .token_1()
            .call()
            .await
            .map_err(|e| BotError::Api(format!("token1() call failed: {}", e)))?;

        Ok((
            self.token_at(provider.clone(), token0, chain).await?,
            self.token_at(provider, token1, chain).await?,
        ))
    }
}

//! Tests for the provider layer

#[cfg(test)]
mod tests {
    use crate::error::BotError;
    use crate::providers::birdeye::{BirdeyeRawData, MockBirdeyeApi, TokenOverview};
    use crate::providers::chainbase::{ChainbaseRawData, HolderRow, MockChainbaseApi, TokenMetadata};
    use crate::providers::gecko_terminal::MockGeckoTerminalApi;
    use crate::providers::gmgn::{GmgnToken, MockGmgnApi};
    use crate::providers::goplus::{GoplusRawData, GoplusTokenSecurity, MockGoplusApi};
    use crate::providers::{ProviderSet, RawTokenData, TokenDataSource};
    use crate::types::{Chain, SecurityFlags, SocialLinks, TokenHolder};
    use std::sync::Arc;
    use std::time::Duration;

    const TOKEN: &str = "0x00000000000000000000000000000000000000aa";

    fn overview_with_price(price: f64) -> TokenOverview {
        TokenOverview {
            price: Some(price),
            market_cap: Some(1_000_000.0),
            symbol: Some("TKN".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_memoized_overview_fetched_once() {
        let mut api = MockBirdeyeApi::new();
        api.expect_token_overview()
            .times(1)
            .returning(|_, _| Ok(Some(overview_with_price(1.5))));

        let source = BirdeyeRawData::new(TOKEN, Chain::Bsc, Arc::new(api));
        assert_eq!(source.price().await, Some(1.5));
        assert_eq!(source.price().await, Some(1.5));
        // Other fields derived from the same payload reuse the cache
        assert_eq!(source.market_cap().await, Some(1_000_000.0));
        assert_eq!(source.symbol().await, Some("TKN".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_error_cached_as_absent() {
        let mut api = MockBirdeyeApi::new();
        api.expect_token_overview()
            .times(1)
            .returning(|_, _| Err(BotError::Api("birdeye down".to_string())));

        let source = BirdeyeRawData::new(TOKEN, Chain::Bsc, Arc::new(api));
        assert_eq!(source.price().await, None);
        // Second call resolves from the cached miss, no new fetch
        assert_eq!(source.price().await, None);
    }

    #[tokio::test]
    async fn test_empty_response_cached_as_absent() {
        let mut api = MockBirdeyeApi::new();
        api.expect_token_overview().times(1).returning(|_, _| Ok(None));

        let source = BirdeyeRawData::new(TOKEN, Chain::Bsc, Arc::new(api));
        assert_eq!(source.token_name().await, None);
        assert_eq!(source.token_name().await, None);
    }

    #[tokio::test]
    async fn test_invalid_response_not_cached() {
        let mut api = MockBirdeyeApi::new();
        // A non-finite price fails validation, so both calls fetch
        api.expect_token_overview()
            .times(2)
            .returning(|_, _| Ok(Some(overview_with_price(f64::NAN))));

        let source = BirdeyeRawData::new(TOKEN, Chain::Bsc, Arc::new(api));
        assert_eq!(source.price().await, None);
        assert_eq!(source.price().await, None);
    }

    #[tokio::test]
    async fn test_goplus_market_fields_always_none() {
        let mut api = MockGoplusApi::new();
        api.expect_token_security().returning(|_, _| {
            Ok(Some(GoplusTokenSecurity {
                owner_address: Some("0x0000000000000000000000000000000000000000".to_string()),
                is_honeypot: Some("0".to_string()),
                ..Default::default()
            }))
        });

        let source = GoplusRawData::new(TOKEN, Chain::Bsc, Arc::new(api));
        assert_eq!(source.price().await, None);
        assert_eq!(source.market_cap().await, None);
        assert_eq!(source.liquidity().await, None);
        assert_eq!(source.total_supply().await, None);

        let flags = source.security().await.unwrap();
        assert_eq!(flags.renounced, Some(true));
        assert_eq!(flags.honeypot, Some(false));
    }

    #[tokio::test]
    async fn test_goplus_lp_burned_detection() {
        let security = GoplusTokenSecurity {
            lp_holders: vec![
                crate::providers::goplus::GoplusLpHolder {
                    address: "0x000000000000000000000000000000000000dEaD".to_string(),
                    percent: Some("0.95".to_string()),
                },
            ],
            ..Default::default()
        };
        assert_eq!(security.lp_burned(), Some(true));

        let no_holders = GoplusTokenSecurity::default();
        assert_eq!(no_holders.lp_burned(), None);
    }

    #[tokio::test]
    async fn test_chainbase_holder_percentages() {
        let mut api = MockChainbaseApi::new();
        api.expect_token_metadata().returning(|_, _| {
            Ok(Some(TokenMetadata {
                total_supply: Some(1_000.0),
                ..Default::default()
            }))
        });
        api.expect_top_holders().returning(|_, _| {
            Ok(Some(vec![
                HolderRow {
                    wallet_address: "0x00000000000000000000000000000000000000b1".to_string(),
                    amount: Some(100.0),
                },
                HolderRow {
                    wallet_address: "0x00000000000000000000000000000000000000b2".to_string(),
                    amount: Some(50.0),
                },
            ]))
        });

        let source = ChainbaseRawData::new(TOKEN, Chain::Bsc, Arc::new(api));
        let holders = source.top_holders().await.unwrap();
        assert_eq!(holders.len(), 2);
        assert!((holders[0].percentage - 0.1).abs() < 1e-9);
        assert!((holders[1].percentage - 0.05).abs() < 1e-9);
    }

    /// Fixed-answer source with a configurable delay, for priority
    /// tests.
    struct StubSource {
        name: &'static str,
        price: Option<f64>,
        symbol: Option<String>,
        delay: Duration,
    }

    impl StubSource {
        fn new(name: &'static str, price: Option<f64>, delay_ms: u64) -> Self {
            Self {
                name,
                price,
                symbol: None,
                delay: Duration::from_millis(delay_ms),
            }
        }
    }

    #[async_trait::async_trait]
    impl TokenDataSource for StubSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn collect(&self) {}

        async fn price(&self) -> Option<f64> {
            tokio::time::sleep(self.delay).await;
            self.price
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
            self.symbol.clone()
        }

        async fn raw_snapshot(&self) -> serde_json::Value {
            serde_json::json!({ "price": self.price })
        }
    }

    #[tokio::test]
    async fn test_aggregator_priority_beats_latency() {
        // The slower source outranks the instant one
        let sources: Vec<Arc<dyn TokenDataSource>> = vec![
            Arc::new(StubSource::new("slow-primary", Some(1.0), 50)),
            Arc::new(StubSource::new("fast-secondary", Some(2.0), 0)),
        ];
        let aggregated = RawTokenData::from_sources(TOKEN, Chain::Bsc, sources);
        assert_eq!(aggregated.price().await, Some(1.0));
    }

    #[tokio::test]
    async fn test_aggregator_falls_through_absent_sources() {
        let sources: Vec<Arc<dyn TokenDataSource>> = vec![
            Arc::new(StubSource::new("primary", None, 0)),
            Arc::new(StubSource::new("secondary", Some(2.0), 0)),
        ];
        let aggregated = RawTokenData::from_sources(TOKEN, Chain::Bsc, sources);
        assert_eq!(aggregated.price().await, Some(2.0));
    }

    #[tokio::test]
    async fn test_aggregator_none_when_all_absent() {
        let sources: Vec<Arc<dyn TokenDataSource>> = vec![
            Arc::new(StubSource::new("primary", None, 0)),
            Arc::new(StubSource::new("secondary", None, 0)),
        ];
        let aggregated = RawTokenData::from_sources(TOKEN, Chain::Bsc, sources);
        assert_eq!(aggregated.price().await, None);
    }

    #[tokio::test]
    async fn test_aggregator_snapshot_is_namespaced() {
        let sources: Vec<Arc<dyn TokenDataSource>> = vec![
            Arc::new(StubSource::new("primary", Some(1.0), 0)),
            Arc::new(StubSource::new("secondary", Some(2.0), 0)),
        ];
        let aggregated = RawTokenData::from_sources(TOKEN, Chain::Bsc, sources);
        let snapshot = aggregated.raw_snapshot().await;
        assert!(snapshot.get("primary").is_some());
        assert!(snapshot.get("secondary").is_some());
    }

    fn full_mock_set(
        birdeye: MockBirdeyeApi,
        gmgn: MockGmgnApi,
        chainbase: MockChainbaseApi,
        goplus: MockGoplusApi,
        gecko: MockGeckoTerminalApi,
    ) -> ProviderSet {
        ProviderSet {
            birdeye: Arc::new(birdeye),
            gmgn: Arc::new(gmgn),
            chainbase: Arc::new(chainbase),
            goplus: Arc::new(goplus),
            gecko_terminal: Arc::new(gecko),
        }
    }

    #[tokio::test]
    async fn test_aggregator_over_real_providers() {
        let mut birdeye = MockBirdeyeApi::new();
        birdeye.expect_token_overview().returning(|_, _| Ok(None));
        birdeye.expect_token_security().returning(|_, _| Ok(None));

        let mut gmgn = MockGmgnApi::new();
        gmgn.expect_token_info().returning(|_, _| {
            Ok(Some(GmgnToken {
                price: Some(0.5),
                symbol: Some("GMT".to_string()),
                website: Some("https://example.org".to_string()),
                ..Default::default()
            }))
        });

        let mut chainbase = MockChainbaseApi::new();
        chainbase.expect_token_metadata().returning(|_, _| Ok(None));
        chainbase.expect_top_holders().returning(|_, _| Ok(None));

        let mut goplus = MockGoplusApi::new();
        goplus.expect_token_security().returning(|_, _| {
            Ok(Some(GoplusTokenSecurity {
                owner_address: Some(String::new()),
                ..Default::default()
            }))
        });

        let mut gecko = MockGeckoTerminalApi::new();
        gecko.expect_token_info().returning(|_, _| Ok(None));

        let providers = full_mock_set(birdeye, gmgn, chainbase, goplus, gecko);
        let aggregated = RawTokenData::new(TOKEN, Chain::Bsc, &providers);
        aggregated.collect().await;

        // Birdeye has nothing, so gmgn answers
        assert_eq!(aggregated.price().await, Some(0.5));
        assert_eq!(aggregated.symbol().await, Some("GMT".to_string()));
        assert_eq!(
            aggregated.socials().await,
            Some(SocialLinks {
                twitter: None,
                telegram: None,
                website: Some("https://example.org".to_string()),
            })
        );
        // Security only comes from goPlus
        assert_eq!(
            aggregated.security().await,
            Some(SecurityFlags {
                renounced: Some(true),
                lp_burned: None,
                honeypot: None,
            })
        );
        // Holders: nobody answered
        assert_eq!(aggregated.top_holders().await, None::<Vec<TokenHolder>>);
    }
}

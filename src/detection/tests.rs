//! Tests for the detection module

#[cfg(test)]
mod tests {
    use crate::detection::decoder::{
        format_units, Exchange, ExchangeRouter, LogListener, MockPairInfo, RawLog, UniLikeV2,
    };
    use crate::detection::telegram::{
        TelegramDetectionPipeline, TelegramMessage, TelegramMessageParser, TelegramPeer,
        TelegramUpdate,
    };
    use crate::detection::DetectionJob;
    use crate::events::{BusEvent, EventBus, EventKind};
    use crate::queue::{JobQueue, JobStore, QueueSettings};
    use crate::types::{Chain, ExchangeToken, PeerKind};
    use ethers::types::{H256, U256};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;

    const PAIR: &str = "0x00000000000000000000000000000000000000cc";

    fn channel_update(text: &str) -> TelegramUpdate {
        TelegramUpdate {
            message: Some(TelegramMessage {
                id: 42,
                date: 1_700_000_000,
                text: Some(text.to_string()),
                peer: Some(TelegramPeer::Channel { channel_id: -100123 }),
            }),
        }
    }

    #[test]
    fn test_parser_extracts_channel_message() {
        let parser = TelegramMessageParser::new();
        let parsed = parser.parse(&channel_update("  hello  ")).unwrap();
        assert_eq!(parsed.text, "hello");
        assert_eq!(parsed.chat_id, -100123);
        assert_eq!(parsed.message_id, 42);
        assert_eq!(parsed.peer, PeerKind::Channel);
    }

    #[test]
    fn test_parser_drops_textless_updates() {
        let parser = TelegramMessageParser::new();
        assert!(parser.parse(&TelegramUpdate { message: None }).is_none());
        assert!(parser.parse(&channel_update("   ")).is_none());

        let no_peer = TelegramUpdate {
            message: Some(TelegramMessage {
                id: 1,
                date: 0,
                text: Some("text".to_string()),
                peer: None,
            }),
        };
        assert!(parser.parse(&no_peer).is_none());
    }

    #[test]
    fn test_parser_peer_kinds() {
        let parser = TelegramMessageParser::new();
        let group = TelegramUpdate {
            message: Some(TelegramMessage {
                id: 1,
                date: 0,
                text: Some("hi".to_string()),
                peer: Some(TelegramPeer::Chat { chat_id: 7 }),
            }),
        };
        assert_eq!(parser.parse(&group).unwrap().peer, PeerKind::Group);

        let private = TelegramUpdate {
            message: Some(TelegramMessage {
                id: 1,
                date: 0,
                text: Some("hi".to_string()),
                peer: Some(TelegramPeer::User { user_id: 9 }),
            }),
        };
        assert_eq!(parser.parse(&private).unwrap().peer, PeerKind::Private);
    }

    async fn detection_queue() -> (JobStore, Arc<JobQueue<DetectionJob>>) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = JobStore::new(pool);
        store.init().await.unwrap();
        let queue = Arc::new(JobQueue::new(store.clone(), QueueSettings::default()));
        (store, queue)
    }

    #[tokio::test]
    async fn test_pipeline_enqueues_one_job_per_evm_mention() {
        let (store, queue) = detection_queue().await;
        let pipeline = TelegramDetectionPipeline::new(queue);

        let a = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let b = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
        let update = channel_update(&format!("ape {a} and {b}, also {a}"));

        let ids = pipeline.handle_update(&update).await;
        assert_eq!(ids.len(), 2);

        let first = store.get(ids[0]).await.unwrap().unwrap();
        assert_eq!(first.job_type, "PROCESS_TOKEN_DETECTION");
        let DetectionJob::ProcessTokenDetection {
            token_address,
            chain_id,
            message,
        } = serde_json::from_str(&first.payload).unwrap();
        assert_eq!(token_address, a);
        assert_eq!(chain_id, None);
        assert_eq!(message.unwrap().chat_id, -100123);
    }

    #[tokio::test]
    async fn test_pipeline_drops_solana_only_messages() {
        let (store, queue) = detection_queue().await;
        let pipeline = TelegramDetectionPipeline::new(queue.clone());

        // A valid Solana mint, but no EVM address
        let update = channel_update("sol gem So11111111111111111111111111111111111111112");
        let ids = pipeline.handle_update(&update).await;
        assert!(ids.is_empty());

        let counts = store.counts("token-detection").await.unwrap();
        assert_eq!(counts.waiting, 0);
    }

    #[tokio::test]
    async fn test_pipeline_ignores_plain_chatter() {
        let (_, queue) = detection_queue().await;
        let pipeline = TelegramDetectionPipeline::new(queue);
        assert!(pipeline.handle_update(&channel_update("gm fam")).await.is_empty());
    }

    #[test]
    fn test_detection_job_wire_format() {
        // The payload shape jobs are enqueued and decoded with
        let json = r#"{
            "type": "PROCESS_TOKEN_DETECTION",
            "data": { "tokenAddress": "0xabc0000000000000000000000000000000000abc", "chainId": "56" }
        }"#;
        let DetectionJob::ProcessTokenDetection {
            token_address,
            chain_id,
            message,
        } = serde_json::from_str(json).unwrap();
        assert_eq!(token_address, "0xabc0000000000000000000000000000000000abc");
        assert_eq!(chain_id.as_deref(), Some("56"));
        assert!(message.is_none());
    }

    fn word(value: u64) -> [u8; 32] {
        let mut buf = [0u8; 32];
        U256::from(value).to_big_endian(&mut buf);
        buf
    }

    fn address_topic(byte: u8) -> H256 {
        let mut buf = [0u8; 32];
        for slot in buf[12..].iter_mut() {
            *slot = byte;
        }
        H256::from(buf)
    }

    fn swap_log(
        topic0: H256,
        amount0_in: u64,
        amount1_in: u64,
        amount0_out: u64,
        amount1_out: u64,
        chain: Chain,
    ) -> RawLog {
        let mut data = Vec::with_capacity(128);
        data.extend_from_slice(&word(amount0_in));
        data.extend_from_slice(&word(amount1_in));
        data.extend_from_slice(&word(amount0_out));
        data.extend_from_slice(&word(amount1_out));
        RawLog {
            address: PAIR.to_string(),
            topics: vec![topic0, address_topic(0x11), address_topic(0x22)],
            data,
            transaction_hash: "0xdeadbeef".to_string(),
            chain,
        }
    }

    fn pair_tokens(chain: Chain) -> (ExchangeToken, ExchangeToken) {
        (
            ExchangeToken {
                address: "0x00000000000000000000000000000000000000t0".to_string(),
                symbol: "WETH".to_string(),
                decimals: 18,
                chain,
            },
            ExchangeToken {
                address: "0x00000000000000000000000000000000000000t1".to_string(),
                symbol: "TKN".to_string(),
                decimals: 18,
                chain,
            },
        )
    }

    fn uni_v2() -> UniLikeV2 {
        let mut pair_info = MockPairInfo::new();
        pair_info
            .expect_token_pair()
            .returning(|_, chain| Ok(pair_tokens(chain)));
        UniLikeV2::new(Arc::new(pair_info))
    }

    #[tokio::test]
    async fn test_decode_token0_input_side() {
        let exchange = uni_v2();
        let log = swap_log(exchange.swap_topic(), 1_000, 0, 0, 500, Chain::Ethereum);
        let swap = exchange.swap_from_log(&log).await.unwrap();

        assert_eq!(swap.token_in.symbol, "WETH");
        assert_eq!(swap.token_out.symbol, "TKN");
        assert_eq!(swap.amount_in, U256::from(1_000u64));
        assert_eq!(swap.amount_out, U256::from(500u64));
        assert_eq!(swap.chain, Chain::Ethereum);
        assert_eq!(
            swap.sender,
            "0x1111111111111111111111111111111111111111"
        );
        assert_eq!(
            swap.recipient,
            "0x2222222222222222222222222222222222222222"
        );
    }

    #[tokio::test]
    async fn test_decode_token1_input_side() {
        let exchange = uni_v2();
        let log = swap_log(exchange.swap_topic(), 0, 2_000, 750, 0, Chain::Bsc);
        let swap = exchange.swap_from_log(&log).await.unwrap();

        assert_eq!(swap.token_in.symbol, "TKN");
        assert_eq!(swap.token_out.symbol, "WETH");
        assert_eq!(swap.amount_in, U256::from(2_000u64));
        assert_eq!(swap.amount_out, U256::from(750u64));
    }

    #[tokio::test]
    async fn test_decode_amounts_are_absolute_deltas() {
        let exchange = uni_v2();
        // Both sides carry dust on the opposite leg
        let log = swap_log(exchange.swap_topic(), 1_000, 10, 40, 500, Chain::Bsc);
        let swap = exchange.swap_from_log(&log).await.unwrap();

        assert_eq!(swap.amount_in, U256::from(960u64));
        assert_eq!(swap.amount_out, U256::from(490u64));
    }

    #[tokio::test]
    async fn test_decode_rejects_foreign_topic() {
        let exchange = uni_v2();
        let log = swap_log(H256::zero(), 1, 0, 0, 1, Chain::Bsc);
        assert!(!exchange.matches(&log));
        assert!(exchange.decode(&log).is_err());
    }

    #[tokio::test]
    async fn test_decode_rejects_short_data() {
        let exchange = uni_v2();
        let mut log = swap_log(exchange.swap_topic(), 1, 0, 0, 1, Chain::Bsc);
        log.data.truncate(64);
        assert!(exchange.decode(&log).is_err());
    }

    #[tokio::test]
    async fn test_log_listener_emits_swap_for_ethereum_log() {
        let exchange = Arc::new(uni_v2());
        let router = ExchangeRouter::new(vec![exchange.clone() as Arc<dyn Exchange>]);
        let bus = Arc::new(EventBus::new());
        let mut swaps = bus.subscribe(EventKind::Swap);
        let listener = LogListener::new(router, bus);

        let log = swap_log(exchange.swap_topic(), 1_000, 0, 0, 500, Chain::Ethereum);
        assert!(listener.handle_log(&log).await);

        let BusEvent::Swap(swap) = swaps.recv().await.unwrap();
        assert_eq!(swap.chain.id().to_string(), "1");
        assert_eq!(swap.pair_address, PAIR);
        assert_eq!(swap.amount_in, U256::from(1_000u64));
    }

    #[tokio::test]
    async fn test_log_listener_skips_unmatched_logs() {
        let exchange = Arc::new(uni_v2());
        let router = ExchangeRouter::new(vec![exchange as Arc<dyn Exchange>]);
        let bus = Arc::new(EventBus::new());
        let mut swaps = bus.subscribe(EventKind::Swap);
        let listener = LogListener::new(router, bus);

        let log = swap_log(H256::zero(), 1_000, 0, 0, 500, Chain::Bsc);
        assert!(!listener.handle_log(&log).await);
        assert!(swaps.try_recv().is_err());
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(U256::from(1_000_000_000_000_000_000u64), 18), "1");
        assert_eq!(format_units(U256::from(1_500_000_000_000_000_000u64), 18), "1.5");
        assert_eq!(format_units(U256::from(123u64), 0), "123");
        assert_eq!(format_units(U256::from(1u64), 18), "0.000000000000000001");
        assert_eq!(format_units(U256::zero(), 18), "0");
    }
}

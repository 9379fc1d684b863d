//! In-process event bus
//!
//! Typed pub/sub used to decouple log decoding from downstream
//! consumers. Each subscriber gets its own unbounded channel, so
//! delivery is FIFO per subscriber and a slow or failing subscriber
//! never affects the others. `emit` never blocks the publisher.

use crate::error::Result;
use crate::types::Swap;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Event type tags for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Swap,
}

/// Events carried on the bus.
#[derive(Debug, Clone)]
pub enum BusEvent {
    Swap(Swap),
}

impl BusEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            BusEvent::Swap(_) => EventKind::Swap,
        }
    }
}

/// Event handler trait - implement this to consume events
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    /// Handler name for logging
    fn name(&self) -> &str;

    /// Handle a single event
    async fn handle(&self, event: BusEvent) -> Result<()>;
}

struct Subscriber {
    kind: EventKind,
    tx: mpsc::UnboundedSender<BusEvent>,
}

/// Event bus distributing events to type-filtered subscribers
pub struct EventBus {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe to events of one kind. Dropping the receiver
    /// unsubscribes; the dead sender is pruned on the next emit.
    pub fn subscribe(&self, kind: EventKind) -> mpsc::UnboundedReceiver<BusEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.write().push(Subscriber { kind, tx });
        rx
    }

    /// Register a handler driven by its own task. Handler errors are
    /// logged and do not stop delivery to this or other subscribers.
    pub fn on(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        let mut rx = self.subscribe(kind);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = handler.handle(event).await {
                    tracing::error!(handler = handler.name(), error = %e, "event handler failed");
                }
            }
        });
    }

    /// Deliver an event to every current subscriber of its kind.
    /// Subscribers added after this call do not see the event.
    pub fn emit(&self, event: BusEvent) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|s| !s.tx.is_closed());
        for sub in subscribers.iter() {
            if sub.kind == event.kind() {
                // Send only fails when the receiver dropped between the
                // retain above and now; pruned on the next emit.
                let _ = sub.tx.send(event.clone());
            }
        }
    }

    /// Number of live subscribers (for diagnostics).
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chain, ExchangeToken};
    use ethers::types::U256;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_swap(tx_hash: &str) -> Swap {
        let token = |addr: &str, symbol: &str| ExchangeToken {
            address: addr.to_string(),
            symbol: symbol.to_string(),
            decimals: 18,
            chain: Chain::Bsc,
        };
        Swap {
            sender: "0x1111111111111111111111111111111111111111".to_string(),
            recipient: "0x2222222222222222222222222222222222222222".to_string(),
            token_in: token("0x3333333333333333333333333333333333333333", "WBNB"),
            token_out: token("0x4444444444444444444444444444444444444444", "TKN"),
            amount_in: U256::from(1_000u64),
            amount_out: U256::from(2_000u64),
            pair_address: "0x5555555555555555555555555555555555555555".to_string(),
            transaction_hash: tx_hash.to_string(),
            chain: Chain::Bsc,
        }
    }

    #[tokio::test]
    async fn test_emit_reaches_every_prior_subscriber_once() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe(EventKind::Swap);
        let mut rx2 = bus.subscribe(EventKind::Swap);

        bus.emit(BusEvent::Swap(sample_swap("0xaaa")));

        let BusEvent::Swap(s1) = rx1.recv().await.unwrap();
        let BusEvent::Swap(s2) = rx2.recv().await.unwrap();
        assert_eq!(s1.transaction_hash, "0xaaa");
        assert_eq!(s2.transaction_hash, "0xaaa");

        // Exactly once per subscriber
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_prior_events() {
        let bus = EventBus::new();
        bus.emit(BusEvent::Swap(sample_swap("0xaaa")));

        let mut late = bus.subscribe(EventKind::Swap);
        assert!(late.try_recv().is_err());

        bus.emit(BusEvent::Swap(sample_swap("0xbbb")));
        let BusEvent::Swap(s) = late.recv().await.unwrap();
        assert_eq!(s.transaction_hash, "0xbbb");
    }

    #[tokio::test]
    async fn test_fifo_per_subscriber() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe(EventKind::Swap);

        for i in 0..5 {
            bus.emit(BusEvent::Swap(sample_swap(&format!("0x{}", i))));
        }
        for i in 0..5 {
            let BusEvent::Swap(s) = rx.recv().await.unwrap();
            assert_eq!(s.transaction_hash, format!("0x{}", i));
        }
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe(EventKind::Swap);
        assert_eq!(bus.subscriber_count(), 1);

        drop(rx);
        bus.emit(BusEvent::Swap(sample_swap("0xaaa")));
        assert_eq!(bus.subscriber_count(), 0);
    }

    struct FailingHandler;

    #[async_trait::async_trait]
    impl EventHandler for FailingHandler {
        fn name(&self) -> &str {
            "failing"
        }

        async fn handle(&self, _event: BusEvent) -> Result<()> {
            Err(crate::error::BotError::Internal("boom".to_string()))
        }
    }

    struct CountingHandler(Arc<AtomicUsize>);

    #[async_trait::async_trait]
    impl EventHandler for CountingHandler {
        fn name(&self) -> &str {
            "counting"
        }

        async fn handle(&self, _event: BusEvent) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_affect_others() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        bus.on(EventKind::Swap, Arc::new(FailingHandler));
        bus.on(EventKind::Swap, Arc::new(CountingHandler(count.clone())));

        bus.emit(BusEvent::Swap(sample_swap("0xaaa")));
        bus.emit(BusEvent::Swap(sample_swap("0xbbb")));

        // Let the handler tasks drain their channels
        for _ in 0..50 {
            if count.load(Ordering::SeqCst) == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}

mod synthetic;
mod websocket;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use agentscope_types::LogEntry;

pub use synthetic::{DEFAULT_SYNTHETIC_INTERVAL, SyntheticTransport};
pub use websocket::WebSocketTransport;

/// Identifier of one subscription; increases with every `connect`
pub type Generation = u64;

/// Notification from a transport
#[derive(Clone, Debug)]
pub enum TransportEvent {
    /// The subscription is established
    Opened,
    /// A serialized log entry (one JSON object)
    Message(String),
    /// An already-decoded entry (synthetic feeds)
    Entry(LogEntry),
    /// The subscription failed
    Error(String),
    /// The remote side closed the subscription
    Closed,
}

/// A transport event tagged with the subscription that produced it
#[derive(Clone, Debug)]
pub struct Envelope {
    pub generation: Generation,
    pub event: TransportEvent,
}

/// Sending half handed to a transport for one subscription
///
/// The channel behind a sink is bounded. Data events (`message`, `entry`)
/// never wait: when the consumer is behind they are dropped and counted.
/// Lifecycle events (`opened`, `error`, `closed`) wait for room, so the
/// consumer always sees them.
#[derive(Clone, Debug)]
pub struct EventSink {
    generation: Generation,
    tx: mpsc::Sender<Envelope>,
    overflow: Arc<AtomicU64>,
}

impl EventSink {
    pub fn new(generation: Generation, tx: mpsc::Sender<Envelope>) -> Self {
        Self {
            generation,
            tx,
            overflow: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Count dropped data events into a shared counter
    pub fn with_overflow_counter(mut self, overflow: Arc<AtomicU64>) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Data events dropped because the channel was full
    pub fn overflowed(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }

    fn envelope(&self, event: TransportEvent) -> Envelope {
        Envelope {
            generation: self.generation,
            event,
        }
    }

    /// Deliver an event, waiting for room; returns false once the consumer is gone
    pub async fn send(&self, event: TransportEvent) -> bool {
        self.tx.send(self.envelope(event)).await.is_ok()
    }

    /// Deliver an event without waiting; a full channel drops it
    ///
    /// Returns false only once the consumer is gone.
    pub fn offer(&self, event: TransportEvent) -> bool {
        match self.tx.try_send(self.envelope(event)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.overflow.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    pub async fn opened(&self) -> bool {
        self.send(TransportEvent::Opened).await
    }

    pub fn message(&self, payload: impl Into<String>) -> bool {
        self.offer(TransportEvent::Message(payload.into()))
    }

    pub fn entry(&self, entry: LogEntry) -> bool {
        self.offer(TransportEvent::Entry(entry))
    }

    pub async fn error(&self, description: impl Into<String>) -> bool {
        self.send(TransportEvent::Error(description.into())).await
    }

    pub async fn closed(&self) -> bool {
        self.send(TransportEvent::Closed).await
    }
}

/// A source of log events
///
/// `open` drives one subscription until the remote side ends it or `cancel`
/// fires. All notifications go through `sink`; the future itself never
/// returns an error.
pub trait Transport: Send + Sync {
    /// Short human-readable description of the source
    fn describe(&self) -> String;

    fn open(&self, sink: EventSink, cancel: CancellationToken) -> BoxFuture<'static, ()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentscope_types::LogLevel;

    #[tokio::test]
    async fn test_full_channel_drops_data_but_not_lifecycle() {
        let (tx, mut rx) = mpsc::channel(2);
        let sink = EventSink::new(4, tx);

        assert!(sink.opened().await);
        assert!(sink.entry(LogEntry::new("a", LogLevel::Info, "kept")));
        assert!(sink.entry(LogEntry::new("b", LogLevel::Info, "dropped")));
        assert!(sink.message("{}"));
        assert_eq!(sink.overflowed(), 2);

        assert!(matches!(rx.recv().await.unwrap().event, TransportEvent::Opened));
        let closing = {
            let sink = sink.clone();
            tokio::spawn(async move { sink.closed().await })
        };
        assert!(matches!(rx.recv().await.unwrap().event, TransportEvent::Entry(_)));
        let last = rx.recv().await.unwrap();
        assert_eq!(last.generation, 4);
        assert!(matches!(last.event, TransportEvent::Closed));
        assert!(closing.await.unwrap());
    }

    #[tokio::test]
    async fn test_shared_overflow_counter() {
        let overflow = Arc::new(AtomicU64::new(0));
        let (tx, _rx) = mpsc::channel(1);
        let first = EventSink::new(1, tx.clone()).with_overflow_counter(Arc::clone(&overflow));
        let second = EventSink::new(2, tx).with_overflow_counter(Arc::clone(&overflow));

        first.message("one");
        first.message("two");
        second.message("three");
        assert_eq!(overflow.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_sink_reports_dropped_consumer() {
        let (tx, rx) = mpsc::channel(4);
        let sink = EventSink::new(1, tx);
        drop(rx);

        assert!(!sink.message("late"));
        assert!(!sink.closed().await);
        assert_eq!(sink.overflowed(), 0);
    }
}

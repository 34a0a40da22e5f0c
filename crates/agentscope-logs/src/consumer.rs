use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use agentscope_feed::{Envelope, EventSink, FixtureProvider, Generation, Transport, TransportEvent};
use agentscope_types::{ArcLogEntry, ConnectionState, LogEntry};

use crate::buffer::LogBuffer;
use crate::parser::LogParser;
use crate::reconnect::ReconnectPolicy;

/// How long a cancelled transport may take to wind down before it is aborted
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Point-in-time view of the consumer for presentation
#[derive(Clone, Debug)]
pub struct LogSnapshot {
    /// Retained entries, newest first
    pub logs: Vec<ArcLogEntry>,
    pub state: ConnectionState,
    pub is_connected: bool,
    pub error: Option<String>,
    pub paused: bool,
    pub evicted: u64,
    pub discarded: u64,
    /// Entries dropped before ingest because the consumer fell behind
    pub overflowed: u64,
}

/// What a processed event changed
#[derive(Clone, Debug)]
pub enum Update {
    /// A new entry was added to the front of the buffer
    Ingested(ArcLogEntry),
    StateChanged(ConnectionState),
    /// A payload could not be decoded and was dropped
    Discarded(String),
    /// An event from a torn-down subscription was ignored
    Stale(Generation),
    /// A scheduled reconnection attempt was started
    RetryStarted(u32),
}

/// The live subscription
struct Subscription {
    generation: Generation,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Cancel the transport, abort it if it is still running after the grace period
    fn retire(self) {
        self.cancel.cancel();
        let mut task = self.task;
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err() {
                        task.abort();
                    }
                });
            }
            Err(_) => task.abort(),
        }
    }
}

/// Owns the bounded log buffer and the connection lifecycle of one transport
///
/// Transport tasks deliver events over an internal channel, each tagged with
/// the generation of the subscription that produced it. Only events from the
/// current subscription are applied; anything else is dropped, so entries
/// from a stream torn down by `disconnect`, `pause` or a new `connect` never
/// reach the buffer.
///
/// The channel between transports and the consumer holds at most `capacity`
/// envelopes. Entries arriving while it is full are dropped and counted in
/// `overflowed`, so a fast producer never grows memory past that bound.
///
/// Subscribing spawns a task, so `connect` and `resume` must run inside a
/// tokio runtime.
pub struct LogStreamConsumer {
    transport: Arc<dyn Transport>,
    buffer: LogBuffer,
    state: ConnectionState,
    error: Option<String>,
    paused: bool,

    next_generation: Generation,
    active: Option<Subscription>,
    events_tx: mpsc::Sender<Envelope>,
    events_rx: mpsc::Receiver<Envelope>,
    overflow: Arc<AtomicU64>,

    reconnect: ReconnectPolicy,
    attempts: u32,
    retry_at: Option<Instant>,

    discarded: u64,
}

impl LogStreamConsumer {
    pub fn new(transport: Arc<dyn Transport>, capacity: usize) -> Self {
        let (events_tx, events_rx) = mpsc::channel(capacity.max(1));
        Self {
            transport,
            buffer: LogBuffer::new(capacity),
            state: ConnectionState::Disconnected,
            error: None,
            paused: false,
            next_generation: 1,
            active: None,
            events_tx,
            events_rx,
            overflow: Arc::new(AtomicU64::new(0)),
            reconnect: ReconnectPolicy::disabled(),
            attempts: 0,
            retry_at: None,
            discarded: 0,
        }
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Preload the first `count` fixtures, keeping their newest-first order
    pub fn seed(&mut self, fixtures: &dyn FixtureProvider, count: usize) {
        let seed = fixtures.seed(count);
        for entry in seed.iter().rev() {
            self.buffer.push(entry.clone());
        }
        debug!(count = seed.len(), "seeded log buffer");
    }

    /// Open a fresh subscription, tearing down any existing one
    pub fn connect(&mut self) {
        self.paused = false;
        self.attempts = 0;
        self.retry_at = None;
        self.subscribe();
    }

    /// Tear down the subscription; safe to call in any state
    pub fn disconnect(&mut self) {
        self.release();
        self.retry_at = None;
        self.set_state(ConnectionState::Disconnected);
    }

    /// Stop ingesting. Entries emitted while paused are never seen.
    pub fn pause(&mut self) {
        self.disconnect();
        self.paused = true;
        info!("log stream paused");
    }

    pub fn resume(&mut self) {
        info!("log stream resumed");
        self.connect();
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Prepend one entry to the buffer
    pub fn ingest(&mut self, entry: LogEntry) -> ArcLogEntry {
        self.buffer.push(entry)
    }

    /// Empty the buffer; connection state is untouched
    pub fn clear_logs(&mut self) {
        let cleared = self.buffer.len();
        self.buffer.clear();
        debug!(cleared, "cleared log buffer");
    }

    /// Apply one transport event
    pub fn handle(&mut self, envelope: Envelope) -> Update {
        if self.generation() != Some(envelope.generation) {
            debug!(generation = envelope.generation, "ignoring stale transport event");
            return Update::Stale(envelope.generation);
        }

        match envelope.event {
            TransportEvent::Opened => {
                self.attempts = 0;
                self.error = None;
                info!(source = %self.transport.describe(), "log stream connected");
                self.set_state(ConnectionState::Connected)
            }
            TransportEvent::Message(payload) => match LogParser::decode(&payload) {
                Ok(entry) => Update::Ingested(self.ingest(entry)),
                Err(e) => {
                    self.discarded += 1;
                    warn!(error = %e, "discarding undecodable log payload");
                    Update::Discarded(e.to_string())
                }
            },
            TransportEvent::Entry(entry) => Update::Ingested(self.ingest(entry)),
            TransportEvent::Error(description) => {
                warn!(error = %description, "log stream error");
                self.release();
                self.error = Some(description);
                let update = self.set_state(ConnectionState::Errored);
                self.schedule_retry();
                update
            }
            TransportEvent::Closed => {
                info!("log stream closed by remote");
                self.release();
                self.set_state(ConnectionState::Disconnected)
            }
        }
    }

    /// Apply everything already queued, plus a due retry
    pub fn process_pending(&mut self) -> Vec<Update> {
        let mut updates = Vec::new();
        while let Ok(envelope) = self.events_rx.try_recv() {
            updates.push(self.handle(envelope));
        }
        if let Some(at) = self.retry_at {
            if at <= Instant::now() {
                updates.push(self.start_retry());
            }
        }
        updates
    }

    /// Wait for the next event or scheduled retry and apply it
    ///
    /// Cancel-safe: nothing is lost if the future is dropped before completion.
    pub async fn process_next(&mut self) -> Option<Update> {
        let retry_at = self.retry_at;
        tokio::select! {
            envelope = self.events_rx.recv() => envelope.map(|envelope| self.handle(envelope)),
            _ = tokio::time::sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                Some(self.start_retry())
            }
        }
    }

    pub fn snapshot(&self) -> LogSnapshot {
        LogSnapshot {
            logs: self.buffer.all(),
            state: self.state,
            is_connected: self.is_connected(),
            error: self.error.clone(),
            paused: self.paused,
            evicted: self.buffer.evicted(),
            discarded: self.discarded,
            overflowed: self.overflowed_count(),
        }
    }

    pub fn logs(&self) -> Vec<ArcLogEntry> {
        self.buffer.all()
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Forget the last error without touching the connection
    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Payloads dropped because they failed to decode
    pub fn discarded_count(&self) -> u64 {
        self.discarded
    }

    /// Entries dropped because the event channel was full
    pub fn overflowed_count(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }

    /// Generation of the live subscription, if any
    pub fn generation(&self) -> Option<Generation> {
        self.active.as_ref().map(|sub| sub.generation)
    }

    /// When the next automatic reconnection is due
    pub fn retry_pending(&self) -> Option<Instant> {
        self.retry_at
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        self.reconnect
    }

    pub fn describe(&self) -> String {
        self.transport.describe()
    }

    fn subscribe(&mut self) {
        self.release();

        let generation = self.next_generation;
        self.next_generation += 1;

        let cancel = CancellationToken::new();
        let sink = EventSink::new(generation, self.events_tx.clone())
            .with_overflow_counter(Arc::clone(&self.overflow));
        let task = tokio::spawn(self.transport.open(sink, cancel.clone()));

        self.active = Some(Subscription {
            generation,
            cancel,
            task,
        });
        debug!(generation, source = %self.transport.describe(), "opening log stream");
        self.set_state(ConnectionState::Connecting);
    }

    fn release(&mut self) {
        if let Some(sub) = self.active.take() {
            debug!(generation = sub.generation, "released log stream");
            sub.retire();
        }
    }

    fn schedule_retry(&mut self) {
        let attempt = self.attempts + 1;
        match self.reconnect.delay_for(attempt) {
            Some(delay) => {
                self.attempts = attempt;
                self.retry_at = Some(Instant::now() + delay);
                info!(attempt, ?delay, "scheduling reconnect");
            }
            None if self.reconnect.is_enabled() => {
                warn!(attempts = self.attempts, "giving up on reconnecting");
            }
            None => {}
        }
    }

    fn start_retry(&mut self) -> Update {
        self.retry_at = None;
        info!(attempt = self.attempts, "reconnecting log stream");
        self.subscribe();
        Update::RetryStarted(self.attempts)
    }

    fn set_state(&mut self, state: ConnectionState) -> Update {
        if self.state != state {
            debug!(from = %self.state, to = %state, "connection state changed");
        }
        self.state = state;
        Update::StateChanged(state)
    }
}

impl Drop for LogStreamConsumer {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use agentscope_feed::{StaticFixtures, SyntheticTransport};
    use agentscope_types::LogLevel;
    use futures::FutureExt;
    use futures::future::BoxFuture;

    /// Emits a fixed event script, then idles until cancelled
    struct ScriptedTransport {
        events: Vec<TransportEvent>,
    }

    impl Transport for ScriptedTransport {
        fn describe(&self) -> String {
            "scripted".to_string()
        }

        fn open(&self, sink: EventSink, cancel: CancellationToken) -> BoxFuture<'static, ()> {
            let events = self.events.clone();
            async move {
                for event in events {
                    sink.send(event).await;
                }
                cancel.cancelled().await;
            }
            .boxed()
        }
    }

    /// Hands every subscription's sink to the test
    struct ManualTransport {
        sinks: mpsc::UnboundedSender<EventSink>,
    }

    impl Transport for ManualTransport {
        fn describe(&self) -> String {
            "manual".to_string()
        }

        fn open(&self, sink: EventSink, cancel: CancellationToken) -> BoxFuture<'static, ()> {
            let sinks = self.sinks.clone();
            async move {
                let _ = sinks.send(sink);
                cancel.cancelled().await;
            }
            .boxed()
        }
    }

    /// Reports when it has finished winding down after cancellation
    struct CleanupTransport {
        finished: mpsc::UnboundedSender<()>,
    }

    impl Transport for CleanupTransport {
        fn describe(&self) -> String {
            "cleanup".to_string()
        }

        fn open(&self, _sink: EventSink, cancel: CancellationToken) -> BoxFuture<'static, ()> {
            let finished = self.finished.clone();
            async move {
                cancel.cancelled().await;
                tokio::task::yield_now().await;
                let _ = finished.send(());
            }
            .boxed()
        }
    }

    fn scripted(events: Vec<TransportEvent>, capacity: usize) -> LogStreamConsumer {
        LogStreamConsumer::new(Arc::new(ScriptedTransport { events }), capacity)
    }

    fn manual(capacity: usize) -> (LogStreamConsumer, mpsc::UnboundedReceiver<EventSink>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let consumer = LogStreamConsumer::new(Arc::new(ManualTransport { sinks: tx }), capacity);
        (consumer, rx)
    }

    fn entry(id: &str) -> LogEntry {
        LogEntry::new(id, LogLevel::Info, format!("message {}", id))
    }

    fn ids(consumer: &LogStreamConsumer) -> Vec<String> {
        consumer.logs().iter().map(|e| e.id.clone()).collect()
    }

    async fn next(consumer: &mut LogStreamConsumer) -> Update {
        consumer.process_next().await.unwrap()
    }

    #[tokio::test]
    async fn test_ingest_is_bounded_and_newest_first() {
        let mut consumer = scripted(Vec::new(), 3);
        for id in ["a", "b", "c", "d"] {
            consumer.ingest(entry(id));
        }
        assert_eq!(ids(&consumer), vec!["d", "c", "b"]);
        assert_eq!(consumer.snapshot().evicted, 1);
    }

    #[tokio::test]
    async fn test_opened_means_connected() {
        let mut consumer = scripted(vec![TransportEvent::Opened], 10);
        consumer.connect();
        assert_eq!(consumer.state(), ConnectionState::Connecting);

        assert!(matches!(
            next(&mut consumer).await,
            Update::StateChanged(ConnectionState::Connected)
        ));
        assert!(consumer.is_connected());
        assert!(consumer.error().is_none());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let mut consumer = scripted(vec![TransportEvent::Opened], 10);
        consumer.disconnect();
        consumer.disconnect();
        assert_eq!(consumer.state(), ConnectionState::Disconnected);

        consumer.connect();
        next(&mut consumer).await;
        consumer.disconnect();
        let first = consumer.snapshot();
        consumer.disconnect();
        let second = consumer.snapshot();

        assert_eq!(first.state, second.state);
        assert_eq!(first.logs.len(), second.logs.len());
        assert!(!second.is_connected);
        assert!(consumer.generation().is_none());
    }

    #[tokio::test]
    async fn test_transport_refused() {
        let mut consumer = scripted(vec![TransportEvent::Error("refused".to_string())], 10);
        consumer.ingest(entry("kept-1"));
        consumer.ingest(entry("kept-2"));

        consumer.connect();
        assert!(matches!(
            next(&mut consumer).await,
            Update::StateChanged(ConnectionState::Errored)
        ));

        let snapshot = consumer.snapshot();
        assert_eq!(snapshot.state, ConnectionState::Errored);
        assert_eq!(snapshot.error.as_deref(), Some("refused"));
        assert!(!snapshot.is_connected);
        assert_eq!(ids(&consumer), vec!["kept-2", "kept-1"]);
        assert!(consumer.retry_pending().is_none());
    }

    #[tokio::test]
    async fn test_close_after_error_keeps_error() {
        let mut consumer = scripted(
            vec![
                TransportEvent::Error("reset by peer".to_string()),
                TransportEvent::Closed,
            ],
            10,
        );
        consumer.connect();
        next(&mut consumer).await;
        assert!(matches!(next(&mut consumer).await, Update::Stale(_)));

        assert_eq!(consumer.state(), ConnectionState::Errored);
        assert_eq!(consumer.error(), Some("reset by peer"));
    }

    #[tokio::test]
    async fn test_remote_close_disconnects() {
        let mut consumer = scripted(vec![TransportEvent::Opened, TransportEvent::Closed], 10);
        consumer.connect();
        next(&mut consumer).await;
        next(&mut consumer).await;

        assert_eq!(consumer.state(), ConnectionState::Disconnected);
        assert!(consumer.error().is_none());
        assert!(consumer.generation().is_none());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_discarded() {
        let valid = serde_json::to_string(&entry("good")).unwrap();
        let mut consumer = scripted(
            vec![
                TransportEvent::Opened,
                TransportEvent::Message("{oops".to_string()),
                TransportEvent::Message(valid),
            ],
            10,
        );
        consumer.connect();

        next(&mut consumer).await;
        assert!(matches!(next(&mut consumer).await, Update::Discarded(_)));
        assert!(matches!(next(&mut consumer).await, Update::Ingested(_)));

        assert_eq!(ids(&consumer), vec!["good"]);
        assert_eq!(consumer.discarded_count(), 1);
        assert_eq!(consumer.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_clear_leaves_connection_alone() {
        let mut consumer = scripted(vec![TransportEvent::Opened], 10);
        consumer.connect();
        next(&mut consumer).await;
        consumer.ingest(entry("a"));
        consumer.ingest(entry("b"));

        consumer.clear_logs();

        assert!(consumer.logs().is_empty());
        assert_eq!(consumer.buffer().level_counts().total(), 0);
        assert_eq!(consumer.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_events_from_old_subscription_are_ignored() {
        let (mut consumer, mut sinks) = manual(10);

        consumer.connect();
        let old = sinks.recv().await.unwrap();
        consumer.disconnect();
        consumer.connect();
        let current = sinks.recv().await.unwrap();
        assert!(current.generation() > old.generation());

        old.entry(entry("stale"));
        current.opened().await;
        current.entry(entry("fresh"));

        let updates = consumer.process_pending();
        assert_eq!(updates.len(), 3);
        assert!(matches!(updates[0], Update::Stale(_)));
        assert_eq!(ids(&consumer), vec!["fresh"]);
        assert!(consumer.is_connected());
    }

    #[tokio::test]
    async fn test_connect_replaces_live_subscription() {
        let (mut consumer, mut sinks) = manual(10);

        consumer.connect();
        let first = sinks.recv().await.unwrap();
        first.opened().await;
        consumer.process_pending();

        consumer.connect();
        let second = sinks.recv().await.unwrap();
        first.entry(entry("from-first"));
        second.entry(entry("from-second"));
        consumer.process_pending();

        assert_eq!(ids(&consumer), vec!["from-second"]);
        assert_eq!(consumer.generation(), Some(second.generation()));
    }

    #[tokio::test]
    async fn test_pause_resume_leaves_gap() {
        let (mut consumer, mut sinks) = manual(10);

        consumer.connect();
        let first = sinks.recv().await.unwrap();
        first.opened().await;
        first.entry(entry("before"));
        consumer.process_pending();

        consumer.pause();
        assert!(consumer.is_paused());
        assert_eq!(consumer.state(), ConnectionState::Disconnected);
        first.entry(entry("during"));
        consumer.process_pending();

        consumer.resume();
        assert!(!consumer.is_paused());
        let second = sinks.recv().await.unwrap();
        second.opened().await;
        second.entry(entry("after"));
        consumer.process_pending();

        assert_eq!(ids(&consumer), vec!["after", "before"]);
        assert!(consumer.is_connected());
    }

    #[tokio::test]
    async fn test_flooding_producer_is_bounded_by_capacity() {
        let (mut consumer, mut sinks) = manual(3);
        consumer.connect();
        let sink = sinks.recv().await.unwrap();

        for i in 0..200_000 {
            sink.entry(entry(&format!("flood-{}", i)));
        }

        let updates = consumer.process_pending();
        assert!(updates.len() <= 3, "backlog of {} envelopes", updates.len());
        assert_eq!(ids(&consumer), vec!["flood-2", "flood-1", "flood-0"]);
        assert_eq!(consumer.snapshot().overflowed, 199_997);

        // Room again once drained
        assert!(sink.entry(entry("later")));
        consumer.process_pending();
        assert_eq!(ids(&consumer)[0], "later");
        assert_eq!(consumer.overflowed_count(), 199_997);
    }

    #[tokio::test]
    async fn test_released_transport_gets_to_finish() {
        let (tx, mut finished) = mpsc::unbounded_channel();
        let transport = CleanupTransport { finished: tx };
        let mut consumer = LogStreamConsumer::new(Arc::new(transport), 5);

        consumer.connect();
        tokio::task::yield_now().await;
        consumer.disconnect();

        assert_eq!(finished.recv().await, Some(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_policy_retries_then_gives_up() {
        let policy = ReconnectPolicy {
            max_retries: 2,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        };
        let mut consumer = scripted(vec![TransportEvent::Error("refused".to_string())], 10)
            .with_reconnect(policy);
        consumer.connect();

        for attempt in 1..=2 {
            assert!(matches!(
                next(&mut consumer).await,
                Update::StateChanged(ConnectionState::Errored)
            ));
            assert!(consumer.retry_pending().is_some());

            match next(&mut consumer).await {
                Update::RetryStarted(n) => assert_eq!(n, attempt),
                other => panic!("expected retry, got {:?}", other),
            }
            assert_eq!(consumer.state(), ConnectionState::Connecting);
        }

        next(&mut consumer).await;
        assert_eq!(consumer.state(), ConnectionState::Errored);
        assert!(consumer.retry_pending().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_connect_cancels_pending_retry() {
        let policy = ReconnectPolicy::disabled().with_max_retries(3);
        let mut consumer = scripted(vec![TransportEvent::Error("refused".to_string())], 10)
            .with_reconnect(policy);
        consumer.connect();
        next(&mut consumer).await;
        assert!(consumer.retry_pending().is_some());

        consumer.disconnect();
        assert!(consumer.retry_pending().is_none());
        assert_eq!(consumer.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_seed_keeps_fixture_order() {
        let fixtures = StaticFixtures::new(vec![entry("newest"), entry("middle"), entry("oldest")]);
        let mut consumer = scripted(Vec::new(), 10);
        consumer.seed(&fixtures, 2);
        assert_eq!(ids(&consumer), vec!["newest", "middle"]);

        consumer.ingest(entry("live"));
        assert_eq!(ids(&consumer), vec!["live", "newest", "middle"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_synthetic_feed_end_to_end() {
        let fixtures = Arc::new(StaticFixtures::new(vec![entry("fixture-a"), entry("fixture-b")]));
        let transport = SyntheticTransport::new(fixtures.clone()).with_interval(Duration::from_secs(3));
        let mut consumer = LogStreamConsumer::new(Arc::new(transport), 5);
        consumer.seed(fixtures.as_ref(), 2);
        consumer.connect();

        assert!(matches!(
            next(&mut consumer).await,
            Update::StateChanged(ConnectionState::Connected)
        ));
        match next(&mut consumer).await {
            Update::Ingested(e) => {
                assert!(e.id.starts_with("log-"));
                assert_eq!(e.message, "message fixture-a");
            }
            other => panic!("expected entry, got {:?}", other),
        }
        assert_eq!(consumer.logs().len(), 3);

        consumer.pause();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(consumer.process_pending().is_empty());
        assert_eq!(consumer.logs().len(), 3);
    }
}

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::FixtureProvider;

use super::{EventSink, Transport};

/// Default delay between synthesized entries
pub const DEFAULT_SYNTHETIC_INTERVAL: Duration = Duration::from_secs(3);

/// Simulated live feed replaying fixtures round-robin on a timer
///
/// Every tick clones the next fixture, gives it a fresh id and the current
/// timestamp, and delivers it. The cursor restarts at the first fixture on
/// each `open`.
#[derive(Clone)]
pub struct SyntheticTransport {
    fixtures: Arc<dyn FixtureProvider>,
    interval: Duration,
}

impl SyntheticTransport {
    pub fn new(fixtures: Arc<dyn FixtureProvider>) -> Self {
        Self {
            fixtures,
            interval: DEFAULT_SYNTHETIC_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        // tokio intervals panic on a zero period
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Transport for SyntheticTransport {
    fn describe(&self) -> String {
        format!("synthetic ({} fixtures)", self.fixtures.entries().len())
    }

    fn open(&self, sink: EventSink, cancel: CancellationToken) -> BoxFuture<'static, ()> {
        let fixtures = Arc::clone(&self.fixtures);
        let period = self.interval;

        async move {
            if !sink.opened().await {
                return;
            }

            if fixtures.entries().is_empty() {
                tracing::warn!("synthetic feed has no fixtures, nothing will be emitted");
                cancel.cancelled().await;
                return;
            }

            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut cursor = 0usize;

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,

                    _ = ticker.tick() => {
                        let pool = fixtures.entries();
                        let mut entry = pool[cursor % pool.len()].clone();
                        entry.id = format!("log-{}", Uuid::new_v4());
                        entry.timestamp = Utc::now();
                        cursor = cursor.wrapping_add(1);

                        if !sink.entry(entry) {
                            break;
                        }
                    }
                }
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticFixtures;
    use crate::transport::{Envelope, TransportEvent};
    use agentscope_types::{LogEntry, LogLevel};
    use tokio::sync::mpsc;

    fn pool() -> Arc<dyn FixtureProvider> {
        Arc::new(StaticFixtures::new(vec![
            LogEntry::new("a", LogLevel::Info, "first"),
            LogEntry::new("b", LogLevel::Warning, "second"),
        ]))
    }

    fn expect_entry(envelope: Envelope) -> LogEntry {
        match envelope.event {
            TransportEvent::Entry(entry) => entry,
            other => panic!("expected entry, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_round_robin_with_fresh_ids() {
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let transport = SyntheticTransport::new(pool()).with_interval(Duration::from_secs(3));
        let task = tokio::spawn(transport.open(EventSink::new(1, tx), cancel.clone()));

        assert!(matches!(
            rx.recv().await.unwrap().event,
            TransportEvent::Opened
        ));

        let first = expect_entry(rx.recv().await.unwrap());
        let second = expect_entry(rx.recv().await.unwrap());
        let third = expect_entry(rx.recv().await.unwrap());

        assert_eq!(first.message, "first");
        assert_eq!(second.message, "second");
        assert_eq!(third.message, "first");
        assert!(first.id.starts_with("log-"));
        assert_ne!(first.id, "a");
        assert_ne!(first.id, third.id);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_entry_waits_one_period() {
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let transport = SyntheticTransport::new(pool()).with_interval(Duration::from_secs(3));
        let _task = tokio::spawn(transport.open(EventSink::new(1, tx), cancel.clone()));

        let started = Instant::now();
        rx.recv().await.unwrap();
        expect_entry(rx.recv().await.unwrap());
        assert!(started.elapsed() >= Duration::from_secs(3));

        cancel.cancel();
    }

    #[tokio::test]
    async fn test_empty_pool_stays_open_until_cancelled() {
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let transport = SyntheticTransport::new(Arc::new(StaticFixtures::default()));
        let task = tokio::spawn(transport.open(EventSink::new(3, tx), cancel.clone()));

        assert!(matches!(
            rx.recv().await.unwrap().event,
            TransportEvent::Opened
        ));
        cancel.cancel();
        task.await.unwrap();
        assert!(rx.try_recv().is_err());
    }
}

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::{EventSink, Transport};

/// Live log feed over a WebSocket, one JSON entry per text frame
#[derive(Clone, Debug)]
pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for WebSocketTransport {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn open(&self, sink: EventSink, cancel: CancellationToken) -> BoxFuture<'static, ()> {
        let url = self.url.clone();

        async move {
            let connected = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                result = connect_async(url.as_str()) => result,
            };

            let mut ws = match connected {
                Ok((ws, _response)) => ws,
                Err(e) => {
                    tracing::warn!(%url, error = %e, "websocket connect failed");
                    sink.error(format!("connection to {} failed: {}", url, e)).await;
                    return;
                }
            };

            tracing::info!(%url, "websocket connected");
            if !sink.opened().await {
                return;
            }

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        // The consumer allows a short grace period for the handshake
                        if let Err(e) = ws.close(None).await {
                            tracing::debug!(%url, error = %e, "websocket close handshake failed");
                        }
                        break;
                    }

                    frame = ws.next() => {
                        let delivered = match frame {
                            Some(Ok(Message::Text(text))) => sink.message(text),
                            Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                                Ok(text) => sink.message(text),
                                Err(_) => {
                                    tracing::warn!(%url, "dropping non UTF-8 binary frame");
                                    true
                                }
                            },
                            Some(Ok(Message::Close(_))) | None => {
                                tracing::info!(%url, "websocket closed by peer");
                                sink.closed().await;
                                break;
                            }
                            Some(Ok(_)) => true,
                            Some(Err(e)) => {
                                tracing::warn!(%url, error = %e, "websocket error");
                                sink.error(format!("websocket error: {}", e)).await;
                                break;
                            }
                        };

                        // Consumer dropped
                        if !delivered {
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
    use crate::transport::{Envelope, TransportEvent};
    use futures::SinkExt;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    fn drain(rx: &mut mpsc::Receiver<Envelope>) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            events.push(envelope.event);
        }
        events
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_error() {
        let (tx, mut rx) = mpsc::channel(8);
        let transport = WebSocketTransport::new("ws://127.0.0.1:1/ws/logs");

        transport
            .open(EventSink::new(7, tx), CancellationToken::new())
            .await;

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.generation, 7);
        match envelope.event {
            TransportEvent::Error(msg) => assert!(msg.contains("127.0.0.1:1")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_before_connect_sends_nothing() {
        let (tx, mut rx) = mpsc::channel(8);
        let transport = WebSocketTransport::new("ws://127.0.0.1:1/ws/logs");
        let cancel = CancellationToken::new();
        cancel.cancel();

        transport.open(EventSink::new(1, tx), cancel).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_live_frames_reach_the_sink_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text(r#"{"id":"text-1"}"#.to_string()))
                .await
                .unwrap();
            ws.send(Message::Binary(vec![0xff, 0xfe, 0xfd])).await.unwrap();
            ws.send(Message::Binary(br#"{"id":"binary-1"}"#.to_vec()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        });

        let (tx, mut rx) = mpsc::channel(8);
        let transport = WebSocketTransport::new(format!("ws://{}/ws/logs", addr));
        transport
            .open(EventSink::new(2, tx), CancellationToken::new())
            .await;
        server.await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 4, "unexpected events: {:?}", events);
        assert!(matches!(events[0], TransportEvent::Opened));
        match (&events[1], &events[2]) {
            (TransportEvent::Message(first), TransportEvent::Message(second)) => {
                assert!(first.contains("text-1"));
                assert!(second.contains("binary-1"));
            }
            other => panic!("expected two messages, got {:?}", other),
        }
        assert!(matches!(events[3], TransportEvent::Closed));
    }
}

#![allow(dead_code)]
use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::message::{FrameError, SessionMessage};

const EVENT_BUFFER: usize = 64;

/// Typed failures of [`SessionChannel::send`]. Nothing in the channel panics
/// across the API boundary.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("session channel is not connected")]
    NotConnected,
    #[error("frame encoding failed: {0}")]
    Encode(#[from] FrameError),
}

/// What the channel reports to its owner. Transport trouble arrives as
/// `Error`/`Disconnected` status events, never as a panic or a typed failure
/// pushed into strategy logic.
#[derive(Debug)]
pub enum ChannelEvent {
    Frame(SessionMessage),
    Disconnected,
    Error(String),
}

/// One duplex connection to the strategy backend, owned by exactly one session.
///
/// `open` establishes the connection and hands back the handle plus the event
/// receiver; a single spawned task serializes all reads and writes, so frames
/// reach the consumer in transport order and never concurrently. The channel
/// performs no reconnection of its own: when the transport drops, the owner
/// gets `Disconnected` and may call `open` again if it wants a new session.
pub struct SessionChannel {
    id: Uuid,
    outbound: mpsc::UnboundedSender<String>,
    connected: Arc<AtomicBool>,
    shutdown: watch::Sender<bool>,
}

impl SessionChannel {
    /// Connects to the backend endpoint. On success returns the channel and
    /// the ordered stream of [`ChannelEvent`]s; on failure the error goes back
    /// to the caller, who may simply call `open` again.
    pub async fn open(endpoint: &str) -> Result<(Self, mpsc::Receiver<ChannelEvent>)> {
        let (ws_stream, _) = connect_async(endpoint).await?;

        let id = Uuid::new_v4();
        let connected = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        info!("Session channel {} connected to {}", id, endpoint);

        tokio::spawn(run_connection(
            id,
            ws_stream,
            outbound_rx,
            event_tx,
            Arc::clone(&connected),
            shutdown_rx,
        ));

        Ok((
            Self {
                id,
                outbound: outbound_tx,
                connected,
                shutdown: shutdown_tx,
            },
            event_rx,
        ))
    }

    /// Fire-and-forget transmit. Fails with `NotConnected` when the transport
    /// is gone; the frame is never queued for a later connection.
    pub fn send(&self, message: &SessionMessage) -> Result<(), ChannelError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ChannelError::NotConnected);
        }
        let text = message.to_text()?;
        self.outbound
            .send(text)
            .map_err(|_| ChannelError::NotConnected)?;
        debug!("Session channel {} queued {} frame", self.id, message.kind());
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Releases the transport. Safe to call from anywhere, any number of
    /// times; the underlying connection is torn down once. Frames still
    /// sitting in the outbound queue are discarded, and no further `Frame`
    /// events are delivered once this returns.
    pub fn close(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!("Session channel {} closed", self.id);
        }
        let _ = self.shutdown.send(true);
    }
}

impl Drop for SessionChannel {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_connection(
    id: Uuid,
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    event_tx: mpsc::Sender<ChannelEvent>,
    connected: Arc<AtomicBool>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
            frame = outbound_rx.recv() => match frame {
                Some(text) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        error!("Session channel {} write failed: {}", id, e);
                        connected.store(false, Ordering::SeqCst);
                        let _ = event_tx.send(ChannelEvent::Error(e.to_string())).await;
                        let _ = event_tx.send(ChannelEvent::Disconnected).await;
                        break;
                    }
                }
                // Handle dropped without an explicit close.
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
            inbound = read.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    // close() flips the flag synchronously; anything the
                    // transport still coughs up afterwards is not delivered.
                    if !connected.load(Ordering::SeqCst) {
                        debug!("Session channel {} dropped frame after close", id);
                        continue;
                    }
                    match SessionMessage::from_text(&text) {
                        Ok(message) => {
                            if event_tx.send(ChannelEvent::Frame(message)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Session channel {} dropped malformed frame: {}", id, e);
                        }
                    }
                }
                Some(Ok(Message::Binary(_))) => {
                    debug!("Session channel {} ignoring binary keepalive", id);
                }
                Some(Ok(Message::Ping(_))) => {
                    debug!("Session channel {} received ping", id);
                }
                Some(Ok(Message::Close(_))) => {
                    info!("Session channel {} closed by server", id);
                    connected.store(false, Ordering::SeqCst);
                    let _ = event_tx.send(ChannelEvent::Disconnected).await;
                    break;
                }
                Some(Err(e)) => {
                    error!("Session channel {} transport error: {}", id, e);
                    connected.store(false, Ordering::SeqCst);
                    let _ = event_tx.send(ChannelEvent::Error(e.to_string())).await;
                    let _ = event_tx.send(ChannelEvent::Disconnected).await;
                    break;
                }
                Some(Ok(_)) => {}
                None => {
                    info!("Session channel {} stream ended", id);
                    connected.store(false, Ordering::SeqCst);
                    let _ = event_tx.send(ChannelEvent::Disconnected).await;
                    break;
                }
            },
        }
    }

    connected.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::message::DepositData;
    use serde_json::Value;
    use std::future::Future;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    async fn ws_server<F, Fut>(script: F) -> String
    where
        F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                script(ws).await;
            }
        });
        format!("ws://{}", addr)
    }

    fn frame(kind: &str, data: Value) -> Message {
        Message::Text(serde_json::json!({"type": kind, "data": data}).to_string())
    }

    #[tokio::test]
    async fn test_open_fails_when_endpoint_unreachable() {
        let result = SessionChannel::open("ws://127.0.0.1:1").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_frames_delivered_in_transport_order() {
        let url = ws_server(|mut ws| async move {
            ws.send(frame(
                "strategy_init",
                serde_json::json!({"vault_id": "v1", "deposit_address": "0xabc"}),
            ))
            .await
            .unwrap();
            ws.send(frame("deposit_complete", serde_json::json!({})))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let (_channel, mut events) = SessionChannel::open(&url).await.unwrap();

        match timeout(Duration::from_secs(2), events.recv()).await.unwrap() {
            Some(ChannelEvent::Frame(SessionMessage::StrategyInit(data))) => {
                assert_eq!(data.vault_id, "v1");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match timeout(Duration::from_secs(2), events.recv()).await.unwrap() {
            Some(ChannelEvent::Frame(SessionMessage::DepositComplete(_))) => {}
            other => panic!("unexpected event: {:?}", other),
        }
        match timeout(Duration::from_secs(2), events.recv()).await.unwrap() {
            Some(ChannelEvent::Disconnected) => {}
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_frame_dropped_next_frame_still_processed() {
        let url = ws_server(|mut ws| async move {
            ws.send(Message::Text("{not valid json".to_string()))
                .await
                .unwrap();
            ws.send(Message::Text("{\"data\": {}}".to_string()))
                .await
                .unwrap();
            ws.send(frame(
                "strategy_init",
                serde_json::json!({"vault_id": "v2", "deposit_address": "0xdef"}),
            ))
            .await
            .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let (_channel, mut events) = SessionChannel::open(&url).await.unwrap();

        // The two bad frames produce nothing; the first event is the good one.
        match timeout(Duration::from_secs(2), events.recv()).await.unwrap() {
            Some(ChannelEvent::Frame(SessionMessage::StrategyInit(data))) => {
                assert_eq!(data.vault_id, "v2");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_outbound_frame_reaches_endpoint() {
        let (got_tx, got_rx) = oneshot::channel();
        let url = ws_server(move |mut ws| async move {
            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Text(text) = msg {
                    let _ = got_tx.send(text);
                    break;
                }
            }
        })
        .await;

        let (channel, _events) = SessionChannel::open(&url).await.unwrap();
        channel
            .send(&SessionMessage::Deposit(DepositData {
                vault_id: "v1".to_string(),
            }))
            .unwrap();

        let text = timeout(Duration::from_secs(2), got_rx).await.unwrap().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "deposit");
        assert_eq!(value["data"]["vault_id"], "v1");
    }

    #[tokio::test]
    async fn test_send_after_close_is_typed_error_not_queued() {
        let url = ws_server(|mut ws| async move {
            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Close(_) = msg {
                    break;
                }
            }
        })
        .await;

        let (channel, _events) = SessionChannel::open(&url).await.unwrap();
        channel.close();

        let result = channel.send(&SessionMessage::Deposit(DepositData {
            vault_id: "v1".to_string(),
        }));
        assert!(matches!(result, Err(ChannelError::NotConnected)));
        assert!(!channel.is_connected());
    }

    #[tokio::test]
    async fn test_close_stops_frame_delivery() {
        let (closed_tx, closed_rx) = oneshot::channel();
        let url = ws_server(move |mut ws| async move {
            // Wait for the client's close, then push one more frame anyway.
            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Close(_) = msg {
                    break;
                }
            }
            let _ = ws
                .send(frame("deposit_complete", serde_json::json!({})))
                .await;
            let _ = closed_tx.send(());
        })
        .await;

        let (channel, mut events) = SessionChannel::open(&url).await.unwrap();
        channel.close();
        timeout(Duration::from_secs(2), closed_rx)
            .await
            .unwrap()
            .unwrap();

        // The event stream ends without that late frame ever surfacing.
        let mut saw_frame = false;
        while let Ok(Some(event)) = timeout(Duration::from_secs(1), events.recv())
            .await
            .map_err(|_| ())
        {
            if matches!(event, ChannelEvent::Frame(_)) {
                saw_frame = true;
            }
        }
        assert!(!saw_frame);
    }

    #[tokio::test]
    async fn test_drop_releases_transport() {
        let (closed_tx, closed_rx) = oneshot::channel();
        let url = ws_server(move |mut ws| async move {
            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Close(_) = msg {
                    break;
                }
            }
            let _ = closed_tx.send(());
        })
        .await;

        {
            let (_channel, _events) = SessionChannel::open(&url).await.unwrap();
        }

        timeout(Duration::from_secs(2), closed_rx)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_server_disconnect_reported_once() {
        let url = ws_server(|mut ws| async move {
            ws.close(None).await.unwrap();
        })
        .await;

        let (channel, mut events) = SessionChannel::open(&url).await.unwrap();
        match timeout(Duration::from_secs(2), events.recv()).await.unwrap() {
            Some(ChannelEvent::Disconnected) => {}
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(!channel.is_connected());
        // No reconnect attempt: the stream just ends.
        assert!(timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .is_none());
    }
}

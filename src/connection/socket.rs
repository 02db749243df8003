//! Websocket transport
//!
//! [`SocketFactory`] is the single capability the controller needs: given a
//! URL, start a websocket and report its lifecycle as [`SocketEvent`]s. Opening
//! returns immediately and the handshake runs in the background.

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

/// Errors that prevent a connection from being established
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported page scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),

    #[error("WebSocket unavailable: {0}")]
    Unavailable(String),

    #[error("A websocket connection has already been opened")]
    AlreadyConnected,
}

/// Result type for connection operations
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Lifecycle notifications from a socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// Handshake completed
    Opened,
    /// A text frame arrived
    Message(String),
    /// The socket is gone; sent exactly once
    Closed,
}

/// Receiver side of a socket's lifecycle notifications
pub type SocketEvents = mpsc::UnboundedReceiver<SocketEvent>;

/// Frames queued for the socket task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Close,
}

/// Write side of an open socket
#[derive(Debug, Clone)]
pub struct SocketHandle {
    outbound: mpsc::UnboundedSender<OutboundFrame>,
}

impl SocketHandle {
    /// Create a handle together with the queue it feeds
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        (Self { outbound }, rx)
    }

    /// Queue a text frame. Returns false if the socket task has gone away.
    pub fn send(&self, text: String) -> bool {
        self.outbound.send(OutboundFrame::Text(text)).is_ok()
    }

    /// Ask the socket to close
    pub fn close(&self) {
        let _ = self.outbound.send(OutboundFrame::Close);
    }
}

/// Capability to construct a websocket for a URL
pub trait SocketFactory {
    fn open(&self, url: &Url) -> ConnectionResult<(SocketHandle, SocketEvents)>;
}

/// Socket factory backed by tokio-tungstenite
///
/// Needs a running tokio runtime. `wss` connections use rustls with the
/// webpki root certificates.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteFactory;

impl SocketFactory for TungsteniteFactory {
    fn open(&self, url: &Url) -> ConnectionResult<(SocketHandle, SocketEvents)> {
        match url.scheme() {
            "ws" => {}
            "wss" => install_crypto_provider(),
            other => {
                return Err(ConnectionError::InvalidUrl(format!(
                    "{}: '{}' is not a websocket scheme",
                    url, other
                )))
            }
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ConnectionError::Unavailable(e.to_string()))?;

        let (handle, outbound_rx) = SocketHandle::channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        runtime.spawn(run_socket(url.to_string(), outbound_rx, event_tx));

        Ok((handle, event_rx))
    }
}

/// Make ring the process-wide rustls provider unless one is already set
fn install_crypto_provider() {
    if rustls::crypto::CryptoProvider::get_default().is_none() {
        let _ = rustls::crypto::ring::default_provider().install_default();
    }
}

/// Drive one socket from handshake to close
async fn run_socket(
    url: String,
    mut outbound_rx: mpsc::UnboundedReceiver<OutboundFrame>,
    events: mpsc::UnboundedSender<SocketEvent>,
) {
    match connect_async(url.as_str()).await {
        Ok((stream, _response)) => {
            info!("WebSocket connected to {}", url);
            let _ = events.send(SocketEvent::Opened);

            if let Err(e) = pump(stream, &mut outbound_rx, &events).await {
                error!("WebSocket error on {}: {}", url, e);
            }
        }
        Err(e) => {
            error!("Failed to connect to {}: {}", url, e);
        }
    }

    info!("WebSocket connection to {} closed", url);
    let _ = events.send(SocketEvent::Closed);
}

/// Move frames between the socket and the channels until either side ends
///
/// A close from either side is not final until the stream ends: reading on
/// lets tungstenite flush the close reply and finish the handshake.
async fn pump(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    outbound_rx: &mut mpsc::UnboundedReceiver<OutboundFrame>,
    events: &mpsc::UnboundedSender<SocketEvent>,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let (mut ws_sender, mut ws_receiver) = stream.split();
    let mut closing = false;

    loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!("Received message: {}", text);
                        let _ = events.send(SocketEvent::Message(text));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        warn!("Received binary message ({} bytes), ignoring", data.len());
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if !closing {
                            ws_sender.send(Message::Pong(data)).await?;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        info!("Close frame received: {:?}", frame);
                        closing = true;
                    }
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(e)) => return Err(e),
                    None => break,
                }
            }
            frame = outbound_rx.recv(), if !closing => {
                match frame {
                    Some(OutboundFrame::Text(text)) => {
                        debug!("Sending message: {}", text);
                        ws_sender.send(Message::Text(text)).await?;
                    }
                    Some(OutboundFrame::Close) | None => {
                        debug!("Closing connection");
                        ws_sender.send(Message::Close(None)).await?;
                        closing = true;
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    #[test]
    fn test_handle_send_after_drop() {
        let (handle, rx) = SocketHandle::channel();
        assert!(handle.send("live".to_string()));
        drop(rx);
        assert!(!handle.send("dead".to_string()));
    }

    #[test]
    fn test_open_without_runtime_is_unavailable() {
        let url = Url::parse("ws://127.0.0.1:9/").unwrap();
        let result = TungsteniteFactory.open(&url);
        assert!(matches!(result, Err(ConnectionError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_open_accepts_wss() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("wss://{}/", addr)).unwrap();
        let (_handle, mut events) = TungsteniteFactory.open(&url).unwrap();

        assert_eq!(events.recv().await, Some(SocketEvent::Closed));
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn test_open_rejects_non_websocket_url() {
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let result = TungsteniteFactory.open(&url);
        assert!(matches!(result, Err(ConnectionError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_refused_connection_reports_closed_only() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("ws://{}/", addr)).unwrap();
        let (_handle, mut events) = TungsteniteFactory.open(&url).unwrap();

        assert_eq!(events.recv().await, Some(SocketEvent::Closed));
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn test_text_frames_both_ways() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            ws.send(Message::Text("hello".to_string())).await.unwrap();
            loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => return text,
                    Some(Ok(_)) => continue,
                    other => panic!("unexpected frame: {:?}", other),
                }
            }
        });

        let url = Url::parse(&format!("ws://{}/", addr)).unwrap();
        let (handle, mut events) = TungsteniteFactory.open(&url).unwrap();

        assert_eq!(events.recv().await, Some(SocketEvent::Opened));
        assert_eq!(events.recv().await, Some(SocketEvent::Message("hello".to_string())));

        assert!(handle.send("nextMask".to_string()));
        assert_eq!(server.await.unwrap(), "nextMask");

        handle.close();
        assert_eq!(events.recv().await, Some(SocketEvent::Closed));
    }

    #[tokio::test]
    async fn test_server_close_is_acknowledged() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            ws.send(Message::Close(None)).await.unwrap();
            ws.next().await
        });

        let url = Url::parse(&format!("ws://{}/", addr)).unwrap();
        let (_handle, mut events) = TungsteniteFactory.open(&url).unwrap();

        assert_eq!(events.recv().await, Some(SocketEvent::Opened));
        let reply = server.await.unwrap();
        assert!(matches!(reply, Some(Ok(Message::Close(_)))), "got {:?}", reply);

        assert_eq!(events.recv().await, Some(SocketEvent::Closed));
    }

    #[tokio::test]
    async fn test_client_close_waits_for_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            // Reading the close queues the reply, the next read flushes it
            let first = ws.next().await;
            let rest = ws.next().await;
            (first, rest)
        });

        let url = Url::parse(&format!("ws://{}/", addr)).unwrap();
        let (handle, mut events) = TungsteniteFactory.open(&url).unwrap();

        assert_eq!(events.recv().await, Some(SocketEvent::Opened));
        handle.close();

        let (first, rest) = server.await.unwrap();
        assert!(matches!(first, Some(Ok(Message::Close(_)))), "got {:?}", first);
        assert!(rest.is_none(), "got {:?}", rest);
        assert_eq!(events.recv().await, Some(SocketEvent::Closed));
    }
}

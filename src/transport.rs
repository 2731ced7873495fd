// ── Chatlink: Real-Time Transport ──────────────────────────────────────────
// The seam between the session and whatever carries its frames. A session
// owns exactly one transport at a time; the driver task splits it into a
// sink half (outbound writes, close) and a stream half (inbound frames) so
// it can select over inbound frames and session commands, and no transport
// half ever sees concurrent calls.
//
// `WsTransport` is the production implementation over tokio-tungstenite.
// Ping/Pong and raw protocol frames are not chat-visible and are swallowed
// by the stream half (tungstenite queues Pong replies on its own).

use crate::error::ChatResult;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use log::debug;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};

// ── Frames ─────────────────────────────────────────────────────────────────

/// The chat-visible events a transport can deliver. Text and binary frames
/// may both carry a UTF-8 JSON payload; the session decodes both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    /// The peer closed the connection.
    Close,
}

// ── Transport traits ───────────────────────────────────────────────────────

#[async_trait]
pub trait TransportSink: Send {
    /// Write one outbound text payload.
    async fn send_text(&mut self, text: String) -> ChatResult<()>;

    /// Close the transport. Safe to call on an already-closed transport.
    async fn close(&mut self) -> ChatResult<()>;
}

#[async_trait]
pub trait TransportStream: Send {
    /// Wait for the next inbound frame. `None` means the stream has ended.
    async fn next_frame(&mut self) -> Option<ChatResult<Frame>>;
}

/// An open bidirectional connection, ready to be armed on a session.
pub trait Transport: Send {
    fn split(self: Box<Self>) -> (Box<dyn TransportSink>, Box<dyn TransportStream>);
}

// ── WebSocket implementation ───────────────────────────────────────────────

type WsInner = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WsTransport {
    inner: WsInner,
}

impl WsTransport {
    /// Open a WebSocket to a resolved `ws://` / `wss://` target.
    pub async fn connect(url: &str) -> ChatResult<Self> {
        let (inner, _) = connect_async(url).await?;
        debug!("[transport] WebSocket open: {}", url);
        Ok(WsTransport { inner })
    }
}

impl Transport for WsTransport {
    fn split(self: Box<Self>) -> (Box<dyn TransportSink>, Box<dyn TransportStream>) {
        let (tx, rx) = self.inner.split();
        (Box::new(WsSink(tx)), Box::new(WsStream(rx)))
    }
}

struct WsSink(SplitSink<WsInner, WsMessage>);

#[async_trait]
impl TransportSink for WsSink {
    async fn send_text(&mut self, text: String) -> ChatResult<()> {
        self.0.send(WsMessage::Text(text)).await?;
        Ok(())
    }

    async fn close(&mut self) -> ChatResult<()> {
        // Closing an already-closed stream reports ConnectionClosed;
        // that is the state we wanted, not a failure.
        match self.0.close().await {
            Ok(()) => Ok(()),
            Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

struct WsStream(SplitStream<WsInner>);

#[async_trait]
impl TransportStream for WsStream {
    async fn next_frame(&mut self) -> Option<ChatResult<Frame>> {
        loop {
            let msg = match self.0.next().await? {
                Ok(m) => m,
                Err(e) => return Some(Err(e.into())),
            };
            match msg {
                WsMessage::Text(t) => return Some(Ok(Frame::Text(t))),
                WsMessage::Binary(b) => return Some(Ok(Frame::Binary(b))),
                WsMessage::Close(_) => {
                    debug!("[transport] Close frame received");
                    return Some(Ok(Frame::Close));
                }
                // Ping/Pong and raw protocol frames: nothing for the chat layer.
                _ => {}
            }
        }
    }
}

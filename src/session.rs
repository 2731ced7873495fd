// ── Chatlink: Chat Session ─────────────────────────────────────────────────
// Owns the lifecycle of one real-time connection to a chat room and the
// ordered, append-only log of messages exchanged over it.
//
// State machine:
//
//   Disconnected → (connect) → Connecting → (transport open) → Connected
//   Connected → (disconnect | peer close | transport error) → Disconnected
//
// A dropped connection is terminal until the caller re-initiates `connect` —
// no retry, no backoff. The message log survives a disconnect.
//
// All transport activity for a session runs on a single driver task that
// selects over inbound frames and session commands, so no two transport
// callbacks ever overlap. `connect` / `send` / `disconnect` are expected to
// arrive from one logical UI event loop, never concurrently with each other.

use crate::error::{ChatError, ChatResult};
use crate::locator::RoomLocator;
use crate::message::ChatMessage;
use crate::target::{resolve_socket_target, PageContext};
use crate::transport::{Frame, Transport, WsTransport};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

// ── Observable state & events ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

/// The four observable transitions, surfaced as an event stream for the
/// presentation layer: open, message, close, error.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected,
    Message(ChatMessage),
    Disconnected,
    /// User-visible connection failure notice (setup or live transport).
    ConnectionFailed(String),
}

enum Command {
    Send(String),
    Close,
}

// ── Shared session state ───────────────────────────────────────────────────

struct Shared {
    state: Mutex<SessionState>,
    username: Mutex<Option<String>>,
    messages: Mutex<Vec<ChatMessage>>,
    /// Bumped on every disconnect and every arm. A driver (or a pending
    /// connect) only settles the session if its generation is still current.
    generation: AtomicU64,
    event_tx: Mutex<Option<mpsc::UnboundedSender<SessionEvent>>>,
}

impl Shared {
    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &*self.event_tx.lock() {
            let _ = tx.send(event);
        }
    }

    /// Reset to Disconnected, but only if `gen` is still the live attempt.
    fn settle_disconnected(&self, gen: u64) -> bool {
        if self.generation.load(Ordering::Acquire) != gen {
            return false;
        }
        *self.state.lock() = SessionState::Disconnected;
        true
    }

    /// Decode, validate, and append one inbound payload. Malformed payloads
    /// are dropped with a diagnostic only — they never fail the session.
    fn accept_payload(&self, text: &str) {
        match ChatMessage::from_payload(text) {
            Ok(msg) => {
                debug!("[session] Message from {}", msg.username);
                self.messages.lock().push(msg.clone());
                self.emit(SessionEvent::Message(msg));
            }
            Err(e) => debug!("[session] Dropping inbound payload: {}", e),
        }
    }
}

// ── ChatSession ────────────────────────────────────────────────────────────

pub struct ChatSession {
    page: PageContext,
    locator: RoomLocator,
    shared: Arc<Shared>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Command>>>,
}

impl ChatSession {
    /// A fresh session: Disconnected, empty log. The page context supplies
    /// the origin the locator call and any bare-path socket target resolve
    /// against.
    pub fn new(page: PageContext) -> ChatResult<Self> {
        let locator = RoomLocator::new(&page)?;
        Ok(ChatSession {
            page,
            locator,
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::Disconnected),
                username: Mutex::new(None),
                messages: Mutex::new(Vec::new()),
                generation: AtomicU64::new(0),
                event_tx: Mutex::new(None),
            }),
            outbound: Mutex::new(None),
        })
    }

    // ── Presentation-facing reads ──────────────────────────────────────

    pub fn state(&self) -> SessionState {
        *self.shared.state.lock()
    }

    /// Snapshot of the message log, in arrival order.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.shared.messages.lock().clone()
    }

    pub fn username(&self) -> Option<String> {
        self.shared.username.lock().clone()
    }

    /// Subscribe to session events. Replaces any previous subscription —
    /// the session has one presentation layer, not many.
    pub fn events(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.shared.event_tx.lock() = Some(tx);
        rx
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    /// Connect to `room` as `username`.
    ///
    /// An empty (trimmed) username fails with `InvalidInput` before any
    /// network activity. Otherwise the room locator is asked for a
    /// connection target, the target is resolved against the page origin,
    /// and a WebSocket is opened and armed. Any failure along the way is a
    /// `ConnectionSetup` error: the state returns to Disconnected and a
    /// `ConnectionFailed` event carries the user-visible notice.
    ///
    /// Calling `disconnect` while the attempt is pending cancels it: the
    /// transport, if it finishes opening, is closed and never armed.
    pub async fn connect(&self, username: &str, room: &str) -> ChatResult<()> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ChatError::invalid_input("username is required"));
        }

        {
            let mut state = self.shared.state.lock();
            if *state != SessionState::Disconnected {
                return Err(ChatError::setup("session already has a live connection"));
            }
            *state = SessionState::Connecting;
        }
        let gen = self.shared.generation.load(Ordering::Acquire);

        let setup = async {
            let body = self.locator.socket_target(room).await?;
            let url = resolve_socket_target(&body, &self.page)?;
            info!("[session] Connecting to {}", url);
            // Handshake failures happen before any transport exists.
            let transport = WsTransport::connect(&url).await.map_err(|e| match e {
                ChatError::Transport(msg) => ChatError::ConnectionSetup(msg),
                other => other,
            })?;
            Ok::<Box<dyn Transport>, ChatError>(Box::new(transport))
        };

        let transport = match setup.await {
            Ok(t) => t,
            Err(e) => {
                warn!("[session] Connection setup failed: {}", e);
                if self.shared.settle_disconnected(gen) {
                    self.shared.emit(SessionEvent::ConnectionFailed(e.to_string()));
                }
                return Err(e);
            }
        };

        if self.shared.generation.load(Ordering::Acquire) != gen {
            // disconnect() arrived while the attempt was pending.
            info!("[session] Connection attempt canceled");
            let (mut sink, _stream) = transport.split();
            let _ = sink.close().await;
            return Err(ChatError::setup("connection attempt canceled"));
        }

        self.arm(username, transport);
        Ok(())
    }

    /// Arm the session on an already-open transport. `connect` bottoms out
    /// here after locator resolution; alternative transports (and tests)
    /// call it directly.
    pub fn attach_transport(
        &self,
        username: &str,
        transport: Box<dyn Transport>,
    ) -> ChatResult<()> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ChatError::invalid_input("username is required"));
        }
        if self.state() == SessionState::Connected {
            return Err(ChatError::setup("session already has a live connection"));
        }
        self.arm(username, transport);
        Ok(())
    }

    fn arm(&self, username: &str, transport: Box<dyn Transport>) {
        *self.shared.state.lock() = SessionState::Connected;
        *self.shared.username.lock() = Some(username.to_string());
        let gen = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        *self.outbound.lock() = Some(cmd_tx);

        let shared = self.shared.clone();
        tokio::spawn(drive(shared, gen, transport, cmd_rx));

        info!("[session] Connected as {}", username);
        self.shared.emit(SessionEvent::Connected);
    }

    /// Send a chat message. A no-op unless the session is Connected and the
    /// trimmed text is non-empty. The message is not appended to the local
    /// log — only what arrives back over the transport is.
    pub fn send(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if self.state() != SessionState::Connected {
            debug!("[session] Ignoring send while not connected");
            return;
        }
        let Some(username) = self.username() else {
            return;
        };

        let msg = ChatMessage::outbound(&username, text);
        match msg.to_json() {
            Ok(payload) => {
                if let Some(tx) = &*self.outbound.lock() {
                    let _ = tx.send(Command::Send(payload));
                }
            }
            Err(e) => warn!("[session] Failed to serialize outbound message: {}", e),
        }
    }

    /// Close the transport, if one is open, and return to Disconnected.
    /// Idempotent; called while a connect attempt is still pending it
    /// cancels the attempt instead.
    pub fn disconnect(&self) {
        let was = {
            let mut state = self.shared.state.lock();
            let was = *state;
            *state = SessionState::Disconnected;
            was
        };
        if was == SessionState::Disconnected {
            return;
        }

        // Invalidate the live driver / pending attempt before closing.
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(tx) = self.outbound.lock().take() {
            let _ = tx.send(Command::Close);
        }
        info!("[session] Disconnected");
        self.shared.emit(SessionEvent::Disconnected);
    }
}

// ── Driver task ────────────────────────────────────────────────────────────

/// The single task that owns the transport for one connection. Serializes
/// every callback: inbound frames, outbound sends, and close all pass
/// through this loop, so the session needs no further synchronization.
async fn drive(
    shared: Arc<Shared>,
    gen: u64,
    transport: Box<dyn Transport>,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
) {
    let (mut sink, mut stream) = transport.split();

    // `None` is an orderly shutdown, `Some(reason)` a transport failure.
    let failure: Option<String> = loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Send(payload)) => {
                    if let Err(e) = sink.send_text(payload).await {
                        warn!("[session] Outbound write failed: {}", e);
                        break Some(e.to_string());
                    }
                }
                Some(Command::Close) | None => {
                    let _ = sink.close().await;
                    break None;
                }
            },
            frame = stream.next_frame() => match frame {
                Some(Ok(Frame::Text(text))) => shared.accept_payload(&text),
                Some(Ok(Frame::Binary(bytes))) => match String::from_utf8(bytes) {
                    // Binary frames may wrap UTF-8 text; unwrap and treat alike.
                    Ok(text) => shared.accept_payload(&text),
                    Err(_) => debug!("[session] Dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Frame::Close)) | None => {
                    info!("[session] Transport closed by peer");
                    break None;
                }
                Some(Err(e)) => {
                    warn!("[session] Transport error: {}", e);
                    break Some(e.to_string());
                }
            }
        }
    };

    // Only the generation that armed this driver may settle the session —
    // after an explicit disconnect (or a newer connect) this is a stale
    // task whose transitions were already reported.
    if shared.settle_disconnected(gen) {
        if let Some(reason) = failure {
            shared.emit(SessionEvent::ConnectionFailed(reason));
        }
        shared.emit(SessionEvent::Disconnected);
    }
}

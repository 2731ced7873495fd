// Chatlink — a minimal chat-room session client.
//
// One component, one responsibility: `ChatSession` owns the lifecycle of a
// single real-time connection to a chat room and the ordered log of messages
// exchanged over it. The presentation layer renders session state and
// forwards user intents; the room locator service maps a room id to a
// connection target. Both stay outside this crate.
//
//   Presentation → ChatSession::connect → RoomLocator → WsTransport
//     → inbound frames → message log → Presentation re-renders
//
// Wire format: one UTF-8 JSON object per message,
// `{"username": string, "message": string, "timestamp": epoch-ms}`.
// No envelope, no acks, no reconnection — a dropped connection is terminal
// until the user connects again.

pub mod error;
pub mod locator;
pub mod message;
pub mod session;
pub mod target;
pub mod transport;

pub use error::{ChatError, ChatResult};
pub use locator::RoomLocator;
pub use message::ChatMessage;
pub use session::{ChatSession, SessionEvent, SessionState};
pub use target::{resolve_socket_target, PageContext, SocketTarget};
pub use transport::{Frame, Transport, TransportSink, TransportStream, WsTransport};

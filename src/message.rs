// ── Chatlink: Wire Message Type ────────────────────────────────────────────
// One chat message as it travels over the transport: a single UTF-8 JSON
// object with no envelope, no sequence numbers, no acknowledgement.
//
//   { "username": "alice", "message": "hi", "timestamp": 1700000000000 }
//
// Produced locally when sending, parsed from inbound frames when receiving.
// Inbound payloads are accepted only if `username` and `message` are both
// non-empty; `timestamp` is optional on the wire and defaults to 0.

use crate::error::{ChatError, ChatResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub username: String,
    pub message: String,
    /// Wall-clock send time in epoch milliseconds.
    #[serde(default)]
    pub timestamp: i64,
}

impl ChatMessage {
    /// Build an outbound message: text is trimmed, timestamp is now.
    /// Callers must have checked that the trimmed text is non-empty.
    pub fn outbound(username: &str, text: &str) -> Self {
        ChatMessage {
            username: username.to_string(),
            message: text.trim().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Parse and validate one inbound payload.
    ///
    /// Structural JSON errors and missing/empty required fields both come
    /// back as `ChatError::MalformedMessage` — the session logs and drops
    /// these, it never fails on them.
    pub fn from_payload(text: &str) -> ChatResult<Self> {
        let msg: ChatMessage = serde_json::from_str(text)?;
        if msg.username.is_empty() {
            return Err(ChatError::malformed("payload has no username"));
        }
        if msg.message.is_empty() {
            return Err(ChatError::malformed("payload has no message body"));
        }
        Ok(msg)
    }

    /// Serialize for the wire.
    pub fn to_json(&self) -> ChatResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

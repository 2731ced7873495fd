// ── Chatlink: Error Types ──────────────────────────────────────────────────
// Single canonical error enum for the crate, built with `thiserror`.
//
// Design rules:
//   • Variants mirror the failure taxonomy of the session: bad local input,
//     setup failure before a transport exists, failure of a live transport,
//     and unusable inbound payloads.
//   • External error conversions map into the coarse variant that matches
//     where they can occur (reqwest → setup, serde_json → malformed payload,
//     tungstenite → transport).
//   • Every failure is terminal for the current attempt only — nothing here
//     is fatal to the process, and none is retried automatically.

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ChatError {
    /// Rejected locally before any network activity (empty username, a
    /// connect while one is already live, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Room locator unreachable, returned a non-success status, or returned
    /// a body that cannot be turned into a connection target. Also covers a
    /// failed WebSocket handshake — no transport ever existed.
    #[error("connection setup failed: {0}")]
    ConnectionSetup(String),

    /// A live transport signaled an error or a write to it failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// An inbound payload failed to decode, parse, or validate. Never
    /// surfaced as a session failure — callers log and drop.
    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

// ── External conversions ───────────────────────────────────────────────────

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        ChatError::ConnectionSetup(e.to_string())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::MalformedMessage(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ChatError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ChatError::Transport(e.to_string())
    }
}

// ── Convenience constructors ───────────────────────────────────────────────

impl ChatError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn setup(message: impl Into<String>) -> Self {
        Self::ConnectionSetup(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedMessage(message.into())
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All fallible crate operations return this type.
pub type ChatResult<T> = Result<T, ChatError>;

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_detail() {
        let e = ChatError::invalid_input("username is required");
        assert_eq!(e.to_string(), "invalid input: username is required");

        let e = ChatError::setup("locator returned 404");
        assert_eq!(e.to_string(), "connection setup failed: locator returned 404");
    }

    #[test]
    fn serde_error_maps_to_malformed() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let e: ChatError = parse_err.into();
        assert!(matches!(e, ChatError::MalformedMessage(_)));
    }
}

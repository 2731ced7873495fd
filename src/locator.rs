// ── Chatlink: Room Locator Client ──────────────────────────────────────────
// One-shot HTTP call that maps a room identifier to a connection target:
//
//   GET {origin}/api/getsocketurl?room={roomId}  →  text body
//
// The body is either a full transport URL or a bare path (see target.rs).
// No authentication, no structured error body: any non-success status or
// unusable body is a connection-setup failure.
//
// The client carries connect/request timeouts so an unresponsive locator
// fails the attempt instead of leaving it pending forever.

use crate::error::{ChatError, ChatResult};
use crate::target::PageContext;
use log::debug;
use std::time::Duration;

const LOCATOR_ENDPOINT: &str = "/api/getsocketurl";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct RoomLocator {
    client: reqwest::Client,
    base_url: String,
}

impl RoomLocator {
    /// Locator under the page's own origin (host + scheme).
    pub fn new(page: &PageContext) -> ChatResult<Self> {
        let base_url = format!("{}://{}", page.http_scheme(), page.host);
        Self::with_base_url(base_url)
    }

    /// Locator under an explicit base URL, e.g. `https://chat.example.com`.
    pub fn with_base_url(base_url: impl Into<String>) -> ChatResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChatError::setup(format!("failed to build HTTP client: {}", e)))?;
        Ok(RoomLocator { client, base_url: base_url.into() })
    }

    /// Fetch the raw connection target for `room`. Returns the response body
    /// as-is; normalization against the page origin happens in target.rs.
    pub async fn socket_target(&self, room: &str) -> ChatResult<String> {
        let url = format!(
            "{}{}?room={}",
            self.base_url,
            LOCATOR_ENDPOINT,
            urlencoding::encode(room)
        );
        debug!("[locator] Requesting socket target: {}", url);

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ChatError::setup(format!(
                "locator returned HTTP {} for room '{}'",
                status.as_u16(),
                room
            )));
        }

        let body = resp.text().await?;
        debug!("[locator] Room '{}' resolved to '{}'", room, body.trim());
        Ok(body)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_follows_page_scheme() {
        let secure = RoomLocator::new(&PageContext::new("chat.example.com", true)).unwrap();
        assert_eq!(secure.base_url, "https://chat.example.com");

        let plain = RoomLocator::new(&PageContext::new("localhost:8080", false)).unwrap();
        assert_eq!(plain.base_url, "http://localhost:8080");
    }

    #[tokio::test]
    async fn unreachable_locator_is_setup_error() {
        // Port 9 (discard) on localhost is not listening.
        let locator = RoomLocator::with_base_url("http://127.0.0.1:9").unwrap();
        let err = locator.socket_target("general").await.unwrap_err();
        assert!(matches!(err, ChatError::ConnectionSetup(_)));
    }
}

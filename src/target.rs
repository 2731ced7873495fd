// ── Chatlink: Connection Target Resolution ─────────────────────────────────
// The room locator's response body is not contractually fixed-shape: it may
// be a complete transport URL (scheme-prefixed) or a bare path meant to be
// joined with the page's own host. Both must be tolerated.
//
// The ambient window/page origin of a browser client is replaced here by an
// explicit `PageContext` value, so target resolution is a pure function from
// (response text, page context) → URL and testable on its own.

use crate::error::{ChatError, ChatResult};
use log::warn;

// ── Page context ───────────────────────────────────────────────────────────

/// The origin the session runs under: host (with optional port) plus whether
/// the page itself is served over a secure scheme. A secure page yields
/// `wss://` transports and `https://` locator calls; an insecure one `ws://`
/// and `http://`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub host: String,
    pub secure: bool,
}

impl PageContext {
    pub fn new(host: impl Into<String>, secure: bool) -> Self {
        PageContext { host: host.into(), secure }
    }

    /// Scheme for real-time transports under this origin.
    pub fn socket_scheme(&self) -> &'static str {
        if self.secure { "wss" } else { "ws" }
    }

    /// Scheme for plain HTTP calls (the locator) under this origin.
    pub fn http_scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }
}

// ── Locator response shapes ────────────────────────────────────────────────

/// The two shapes a locator response can take, resolved by a prefix check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketTarget {
    /// A complete URL, scheme already present.
    Url(String),
    /// A path to be joined with the page host and inferred socket scheme.
    Path(String),
}

impl SocketTarget {
    /// Classify a raw locator response body.
    pub fn parse(body: &str) -> ChatResult<Self> {
        let body = body.trim();
        if body.is_empty() {
            return Err(ChatError::setup("locator returned an empty body"));
        }
        if body.contains("://") {
            return Ok(SocketTarget::Url(body.to_string()));
        }
        Ok(SocketTarget::Path(body.to_string()))
    }

    /// Resolve to a concrete `ws://` / `wss://` URL under the given origin.
    ///
    /// Full URLs pass through; `http://` / `https://` ones are coerced to the
    /// matching socket scheme, any other scheme is rejected. Paths are joined
    /// with the page host under its inferred socket scheme.
    pub fn resolve(&self, page: &PageContext) -> ChatResult<String> {
        match self {
            SocketTarget::Url(url) => {
                if url.starts_with("ws://") || url.starts_with("wss://") {
                    return Ok(url.clone());
                }
                if url.starts_with("https://") {
                    return Ok(url.replacen("https", "wss", 1));
                }
                if url.starts_with("http://") {
                    warn!("[target] Coercing plaintext http:// locator URL to ws://");
                    return Ok(url.replacen("http", "ws", 1));
                }
                let scheme = url.split("://").next().unwrap_or("");
                Err(ChatError::setup(format!(
                    "unsupported locator URL scheme '{}://'",
                    scheme
                )))
            }
            SocketTarget::Path(path) => {
                let sep = if path.starts_with('/') { "" } else { "/" };
                Ok(format!("{}://{}{}{}", page.socket_scheme(), page.host, sep, path))
            }
        }
    }
}

/// One-step normalization: locator response body + page origin → transport URL.
pub fn resolve_socket_target(body: &str, page: &PageContext) -> ChatResult<String> {
    SocketTarget::parse(body)?.resolve(page)
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn secure_page() -> PageContext {
        PageContext::new("chat.example.com", true)
    }

    #[test]
    fn path_on_secure_page_becomes_wss() {
        let url = resolve_socket_target("/ws/general", &secure_page()).unwrap();
        assert_eq!(url, "wss://chat.example.com/ws/general");
    }

    #[test]
    fn path_on_insecure_page_becomes_ws() {
        let page = PageContext::new("localhost:8080", false);
        let url = resolve_socket_target("/ws/general", &page).unwrap();
        assert_eq!(url, "ws://localhost:8080/ws/general");
    }

    #[test]
    fn path_without_leading_slash_gets_one() {
        let url = resolve_socket_target("ws/general", &secure_page()).unwrap();
        assert_eq!(url, "wss://chat.example.com/ws/general");
    }

    #[test]
    fn full_socket_urls_pass_through() {
        let url = resolve_socket_target("wss://other.example.com/ws", &secure_page()).unwrap();
        assert_eq!(url, "wss://other.example.com/ws");

        let url = resolve_socket_target("ws://other.example.com/ws", &secure_page()).unwrap();
        assert_eq!(url, "ws://other.example.com/ws");
    }

    #[test]
    fn http_urls_are_coerced_to_socket_schemes() {
        let url = resolve_socket_target("https://other.example.com/ws", &secure_page()).unwrap();
        assert_eq!(url, "wss://other.example.com/ws");

        let url = resolve_socket_target("http://other.example.com/ws", &secure_page()).unwrap();
        assert_eq!(url, "ws://other.example.com/ws");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let url = resolve_socket_target("  /ws/general\n", &secure_page()).unwrap();
        assert_eq!(url, "wss://chat.example.com/ws/general");
    }

    #[test]
    fn empty_body_is_setup_error() {
        let err = resolve_socket_target("   ", &secure_page()).unwrap_err();
        assert!(matches!(err, ChatError::ConnectionSetup(_)));
    }

    #[test]
    fn foreign_schemes_are_rejected() {
        let err = resolve_socket_target("ftp://files.example.com/ws", &secure_page()).unwrap_err();
        assert!(matches!(err, ChatError::ConnectionSetup(_)));
    }

    #[test]
    fn page_context_schemes_track_security() {
        assert_eq!(secure_page().socket_scheme(), "wss");
        assert_eq!(secure_page().http_scheme(), "https");
        let plain = PageContext::new("localhost", false);
        assert_eq!(plain.socket_scheme(), "ws");
        assert_eq!(plain.http_scheme(), "http");
    }
}

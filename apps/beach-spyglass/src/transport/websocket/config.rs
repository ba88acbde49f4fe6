use url::Url;

use crate::transport::{Endpoint, TransportError};

/// Connection settings for the producer's WebSocket endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSocketConfig {
    pub host: String,
    pub port: u16,
    /// Path on the host, e.g. "/ws".
    pub path: String,
    /// Whether to use TLS (wss:// vs ws://)
    pub use_tls: bool,
}

impl WebSocketConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            path: "/".to_string(),
            use_tls: false,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Build the full WebSocket URL
    pub fn build_url(&self) -> String {
        let scheme = if self.use_tls { "wss" } else { "ws" };
        // Normalize localhost to avoid IPv6 issues
        let host = if self.host.eq_ignore_ascii_case("localhost") {
            "127.0.0.1"
        } else {
            self.host.as_str()
        };

        let mut url = format!("{scheme}://{host}:{}", self.port);
        if !self.path.starts_with('/') {
            url.push('/');
        }
        url.push_str(&self.path);
        url
    }

    pub fn endpoint(&self) -> Result<Endpoint, TransportError> {
        Endpoint::from_url(Url::parse(&self.build_url())?)
    }
}

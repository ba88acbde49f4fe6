use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

pub mod mock;
pub mod websocket;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("connection refused: {0}")]
    Refused(String),
}

/// Where the frame producer lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self, TransportError> {
        Self::from_url(Url::parse(raw)?)
    }

    pub fn from_url(url: Url) -> Result<Self, TransportError> {
        match url.scheme() {
            "ws" | "wss" => Ok(Self { url }),
            other => Err(TransportError::UnsupportedScheme(other.to_string())),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "wss"
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.url.fmt(f)
    }
}

/// One live connection. Each item is exactly one frame; `None` means the
/// connection is gone, whether it closed cleanly or not.
#[async_trait]
pub trait FrameStream: Send {
    async fn next_frame(&mut self) -> Option<Result<Bytes, TransportError>>;
}

/// Opens connections to an [`Endpoint`]; called once per (re)connect.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn FrameStream>, TransportError>;
}

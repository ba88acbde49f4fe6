use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};
use tracing::{debug, trace};

use super::{Connector, Endpoint, FrameStream, TransportError};

pub mod config;
pub use config::WebSocketConfig;

/// Connects to the producer over ws:// or wss://.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn FrameStream>, TransportError> {
        let (ws_stream, response) = connect_async(endpoint.url().as_str()).await?;
        debug!(
            target: "spyglass::transport",
            %endpoint,
            status = %response.status(),
            "websocket connected"
        );
        Ok(Box::new(WebSocketFrames { inner: ws_stream }))
    }
}

struct WebSocketFrames {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FrameStream for WebSocketFrames {
    async fn next_frame(&mut self) -> Option<Result<Bytes, TransportError>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Binary(data)) => return Some(Ok(Bytes::from(data))),
                Ok(Message::Text(text)) => return Some(Ok(Bytes::from(text.into_bytes()))),
                Ok(Message::Close(frame)) => {
                    debug!(target: "spyglass::transport", ?frame, "websocket closed by peer");
                    // Flush the queued close reply so the producer sees a
                    // clean handshake rather than a dropped socket.
                    if let Err(err) = self.inner.close(None).await {
                        trace!(target: "spyglass::transport", error = %err, "close reply not sent");
                    }
                    return None;
                }
                // Ping replies are queued by tungstenite and flushed on the next read.
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {
                    trace!(target: "spyglass::transport", "control frame");
                }
                Err(err) => return Some(Err(err.into())),
            }
        }
    }
}

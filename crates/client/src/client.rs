//! WebSocket client for the service's push channel.
//!
//! [`FeedClient`] holds the connection configuration. Call
//! [`FeedClient::connect`] to establish a live [`FeedConnection`] to
//! the `/pubsub` endpoint.

use tokio_tungstenite::{connect_async, MaybeTlsStream};

/// Configuration handle for the push channel.
pub struct FeedClient {
    ws_url: String,
}

/// A live WebSocket connection to the push channel.
#[derive(Debug)]
pub struct FeedConnection {
    /// The raw WebSocket stream for reading/writing frames.
    pub ws_stream: tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

/// Errors that can occur when working with the push channel client.
#[derive(Debug, thiserror::Error)]
pub enum FeedClientError {
    /// Failed to establish the WebSocket connection.
    #[error("connection error: {0}")]
    Connection(String),
}

impl FeedClient {
    /// Create a client for a push channel.
    ///
    /// * `ws_url` - WebSocket base URL, e.g. `ws://host:8000`.
    pub fn new(ws_url: String) -> Self {
        Self { ws_url }
    }

    /// WebSocket base URL.
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Connect to the `/pubsub` endpoint.
    pub async fn connect(&self) -> Result<FeedConnection, FeedClientError> {
        let url = format!("{}/pubsub", self.ws_url);

        let (ws_stream, _response) = connect_async(&url).await.map_err(|e| {
            FeedClientError::Connection(format!("failed to connect to {url}: {e}"))
        })?;

        tracing::info!(url = %url, "Connected to push channel");

        Ok(FeedConnection { ws_stream })
    }
}

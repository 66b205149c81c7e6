//! WebSocket client for real-time Kalshi orderbook data.
//!
//! This module provides:
//!
//! - [`WebSocketClient`] - one authenticated connection that can subscribe
//!   markets to the orderbook channel and yields raw text frames
//! - [`KalshiConnector`] - opens a fresh [`WebSocketClient`] for every
//!   [`BookFeed`](crate::orderbook::BookFeed) connection attempt
//!
//! Reconnection and message decoding live in the feed; this layer only deals
//! with the socket.
//!
//! # Example
//!
//! ```rust,no_run
//! use kalshi_fast_trader::Config;
//! use kalshi_fast_trader::client::WebSocketClient;
//!
//! # async fn example() -> kalshi_fast_trader::Result<()> {
//! let mut ws = WebSocketClient::connect(&Config::from_env()?).await?;
//! ws.subscribe_orderbook(vec!["KXNBAGAME-25JAN15LALBOS-LAL".to_string()]).await?;
//!
//! while let Some(frame) = ws.next_text().await {
//!     println!("{}", frame?);
//! }
//! # Ok(())
//! # }
//! ```

use futures_util::future::BoxFuture;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

use crate::client::auth::Signer;
use crate::config::Config;
use crate::error::Error;
use crate::orderbook::{Connector, FeedStream};
use crate::types::messages::WsCommand;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One authenticated WebSocket connection
///
/// # Thread Safety
///
/// This client is NOT thread-safe. The feed owns it from a single task.
#[derive(Debug)]
pub struct WebSocketClient {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
    message_id: u64,
}

impl WebSocketClient {
    /// Connect to the Kalshi WebSocket API
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or authentication headers
    /// cannot be generated.
    pub async fn connect(config: &Config) -> Result<Self, Error> {
        let signer = Signer::new(config.private_key_pem())?;
        Self::connect_with(config.websocket_url(), config.api_key_id(), &signer).await
    }

    /// Connect with an existing signer
    pub async fn connect_with(url: &str, api_key_id: &str, signer: &Signer) -> Result<Self, Error> {
        let parsed = Url::parse(url)?;
        let auth = signer.headers(api_key_id, "GET", parsed.path())?;

        // Let tungstenite fill in Host, Upgrade and the handshake key
        let mut request = url.into_client_request()?;
        for (name, value) in auth.pairs() {
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Authentication(format!("invalid {} header: {}", name, e)))?;
            request.headers_mut().insert(name, value);
        }

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request).await?;
        let (write, read) = ws_stream.split();
        debug!(url = %url, "websocket connected");

        Ok(Self {
            write,
            read,
            message_id: 1,
        })
    }

    /// Send a command to the WebSocket server
    async fn send_command(&mut self, cmd: WsCommand) -> Result<u64, Error> {
        let msg_id = self.message_id;
        let json = serde_json::to_string(&cmd)?;
        self.write.send(Message::Text(json)).await?;
        self.message_id += 1;
        Ok(msg_id)
    }

    /// Get the next message ID without incrementing
    pub fn next_message_id(&self) -> u64 {
        self.message_id
    }

    /// Subscribe to orderbook updates for the given markets
    ///
    /// # Returns
    ///
    /// The message ID of the subscription request (use to correlate with response)
    pub async fn subscribe_orderbook(&mut self, market_tickers: Vec<String>) -> Result<u64, Error> {
        let cmd = WsCommand::subscribe_orderbook(self.message_id, market_tickers);
        self.send_command(cmd).await
    }

    /// Receive the next text frame
    ///
    /// Pings are answered automatically; binary and pong frames are skipped.
    ///
    /// # Returns
    ///
    /// The next frame, or `None` if the connection is closed.
    pub async fn next_text(&mut self) -> Option<Result<String, Error>> {
        loop {
            match self.read.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Ping(data)) => {
                    if let Err(e) = self.write.send(Message::Pong(data)).await {
                        return Some(Err(e.into()));
                    }
                }
                Ok(Message::Close(_)) => {
                    return Some(Err(Error::ConnectionClosed));
                }
                Ok(_) => continue,
                Err(e) => {
                    return Some(Err(e.into()));
                }
            }
        }
    }

    /// Close the WebSocket connection
    pub async fn close(&mut self) -> Result<(), Error> {
        self.write.close().await?;
        Ok(())
    }
}

impl FeedStream for WebSocketClient {
    fn subscribe<'a>(&'a mut self, tickers: &'a [String]) -> BoxFuture<'a, Result<u64, Error>> {
        Box::pin(self.subscribe_orderbook(tickers.to_vec()))
    }

    fn next_frame(&mut self) -> BoxFuture<'_, Option<Result<String, Error>>> {
        Box::pin(self.next_text())
    }
}

/// Opens authenticated connections for the orderbook feed
///
/// Each call to [`Connector::connect`] signs a new timestamp, so reconnects
/// never reuse stale credentials.
#[derive(Debug, Clone)]
pub struct KalshiConnector {
    url: String,
    api_key_id: String,
    signer: Signer,
}

impl KalshiConnector {
    /// Build a connector from the client configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the private key cannot be parsed or the WebSocket
    /// URL is invalid.
    pub fn new(config: &Config) -> Result<Self, Error> {
        Url::parse(config.websocket_url())?;
        Ok(Self {
            url: config.websocket_url().to_string(),
            api_key_id: config.api_key_id().to_string(),
            signer: Signer::new(config.private_key_pem())?,
        })
    }
}

impl Connector for KalshiConnector {
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn FeedStream>, Error>> {
        Box::pin(async move {
            let client = WebSocketClient::connect_with(&self.url, &self.api_key_id, &self.signer).await?;
            Ok(Box::new(client) as Box<dyn FeedStream>)
        })
    }
}

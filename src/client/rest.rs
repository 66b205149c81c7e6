//! HTTP REST client for Kalshi API.
//!
//! This module provides the [`RestClient`] for making authenticated HTTP requests
//! to the Kalshi REST API endpoints. It is also the cache's
//! [`SnapshotSource`] and the bot's [`OrderSink`].
//!
//! # Example
//!
//! ```rust,no_run
//! use kalshi_fast_trader::Config;
//! use kalshi_fast_trader::client::RestClient;
//!
//! # async fn example() -> kalshi_fast_trader::Result<()> {
//! let rest = RestClient::new(&Config::from_env()?)?;
//! let book = rest.get_orderbook("KXNBAGAME-25JAN15LALBOS-LAL").await?;
//! println!("{} bid levels", book.yes.bids.len());
//! # Ok(())
//! # }
//! ```

use futures_util::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use tracing::debug;
use url::Url;

use crate::bot::OrderSink;
use crate::client::auth::Signer;
use crate::config::Config;
use crate::error::{ApiError, Error};
use crate::orderbook::SnapshotSource;
use crate::types::messages::{BookPayload, OrderbookResponse};
use crate::types::order::{CancelOrderResponse, CreateOrderRequest, CreateOrderResponse, Order};
use crate::types::portfolio::{Balance, PositionsResponse};

/// HTTP client for Kalshi REST API
#[derive(Debug)]
pub struct RestClient {
    client: Client,
    base_url: Url,
    api_key_id: String,
    signer: Signer,
}

impl RestClient {
    /// Create a new REST client
    ///
    /// # Errors
    ///
    /// Returns an error if the private key cannot be parsed, the base URL is
    /// invalid, or the HTTP client cannot be initialized.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let signer = Signer::new(config.private_key_pem())?;
        let base_url = Url::parse(config.rest_base_url())?;

        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url,
            api_key_id: config.api_key_id().to_string(),
            signer,
        })
    }

    /// Build authentication headers for a request
    fn auth_headers(&self, method: &Method, url: &Url) -> Result<HeaderMap, Error> {
        let auth = self
            .signer
            .headers(&self.api_key_id, method.as_str(), url.path())?;

        let mut headers = HeaderMap::new();
        for (name, value) in auth.pairs() {
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Authentication(format!("invalid {} header: {}", name, e)))?;
            headers.insert(name, value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(headers)
    }

    async fn request<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = endpoint(&self.base_url, path)?;
        let headers = self.auth_headers(&method, &url)?;
        debug!(method = %method, path = url.path(), "REST request");

        let mut request = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;

        self.handle_response(response).await
    }

    /// Make a GET request to the API
    pub async fn get<T>(&self, path: &str) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
    {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    /// Make a POST request to the API
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    /// Make a DELETE request to the API
    pub async fn delete<T>(&self, path: &str) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
    {
        self.request::<T, ()>(Method::DELETE, path, None).await
    }

    /// Handle the HTTP response, checking for errors
    async fn handle_response<T>(&self, response: reqwest::Response) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            // Retry-After is in seconds
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1000));

            return Err(Error::RateLimited {
                retry_after_ms: retry_after,
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                return Err(Error::Authentication(format!("{}: {}", status, body)));
            }

            if let Ok(error_response) = serde_json::from_str::<serde_json::Value>(&body) {
                // Kalshi nests details under "error" on some endpoints
                let details = error_response.get("error").unwrap_or(&error_response);
                let message = details
                    .get("message")
                    .and_then(|v| v.as_str())
                    .or_else(|| details.as_str())
                    .unwrap_or(&body)
                    .to_string();

                let code = details
                    .get("code")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());

                return Err(Error::Api(ApiError {
                    status: status.as_u16(),
                    code,
                    message,
                }));
            }

            return Err(Error::Api(ApiError::new(status.as_u16(), body)));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(Error::from)
    }

    /// Fetch the full orderbook for a market
    ///
    /// Accepts both the bare `{"yes": ...}` body and the `{"orderbook": ...}`
    /// wrapper.
    pub async fn get_orderbook(&self, ticker: &str) -> Result<BookPayload, Error> {
        let response: OrderbookResponse = self
            .get(&format!("/markets/{}/orderbook", ticker))
            .await?;
        Ok(response.into_book())
    }

    /// Place an order
    pub async fn create_order(&self, order: &CreateOrderRequest) -> Result<Order, Error> {
        let response: CreateOrderResponse = self.post("/portfolio/orders", order).await?;
        Ok(response.order)
    }

    /// Cancel a resting order
    pub async fn cancel_order(&self, order_id: &str) -> Result<Order, Error> {
        let response: CancelOrderResponse = self
            .delete(&format!("/portfolio/orders/{}", order_id))
            .await?;
        Ok(response.order)
    }

    /// Get the account balance
    pub async fn get_balance(&self) -> Result<Balance, Error> {
        self.get("/portfolio/balance").await
    }

    /// Get open positions
    pub async fn get_positions(&self) -> Result<PositionsResponse, Error> {
        self.get("/portfolio/positions").await
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }
}

impl SnapshotSource for RestClient {
    fn fetch_orderbook<'a>(&'a self, ticker: &'a str) -> BoxFuture<'a, Result<BookPayload, Error>> {
        Box::pin(self.get_orderbook(ticker))
    }
}

impl OrderSink for RestClient {
    fn submit<'a>(&'a self, order: &'a CreateOrderRequest) -> BoxFuture<'a, Result<Order, Error>> {
        Box::pin(self.create_order(order))
    }
}

/// Join an API path onto the base URL, keeping the base's own path prefix
fn endpoint(base: &Url, path: &str) -> Result<Url, Error> {
    let joined = format!("{}{}", base.as_str().trim_end_matches('/'), path);
    Ok(Url::parse(&joined)?)
}

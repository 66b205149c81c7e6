//! Error types for the kalshi-fast-trader crate.
//!
//! Every failure is classified by [`ErrorKind`] so the feed loop and the
//! cache can decide whether to reconnect, skip a message, or hand the error
//! back to the caller.

use thiserror::Error as ThisError;

/// The main error type for this crate
#[derive(Debug, ThisError)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A price level outside the 0-100 cent range
    #[error("Invalid price level: {price}")]
    InvalidPrice {
        /// The offending price
        price: u64,
    },

    /// RSA cryptography error (key parsing, signing)
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Invalid configuration (missing fields, bad format)
    #[error("Configuration error: {0}")]
    Config(String),

    /// API returned an error response
    #[error("API error ({}): {}", .0.status, .0.message)]
    Api(ApiError),

    /// Rate limit exceeded
    #[error("Rate limited{}", retry_suffix(.retry_after_ms))]
    RateLimited {
        /// Retry after this many milliseconds
        retry_after_ms: Option<u64>,
    },

    /// Authentication failed
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// WebSocket connection closed unexpectedly
    #[error("WebSocket connection closed")]
    ConnectionClosed,

    /// No game with this id is registered
    #[error("Game not found: {0}")]
    GameNotFound(String),

    /// A bet request failed validation
    #[error("Invalid bet: {0}")]
    InvalidBet(String),

    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,

    /// Local I/O failure (reading a key file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn retry_suffix(retry_after_ms: &Option<u64>) -> String {
    match retry_after_ms {
        Some(ms) => format!(", retry after {}ms", ms),
        None => String::new(),
    }
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or upstream failure; recovered by reconnecting
    Transport,
    /// A single payload could not be decoded; skipped
    Parse,
    /// Caller or configuration mistake; returned to the caller
    Logic,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Http(_)
            | Error::WebSocket(_)
            | Error::Api(_)
            | Error::RateLimited { .. }
            | Error::Authentication(_)
            | Error::ConnectionClosed
            | Error::Timeout => ErrorKind::Transport,
            Error::Json(_) | Error::InvalidPrice { .. } => ErrorKind::Parse,
            Error::Crypto(_)
            | Error::Config(_)
            | Error::GameNotFound(_)
            | Error::InvalidBet(_)
            | Error::Io(_) => ErrorKind::Logic,
        }
    }

    /// Whether the feed loop should tear down the connection and reconnect
    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }
}

/// Error returned by the Kalshi API
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status code
    pub status: u16,
    /// Error code from API (if provided)
    pub code: Option<String>,
    /// Error message
    pub message: String,
}

impl From<rsa::Error> for Error {
    fn from(err: rsa::Error) -> Self {
        Error::Crypto(err.to_string())
    }
}

impl From<rsa::pkcs8::Error> for Error {
    fn from(err: rsa::pkcs8::Error) -> Self {
        Error::Crypto(format!("PKCS8 error: {}", err))
    }
}

impl From<tokio_tungstenite::tungstenite::http::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::http::Error) -> Self {
        Error::Config(format!("HTTP error building WebSocket request: {}", err))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Config(format!("Invalid URL: {}", err))
    }
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = Error::Api(ApiError::new(400, "Bad request"));
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("Bad request"));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_rate_limited_display() {
        let err = Error::RateLimited {
            retry_after_ms: Some(1000),
        };
        assert!(err.to_string().contains("1000"));

        let err = Error::RateLimited {
            retry_after_ms: None,
        };
        assert_eq!(err.to_string(), "Rate limited");
    }

    #[test]
    fn test_classification() {
        let json_err = serde_json::from_str::<u8>("not json").unwrap_err();
        assert_eq!(Error::from(json_err).kind(), ErrorKind::Parse);
        assert_eq!(Error::InvalidPrice { price: 140 }.kind(), ErrorKind::Parse);
        assert!(Error::ConnectionClosed.is_transport());
        assert_eq!(Error::GameNotFound("x".into()).kind(), ErrorKind::Logic);
    }

    #[test]
    fn test_api_error_ranges() {
        assert!(ApiError::new(404, "missing").is_client_error());
        assert!(ApiError::new(503, "down").is_server_error());
    }
}

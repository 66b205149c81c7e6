//! RSA-PSS authentication for Kalshi API requests.
//!
//! Kalshi uses RSA-PSS signatures for API authentication. Each request must include:
//!
//! - `KALSHI-ACCESS-KEY`: Your API key ID
//! - `KALSHI-ACCESS-TIMESTAMP`: Unix timestamp in milliseconds
//! - `KALSHI-ACCESS-SIGNATURE`: RSA-PSS signature of `timestamp + method + path`
//!
//! The path is the full URL path (e.g. `/trade-api/v2/markets/X/orderbook`)
//! without the query string.
//!
//! # Example
//!
//! ```rust,no_run
//! use kalshi_fast_trader::client::auth::Signer;
//!
//! # fn example() -> kalshi_fast_trader::Result<()> {
//! let pem = std::fs::read_to_string("private_key.pem")?;
//! let signer = Signer::new(&pem)?;
//!
//! let headers = signer.headers("my-key-id", "GET", "/trade-api/v2/portfolio/balance")?;
//! println!("{}", headers.timestamp);
//! # Ok(())
//! # }
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::pkcs8::DecodePrivateKey;
use rsa::pss::SigningKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use rsa::RsaPrivateKey;
use sha2::Sha256;

use crate::error::Error;
use crate::types::{now_ms, TimestampMs};

/// RSA-PSS signer for Kalshi API authentication
#[derive(Debug, Clone)]
pub struct Signer {
    signing_key: SigningKey<Sha256>,
}

impl Signer {
    /// Create a new signer from a PEM-encoded private key
    ///
    /// Both PKCS#8 (`BEGIN PRIVATE KEY`) and PKCS#1 (`BEGIN RSA PRIVATE KEY`)
    /// encodings are accepted, since the Kalshi dashboard hands out the latter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Crypto`] if the PEM cannot be parsed as an RSA private key.
    pub fn new(private_key_pem: &str) -> Result<Self, Error> {
        let private_key = match RsaPrivateKey::from_pkcs8_pem(private_key_pem) {
            Ok(key) => key,
            Err(pkcs8_err) => {
                use rsa::pkcs1::DecodeRsaPrivateKey;
                RsaPrivateKey::from_pkcs1_pem(private_key_pem).map_err(|_| Error::from(pkcs8_err))?
            }
        };
        Ok(Self {
            signing_key: SigningKey::<Sha256>::new(private_key),
        })
    }

    /// Sign a request and return the base64-encoded signature
    ///
    /// # Arguments
    ///
    /// * `timestamp_ms` - Unix timestamp in milliseconds
    /// * `method` - HTTP method (GET, POST, DELETE, etc.)
    /// * `path` - Request path (e.g., "/trade-api/v2/markets")
    pub fn sign(&self, timestamp_ms: TimestampMs, method: &str, path: &str) -> String {
        let message = format!("{}{}{}", timestamp_ms, method, path);

        let mut rng = rand::thread_rng();
        let signature = self.signing_key.sign_with_rng(&mut rng, message.as_bytes());

        BASE64.encode(signature.to_bytes())
    }

    /// Build the three auth headers for a request signed now
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] if the key id is empty.
    pub fn headers(&self, api_key_id: &str, method: &str, path: &str) -> Result<AuthHeaders, Error> {
        if api_key_id.is_empty() {
            return Err(Error::Authentication("API key id is empty".to_string()));
        }
        let timestamp = now_ms();
        Ok(AuthHeaders {
            key: api_key_id.to_string(),
            timestamp: timestamp.to_string(),
            signature: self.sign(timestamp, method, path),
        })
    }
}

/// Authentication headers for a Kalshi API request
#[derive(Debug, Clone)]
pub struct AuthHeaders {
    /// API key ID
    pub key: String,
    /// Unix timestamp in milliseconds
    pub timestamp: String,
    /// RSA-PSS signature (base64)
    pub signature: String,
}

impl AuthHeaders {
    /// Header name for API key
    pub const KEY_HEADER: &'static str = "KALSHI-ACCESS-KEY";
    /// Header name for timestamp
    pub const TIMESTAMP_HEADER: &'static str = "KALSHI-ACCESS-TIMESTAMP";
    /// Header name for signature
    pub const SIGNATURE_HEADER: &'static str = "KALSHI-ACCESS-SIGNATURE";

    /// Header name/value pairs, in the order they are sent
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            (Self::KEY_HEADER, self.key.as_str()),
            (Self::TIMESTAMP_HEADER, self.timestamp.as_str()),
            (Self::SIGNATURE_HEADER, self.signature.as_str()),
        ]
    }
}

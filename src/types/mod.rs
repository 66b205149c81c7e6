//! API types for Kalshi requests and responses.
//!
//! - [`order`] - Order-related types (Side, Action, CreateOrderRequest, etc.)
//! - [`messages`] - Orderbook payloads and WebSocket message types
//! - [`portfolio`] - Balance and position types

pub mod messages;
pub mod order;
pub mod portfolio;

use serde::{Deserialize, Serialize};

pub use messages::{BookPayload, FeedMessage, SidePayload};
pub use order::{Action, CreateOrderRequest, Order, OrderStatus, Side};
pub use portfolio::{Balance, MarketPosition, PositionsResponse};

/// Price in cents (0-100 for Kalshi binary contracts)
///
/// - 1 = $0.01 (1% implied probability)
/// - 99 = $0.99 (99% implied probability)
pub type Price = u8;

/// Quantity of contracts
pub type Quantity = u64;

/// Timestamp in milliseconds since Unix epoch
pub type TimestampMs = u64;

/// Highest representable price; a Yes and a No contract always sum to this
pub const MAX_PRICE: Price = 100;

/// One resting price level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Price in cents
    pub price: Price,
    /// Contracts resting at this price
    pub quantity: Quantity,
}

impl PriceLevel {
    /// Create a new price level
    pub const fn new(price: Price, quantity: Quantity) -> Self {
        Self { price, quantity }
    }
}

impl From<(Price, Quantity)> for PriceLevel {
    fn from((price, quantity): (Price, Quantity)) -> Self {
        Self { price, quantity }
    }
}

/// Current wall-clock time in milliseconds
pub fn now_ms() -> TimestampMs {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as TimestampMs)
        .unwrap_or_default()
}

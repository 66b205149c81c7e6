//! Order-related types.
//!
//! This module contains types for creating and representing orders on the
//! Kalshi exchange.

use serde::{Deserialize, Serialize};

use super::{Price, MAX_PRICE};

/// Order side (Yes or No contract)
///
/// In Kalshi, every market is a binary contract where you can buy/sell
/// either YES or NO contracts. The prices always sum to 100 cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Yes contracts - pay out $1 if the event happens
    #[default]
    Yes,
    /// No contracts - pay out $1 if the event doesn't happen
    No,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(self) -> Self {
        match self {
            Side::Yes => Side::No,
            Side::No => Side::Yes,
        }
    }

    /// Price of this side given the price of the other side
    pub fn complement(price: Price) -> Price {
        MAX_PRICE.saturating_sub(price)
    }
}

/// Order action (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Buy contracts
    Buy,
    /// Sell contracts
    Sell,
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order is resting on the book
    Resting,
    /// Order has been canceled
    Canceled,
    /// Order has been fully executed
    Executed,
    /// Order is pending (being processed)
    Pending,
    /// Any status this client does not know about
    #[serde(other)]
    Unknown,
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Limit order - specify price and quantity
    #[default]
    Limit,
    /// Market order - execute at best available price
    Market,
}

/// Request to create a new order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateOrderRequest {
    /// Market ticker
    pub ticker: String,

    /// Client-generated order ID (optional, for idempotency)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,

    /// Order side (yes or no)
    pub side: Side,

    /// Order action (buy or sell)
    pub action: Action,

    /// Number of contracts
    pub count: u64,

    /// Order type (limit or market)
    #[serde(rename = "type")]
    pub order_type: OrderType,

    /// Limit price in cents when buying or selling Yes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yes_price: Option<Price>,

    /// Limit price in cents when buying or selling No
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_price: Option<Price>,
}

impl CreateOrderRequest {
    /// Create a new limit order request
    ///
    /// The price is attached to `yes_price` or `no_price` depending on `side`.
    pub fn limit(
        ticker: impl Into<String>,
        side: Side,
        action: Action,
        count: u64,
        price_cents: Price,
    ) -> Self {
        let (yes_price, no_price) = match side {
            Side::Yes => (Some(price_cents), None),
            Side::No => (None, Some(price_cents)),
        };
        Self {
            ticker: ticker.into(),
            client_order_id: None,
            side,
            action,
            count,
            order_type: OrderType::Limit,
            yes_price,
            no_price,
        }
    }

    /// Set a client order ID for idempotency
    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }
}

/// An order on the Kalshi exchange
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    /// Server-generated order ID
    pub order_id: String,

    /// Client-generated order ID (if provided)
    #[serde(default)]
    pub client_order_id: Option<String>,

    /// Market ticker
    #[serde(default)]
    pub ticker: String,

    /// Order status
    pub status: OrderStatus,

    /// Order side
    #[serde(default)]
    pub side: Side,

    /// Price in cents (for yes side)
    #[serde(default)]
    pub yes_price: Option<Price>,

    /// Price in cents (for no side)
    #[serde(default)]
    pub no_price: Option<Price>,

    /// When the order was created
    #[serde(default)]
    pub created_time: Option<String>,
}

/// Response from creating an order
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderResponse {
    /// The created order
    pub order: Order,
}

/// Response from canceling an order
#[derive(Debug, Clone, Deserialize)]
pub struct CancelOrderResponse {
    /// The canceled order
    pub order: Order,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Yes.opposite(), Side::No);
        assert_eq!(Side::No.opposite(), Side::Yes);
    }

    #[test]
    fn test_complement() {
        assert_eq!(Side::complement(45), 55);
        assert_eq!(Side::complement(100), 0);
        assert_eq!(Side::complement(0), 100);
    }

    #[test]
    fn test_create_limit_order() {
        let order = CreateOrderRequest::limit("KXNBA-LAL", Side::Yes, Action::Buy, 10, 55);
        assert_eq!(order.ticker, "KXNBA-LAL");
        assert_eq!(order.count, 10);
        assert_eq!(order.yes_price, Some(55));
        assert_eq!(order.no_price, None);
        assert_eq!(order.order_type, OrderType::Limit);
    }

    #[test]
    fn test_no_side_order_serialization() {
        let order = CreateOrderRequest::limit("KXNBA-LAL", Side::No, Action::Buy, 3, 41);
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["side"], "no");
        assert_eq!(json["type"], "limit");
        assert_eq!(json["no_price"], 41);
        assert!(json.get("yes_price").is_none());
    }

    #[test]
    fn test_order_deserialization_is_lenient() {
        let order: Order =
            serde_json::from_str(r#"{"order_id": "abc", "status": "resting"}"#).unwrap();
        assert_eq!(order.order_id, "abc");
        assert_eq!(order.status, OrderStatus::Resting);

        let order: Order =
            serde_json::from_str(r#"{"order_id": "abc", "status": "partially_filled"}"#).unwrap();
        assert_eq!(order.status, OrderStatus::Unknown);
    }
}

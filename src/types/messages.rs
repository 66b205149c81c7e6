//! Orderbook payloads and WebSocket message types.
//!
//! The same book shape is used by the REST snapshot endpoint and by the
//! `orderbook_snapshot` stream message:
//!
//! ```json
//! { "yes": { "bids": [[55, 10], [54, 3]], "asks": [[57, 20]] } }
//! ```
//!
//! Missing or `null` sides are treated as empty.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use super::{Price, PriceLevel, MAX_PRICE};
use crate::error::Error;

/// Channel carrying orderbook snapshots and deltas
pub const ORDERBOOK_CHANNEL: &str = "orderbook_delta";

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// WebSocket command sent to the server
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum WsCommand {
    /// Subscribe to channels
    Subscribe {
        /// Message ID
        id: u64,
        /// Subscription parameters
        params: SubscribeParams,
    },
}

impl WsCommand {
    /// Subscribe the given markets to the orderbook channel
    pub fn subscribe_orderbook(id: u64, market_tickers: Vec<String>) -> Self {
        WsCommand::Subscribe {
            id,
            params: SubscribeParams {
                channels: vec![ORDERBOOK_CHANNEL.to_string()],
                market_tickers,
            },
        }
    }
}

/// Parameters for subscribe command
#[derive(Debug, Clone, Serialize)]
pub struct SubscribeParams {
    /// Channels to subscribe to
    pub channels: Vec<String>,
    /// Market tickers
    pub market_tickers: Vec<String>,
}

/// Raw `[price, quantity]` pair as sent by the exchange
pub type RawLevel = [u64; 2];

/// Bid and ask ladders for the Yes contract
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidePayload {
    /// Bid levels
    #[serde(default, deserialize_with = "null_as_default")]
    pub bids: Vec<RawLevel>,
    /// Ask levels
    #[serde(default, deserialize_with = "null_as_default")]
    pub asks: Vec<RawLevel>,
}

impl SidePayload {
    /// Validated bid levels; out-of-range entries are dropped
    pub fn bid_levels(&self) -> Vec<PriceLevel> {
        convert_levels(&self.bids)
    }

    /// Validated ask levels; out-of-range entries are dropped
    pub fn ask_levels(&self) -> Vec<PriceLevel> {
        convert_levels(&self.asks)
    }
}

/// Full book payload (REST response body and snapshot message body)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookPayload {
    /// Yes-contract ladders
    #[serde(default, deserialize_with = "null_as_default")]
    pub yes: SidePayload,
}

/// REST orderbook response, bare or wrapped in `{"orderbook": ...}`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OrderbookResponse {
    /// `{"orderbook": {"yes": ...}}`
    Wrapped {
        /// The book
        orderbook: BookPayload,
    },
    /// `{"yes": ...}`
    Bare(BookPayload),
}

impl OrderbookResponse {
    /// Unwrap into the book payload
    pub fn into_book(self) -> BookPayload {
        match self {
            OrderbookResponse::Wrapped { orderbook } => orderbook,
            OrderbookResponse::Bare(book) => book,
        }
    }
}

/// Convert one raw level, rejecting prices outside 0..=100
pub fn parse_level(raw: RawLevel) -> Result<PriceLevel, Error> {
    let [price, quantity] = raw;
    if price > u64::from(MAX_PRICE) {
        return Err(Error::InvalidPrice { price });
    }
    Ok(PriceLevel::new(price as Price, quantity))
}

fn convert_levels(raw: &[RawLevel]) -> Vec<PriceLevel> {
    raw.iter()
        .filter_map(|&level| match parse_level(level) {
            Ok(level) => Some(level),
            Err(e) => {
                warn!(error = %e, "dropping price level");
                None
            }
        })
        .collect()
}

/// WebSocket message received from the server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    /// Full replacement of one market's book
    OrderbookSnapshot(OrderbookSnapshotMsg),
    /// Incremental changes to one market's book
    OrderbookDelta(OrderbookDeltaMsg),
    /// Subscription confirmed
    Subscribed(SubscribedMsg),
    /// Error response to a command
    Error(ErrorMsg),
    /// Any other message kind; ignored
    #[serde(other)]
    Unknown,
}

impl FeedMessage {
    /// Ticker this message applies to, for orderbook messages
    pub fn market_ticker(&self) -> Option<&str> {
        match self {
            FeedMessage::OrderbookSnapshot(msg) => Some(&msg.market_ticker),
            FeedMessage::OrderbookDelta(msg) => Some(&msg.market_ticker),
            _ => None,
        }
    }
}

/// Orderbook snapshot message
#[derive(Debug, Clone, Deserialize)]
pub struct OrderbookSnapshotMsg {
    /// Market ticker
    pub market_ticker: String,
    /// Replacement book
    #[serde(default, deserialize_with = "null_as_default")]
    pub orderbook: BookPayload,
}

/// Orderbook delta message
///
/// A quantity of 0 removes the price level.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderbookDeltaMsg {
    /// Market ticker
    pub market_ticker: String,
    /// Changed Yes-contract levels; `None` when the message carries no Yes key
    #[serde(default)]
    pub yes: Option<SidePayload>,
}

/// Subscription confirmed message
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribedMsg {
    /// Message ID (matches the request)
    #[serde(default)]
    pub id: Option<u64>,
}

/// Error message
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorMsg {
    /// Message ID
    #[serde(default)]
    pub id: Option<u64>,
    /// Error details, passed through for logging
    #[serde(default)]
    pub msg: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_command_serialization() {
        let cmd = WsCommand::subscribe_orderbook(1, vec!["KXNBA-LAL".to_string()]);
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 1,
                "cmd": "subscribe",
                "params": {
                    "channels": ["orderbook_delta"],
                    "market_tickers": ["KXNBA-LAL"]
                }
            })
        );
    }

    #[test]
    fn test_snapshot_deserialization() {
        let json = r#"{
            "type": "orderbook_snapshot",
            "market_ticker": "KXNBA-LAL",
            "orderbook": {"yes": {"bids": [[45, 10]], "asks": [[47, 5], [48, 2]]}}
        }"#;

        match serde_json::from_str::<FeedMessage>(json).unwrap() {
            FeedMessage::OrderbookSnapshot(snapshot) => {
                assert_eq!(snapshot.market_ticker, "KXNBA-LAL");
                assert_eq!(snapshot.orderbook.yes.bids, vec![[45, 10]]);
                assert_eq!(snapshot.orderbook.yes.asks.len(), 2);
            }
            other => panic!("Expected OrderbookSnapshot, got {:?}", other),
        }
    }

    #[test]
    fn test_delta_with_missing_side() {
        let json = r#"{
            "type": "orderbook_delta",
            "market_ticker": "KXNBA-LAL",
            "yes": {"asks": [[47, 0]]}
        }"#;

        match serde_json::from_str::<FeedMessage>(json).unwrap() {
            FeedMessage::OrderbookDelta(delta) => {
                let yes = delta.yes.unwrap();
                assert!(yes.bids.is_empty());
                assert_eq!(yes.ask_levels(), vec![PriceLevel::new(47, 0)]);
            }
            other => panic!("Expected OrderbookDelta, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_is_not_an_error() {
        let msg: FeedMessage =
            serde_json::from_str(r#"{"type": "ticker", "market_ticker": "X"}"#).unwrap();
        assert!(matches!(msg, FeedMessage::Unknown));
        assert!(msg.market_ticker().is_none());
    }

    #[test]
    fn test_negative_quantity_is_rejected() {
        let json = r#"{"type": "orderbook_delta", "market_ticker": "X", "yes": {"bids": [[50, -1]]}}"#;
        assert!(serde_json::from_str::<FeedMessage>(json).is_err());
    }

    #[test]
    fn test_rest_response_shapes() {
        let bare: OrderbookResponse =
            serde_json::from_str(r#"{"yes": {"bids": [[40, 1]]}}"#).unwrap();
        assert_eq!(bare.into_book().yes.bids, vec![[40, 1]]);

        let wrapped: OrderbookResponse =
            serde_json::from_str(r#"{"orderbook": {"yes": {"asks": [[60, 2]]}}}"#).unwrap();
        assert_eq!(wrapped.into_book().yes.asks, vec![[60, 2]]);

        let empty: OrderbookResponse = serde_json::from_str(r#"{"yes": null}"#).unwrap();
        assert_eq!(empty.into_book(), BookPayload::default());
    }

    #[test]
    fn test_out_of_range_levels_are_dropped() {
        let side = SidePayload {
            bids: vec![[101, 5], [99, 1]],
            asks: vec![],
        };
        assert_eq!(side.bid_levels(), vec![PriceLevel::new(99, 1)]);
        assert!(matches!(
            parse_level([250, 1]),
            Err(Error::InvalidPrice { price: 250 })
        ));
    }
}

//! Account balance and position types.

use serde::{Deserialize, Serialize};

/// Account balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Balance {
    /// Available balance in cents
    pub balance: i64,

    /// Portfolio value in cents
    #[serde(default)]
    pub portfolio_value: i64,
}

/// Holdings in one market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPosition {
    /// Market ticker
    pub ticker: String,

    /// Contracts held (positive = Yes, negative = No)
    #[serde(default)]
    pub position: i64,

    /// Cost of the open position in cents
    #[serde(default)]
    pub market_exposure: i64,

    /// Realized P&L in cents
    #[serde(default)]
    pub realized_pnl: i64,

    /// Fees paid in cents
    #[serde(default)]
    pub fees_paid: i64,

    /// Orders still resting in this market
    #[serde(default)]
    pub resting_orders_count: i64,
}

/// Response from the positions endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionsResponse {
    /// Per-market positions
    #[serde(default)]
    pub market_positions: Vec<MarketPosition>,

    /// Cursor for pagination
    #[serde(default)]
    pub cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_parse_with_missing_fields() {
        let json = r#"{
            "market_positions": [
                {"ticker": "KX-LAL", "position": -4, "market_exposure": 220},
                {"ticker": "KX-BOS"}
            ],
            "cursor": ""
        }"#;
        let response: PositionsResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.market_positions.len(), 2);
        assert_eq!(response.market_positions[0].position, -4);
        assert_eq!(response.market_positions[0].market_exposure, 220);
        assert_eq!(response.market_positions[1].fees_paid, 0);
    }

    #[test]
    fn test_balance_parse() {
        let balance: Balance = serde_json::from_str(r#"{"balance": 10500}"#).unwrap();
        assert_eq!(balance.balance, 10500);
        assert_eq!(balance.portfolio_value, 0);
    }
}

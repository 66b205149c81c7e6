//! API clients for communicating with Kalshi.
//!
//! This module contains:
//!
//! - [`rest`] - HTTP client for orderbook snapshots and order entry
//! - [`websocket`] - WebSocket connection and the feed's connector
//! - [`auth`] - RSA-PSS authentication utilities
//! - [`paper`] - paper trading stand-in and backend selection

pub mod auth;
pub mod paper;
pub mod rest;
pub mod websocket;

pub use auth::Signer;
pub use paper::{Backend, PaperExchange};
pub use rest::RestClient;
pub use websocket::{KalshiConnector, WebSocketClient};

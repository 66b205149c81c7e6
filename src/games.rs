//! In-memory game configurations pairing two markets.
//!
//! A [`Game`] pairs two tickers (usually the two teams of one event) with a
//! preset bet size and price limit per side. Creating or updating a game
//! subscribes its tickers through the [`BookCache`], and every price the
//! registry reports is read from the cache through a [`DepthView`].

use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bot::OrderSink;
use crate::error::Error;
use crate::orderbook::{BookCache, DepthView};
use crate::types::order::{Action, CreateOrderRequest, Order, Side};
use crate::types::{now_ms, Price, PriceLevel, Quantity, TimestampMs, MAX_PRICE};

/// One side of a game: a market plus its preset bet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSide {
    /// Market ticker
    pub ticker: String,
    /// Display name of the team
    pub team_name: String,
    /// Preset number of contracts
    pub size: u64,
    /// Preset limit price in cents
    pub price_limit: Price,
}

impl GameSide {
    /// Side for `ticker` with its preset bet
    pub fn new(
        ticker: impl Into<String>,
        team_name: impl Into<String>,
        size: u64,
        price_limit: Price,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            team_name: team_name.into(),
            size,
            price_limit,
        }
    }
}

/// A pair of markets traded together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// 8-character hex id
    pub id: String,
    /// Display name
    pub name: String,
    /// First side
    pub side_a: GameSide,
    /// Second side
    pub side_b: GameSide,
    /// Creation time, Unix milliseconds
    pub created_at: TimestampMs,
}

impl Game {
    /// The side selected by `leg`
    pub fn side(&self, leg: Leg) -> &GameSide {
        match leg {
            Leg::A => &self.side_a,
            Leg::B => &self.side_b,
        }
    }
}

/// Which side of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leg {
    /// `side_a`
    A,
    /// `side_b`
    B,
}

impl FromStr for Leg {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(Leg::A),
            "b" => Ok(Leg::B),
            other => Err(Error::InvalidBet(format!("side must be 'a' or 'b', got '{}'", other))),
        }
    }
}

/// Partial update of a game; `None` fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameUpdate {
    /// New display name
    #[serde(default)]
    pub name: Option<String>,
    /// Replacement first side
    #[serde(default)]
    pub side_a: Option<GameSide>,
    /// Replacement second side
    #[serde(default)]
    pub side_b: Option<GameSide>,
}

/// Bet parameters; anything left out falls back to the side's presets
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BetRequest {
    /// Number of contracts
    #[serde(default)]
    pub contracts: Option<u64>,
    /// Limit price in cents
    #[serde(default)]
    pub limit_price: Option<Price>,
    /// Contract to buy; Yes when omitted
    #[serde(default)]
    pub bet_type: Option<Side>,
}

impl BetRequest {
    /// Buy `contracts` Yes contracts at up to `limit_price`
    pub fn new(contracts: u64, limit_price: Price) -> Self {
        Self {
            contracts: Some(contracts),
            limit_price: Some(limit_price),
            bet_type: None,
        }
    }

    /// Buy the given contract instead of Yes
    pub fn side(mut self, side: Side) -> Self {
        self.bet_type = Some(side);
        self
    }
}

/// A validated bet, ready to be sent as a limit order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BetPlan {
    /// Game the bet belongs to
    pub game_id: String,
    /// Market ticker
    pub ticker: String,
    /// Contract being bought
    pub side: Side,
    /// Contracts requested
    pub contracts: u64,
    /// Limit price in cents
    pub limit_price: Price,
    /// Contracts currently offered at or below the limit
    pub fillable: Quantity,
}

impl BetPlan {
    /// Whether the book can fill the whole bet right now
    pub fn fully_fillable(&self) -> bool {
        self.fillable >= self.contracts
    }

    /// The buy order for this bet
    pub fn to_order(&self) -> CreateOrderRequest {
        CreateOrderRequest::limit(
            self.ticker.clone(),
            self.side,
            Action::Buy,
            self.contracts,
            self.limit_price,
        )
    }
}

/// Prices for one side of a game
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideQuote {
    /// Market ticker
    pub ticker: String,
    /// Team display name
    pub team_name: String,
    /// Best Yes ask
    pub yes_ask: Option<Price>,
    /// Best Yes bid
    pub yes_bid: Option<Price>,
    /// Yes ask depth, ascending
    pub yes_asks: Vec<PriceLevel>,
    /// Best No ask (`100 - yes_bid`)
    pub no_ask: Option<Price>,
    /// No ask depth, ascending
    pub no_asks: Vec<PriceLevel>,
}

/// A game together with current prices for both sides
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameQuote {
    /// The game
    pub game: Game,
    /// Prices for `side_a`
    pub side_a: SideQuote,
    /// Prices for `side_b`
    pub side_b: SideQuote,
}

/// Registry of games, backed by the book cache for prices
#[derive(Debug)]
pub struct GameRegistry {
    games: RwLock<FxHashMap<String, Game>>,
    cache: Arc<BookCache>,
    depth: DepthView,
}

impl GameRegistry {
    /// Create an empty registry
    pub fn new(cache: Arc<BookCache>) -> Self {
        let depth = DepthView::new(cache.clone());
        Self {
            games: RwLock::new(FxHashMap::default()),
            cache,
            depth,
        }
    }

    /// Store a new game and subscribe both of its markets
    pub async fn create(&self, name: impl Into<String>, side_a: GameSide, side_b: GameSide) -> Game {
        let game = {
            let mut games = self.games.write();
            let mut id = new_id();
            while games.contains_key(&id) {
                id = new_id();
            }
            let game = Game {
                id: id.clone(),
                name: name.into(),
                side_a,
                side_b,
                created_at: now_ms(),
            };
            games.insert(id, game.clone());
            game
        };
        info!(id = %game.id, name = %game.name, "created game");

        self.cache.subscribe(&game.side_a.ticker).await;
        self.cache.subscribe(&game.side_b.ticker).await;
        game
    }

    /// Look up a game
    pub fn get(&self, id: &str) -> Result<Game, Error> {
        self.games
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::GameNotFound(id.to_string()))
    }

    /// All games, oldest first
    pub fn list(&self) -> Vec<Game> {
        let mut games: Vec<Game> = self.games.read().values().cloned().collect();
        games.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        games
    }

    /// Apply a partial update, subscribing any replaced side's market
    pub async fn update(&self, id: &str, update: GameUpdate) -> Result<Game, Error> {
        let game = {
            let mut games = self.games.write();
            let game = games
                .get_mut(id)
                .ok_or_else(|| Error::GameNotFound(id.to_string()))?;

            if let Some(name) = update.name.filter(|n| !n.is_empty()) {
                game.name = name;
            }
            if let Some(side) = update.side_a.clone() {
                game.side_a = side;
            }
            if let Some(side) = update.side_b.clone() {
                game.side_b = side;
            }
            game.clone()
        };

        // Subscribing a ticker the cache already tracks is a no-op
        for side in [update.side_a, update.side_b].into_iter().flatten() {
            self.cache.subscribe(&side.ticker).await;
        }
        Ok(game)
    }

    /// Remove a game. Its markets stay subscribed.
    pub fn delete(&self, id: &str) -> Result<Game, Error> {
        let removed = self
            .games
            .write()
            .remove(id)
            .ok_or_else(|| Error::GameNotFound(id.to_string()))?;
        info!(id = %id, "deleted game");
        Ok(removed)
    }

    /// Current prices for both sides of a game
    pub fn quote(&self, id: &str) -> Result<GameQuote, Error> {
        let game = self.get(id)?;
        Ok(GameQuote {
            side_a: self.side_quote(&game.side_a),
            side_b: self.side_quote(&game.side_b),
            game,
        })
    }

    fn side_quote(&self, side: &GameSide) -> SideQuote {
        let ticker = side.ticker.as_str();
        SideQuote {
            ticker: side.ticker.clone(),
            team_name: side.team_name.clone(),
            yes_ask: self.depth.best_ask(ticker).map(|l| l.price),
            yes_bid: self.depth.best_bid(ticker).map(|l| l.price),
            yes_asks: self.depth.asks(ticker),
            no_ask: self.depth.no_ask(ticker),
            no_asks: self.depth.no_asks(ticker),
        }
    }

    /// Resolve and validate a bet on one side of a game
    ///
    /// A zero count or zero limit in `request` means "use the preset".
    ///
    /// # Errors
    ///
    /// [`Error::GameNotFound`] for an unknown id, [`Error::InvalidBet`] when
    /// the resolved contract count is zero or the limit is outside 1-99 cents.
    pub fn plan_bet(&self, id: &str, leg: Leg, request: &BetRequest) -> Result<BetPlan, Error> {
        let game = self.get(id)?;
        let side = game.side(leg);

        let contracts = request.contracts.filter(|&c| c > 0).unwrap_or(side.size);
        let limit_price = request
            .limit_price
            .filter(|&p| p > 0)
            .unwrap_or(side.price_limit);
        let bet_type = request.bet_type.unwrap_or(Side::Yes);

        if contracts == 0 {
            return Err(Error::InvalidBet("contracts must be positive".to_string()));
        }
        if limit_price == 0 || limit_price >= MAX_PRICE {
            return Err(Error::InvalidBet(format!(
                "limit price must be between 1 and 99 cents, got {}",
                limit_price
            )));
        }

        Ok(BetPlan {
            game_id: game.id.clone(),
            ticker: side.ticker.clone(),
            side: bet_type,
            contracts,
            limit_price,
            fillable: self.depth.available_for(&side.ticker, bet_type, limit_price),
        })
    }

    /// Plan a bet and submit it as a limit buy
    pub async fn place_bet(
        &self,
        id: &str,
        leg: Leg,
        request: &BetRequest,
        sink: &dyn OrderSink,
    ) -> Result<Order, Error> {
        let plan = self.plan_bet(id, leg, request)?;
        info!(
            game = %plan.game_id,
            ticker = %plan.ticker,
            side = ?plan.side,
            contracts = plan.contracts,
            limit = plan.limit_price,
            fillable = plan.fillable,
            "placing bet"
        );
        sink.submit(&plan.to_order()).await
    }
}

fn new_id() -> String {
    format!("{:08x}", rand::random::<u32>())
}

//! Mock snapshot source for unit testing.
//!
//! This module provides a [`SnapshotSource`] that serves canned books,
//! market info, orders and positions without making network requests.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::FeedError;
use crate::orderbook::types::{WireLevel, WireNumber};
use crate::orderbook::WireBook;
use crate::trading::{OpenOrder, Position};

use super::client::SnapshotSource;
use super::types::MarketInfo;

/// Configuration for mock source behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Whether to fail book requests.
    pub fail_book: bool,
    /// Whether to fail market info requests.
    pub fail_market: bool,
    /// Whether to fail open order requests.
    pub fail_orders: bool,
    /// Whether to fail position requests.
    pub fail_positions: bool,
    /// Simulated latency in milliseconds.
    pub latency_ms: u64,
}

#[derive(Debug, Default)]
struct MockData {
    books: HashMap<String, WireBook>,
    markets: HashMap<String, MarketInfo>,
    orders: Vec<OpenOrder>,
    positions: Vec<Position>,
}

/// Mock snapshot source for testing.
#[derive(Debug, Clone, Default)]
pub struct MockSnapshotSource {
    config: MockConfig,
    data: Arc<Mutex<MockData>>,
}

impl MockSnapshotSource {
    /// Create a new mock source with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock source with custom configuration.
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            data: Arc::default(),
        }
    }

    fn data(&self) -> MutexGuard<'_, MockData> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the book served for a market.
    pub fn set_book(&self, market_id: impl Into<String>, book: WireBook) {
        self.data().books.insert(market_id.into(), book);
    }

    /// Set the last traded Yes price for a market.
    pub fn set_last_price(&self, market_id: impl Into<String>, last_price: Option<Decimal>) {
        let id = market_id.into();
        self.data().markets.insert(
            id.clone(),
            MarketInfo {
                id,
                last_price,
            },
        );
    }

    /// Add an open order to the snapshot.
    pub fn add_order(&self, order: OpenOrder) {
        self.data().orders.push(order);
    }

    /// Add a position to the snapshot.
    pub fn add_position(&self, position: Position) {
        self.data().positions.push(position);
    }

    /// Clear all mock data.
    pub fn clear(&self) {
        *self.data() = MockData::default();
    }

    async fn simulate_latency(&self) {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.config.latency_ms)).await;
        }
    }

    fn failure(endpoint: &str) -> FeedError {
        FeedError::Status {
            endpoint: endpoint.to_string(),
            status: 503,
        }
    }
}

impl SnapshotSource for MockSnapshotSource {
    async fn fetch_book(&self, market_id: &str) -> Result<WireBook, FeedError> {
        self.simulate_latency().await;
        if self.config.fail_book {
            return Err(Self::failure("book"));
        }
        // Unknown markets serve an empty book.
        Ok(self.data().books.get(market_id).cloned().unwrap_or_default())
    }

    async fn fetch_market(&self, market_id: &str) -> Result<MarketInfo, FeedError> {
        self.simulate_latency().await;
        if self.config.fail_market {
            return Err(Self::failure("market"));
        }
        Ok(self
            .data()
            .markets
            .get(market_id)
            .cloned()
            .unwrap_or_else(|| MarketInfo {
                id: market_id.to_string(),
                last_price: None,
            }))
    }

    async fn fetch_open_orders(&self) -> Result<Vec<OpenOrder>, FeedError> {
        self.simulate_latency().await;
        if self.config.fail_orders {
            return Err(Self::failure("orders"));
        }
        Ok(self.data().orders.clone())
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>, FeedError> {
        self.simulate_latency().await;
        if self.config.fail_positions {
            return Err(Self::failure("positions"));
        }
        Ok(self.data().positions.clone())
    }
}

/// Builder for Yes-denominated wire books.
#[derive(Debug, Default)]
pub struct MockBookBuilder {
    bids: Vec<WireLevel>,
    asks: Vec<WireLevel>,
}

impl MockBookBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    fn level(price: Decimal, size: Decimal) -> WireLevel {
        WireLevel(
            WireNumber::Text(price.to_string()),
            WireNumber::Text(size.to_string()),
        )
    }

    /// Add a bid level.
    pub fn bid(mut self, price: Decimal, size: Decimal) -> Self {
        self.bids.push(Self::level(price, size));
        self
    }

    /// Add an ask level.
    pub fn ask(mut self, price: Decimal, size: Decimal) -> Self {
        self.asks.push(Self::level(price, size));
        self
    }

    /// Two levels per side around the given touch, one cent apart.
    pub fn with_spread(self, best_bid: Decimal, best_ask: Decimal, depth: Decimal) -> Self {
        self.bid(best_bid, depth)
            .bid(best_bid - Decimal::ONE, depth * Decimal::TWO)
            .ask(best_ask, depth)
            .ask(best_ask + Decimal::ONE, depth * Decimal::TWO)
    }

    /// Add a raw level pair, for malformed-input tests.
    pub fn raw_bid(mut self, price: &str, size: &str) -> Self {
        self.bids.push(WireLevel(price.into(), size.into()));
        self
    }

    /// Build the wire book.
    pub fn build(self) -> WireBook {
        WireBook {
            bids: self.bids,
            asks: self.asks,
        }
    }
}

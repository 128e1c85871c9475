//! REST snapshot client.
//!
//! Snapshots seed a view before push deltas start arriving: the Yes book,
//! market info (last price), open orders and positions.

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::FeedError;
use crate::metrics;
use crate::orderbook::types::WireNumber;
use crate::orderbook::WireBook;
use crate::reconcile::{decode_order, decode_position, decode_rows, ViewState};
use crate::trading::{OpenOrder, Position};

use super::types::MarketInfo;

/// Source of the snapshots a view is seeded from.
#[allow(async_fn_in_trait)]
pub trait SnapshotSource {
    /// Yes-denominated book for a market.
    async fn fetch_book(&self, market_id: &str) -> Result<WireBook, FeedError>;

    /// Market metadata (last traded Yes price).
    async fn fetch_market(&self, market_id: &str) -> Result<MarketInfo, FeedError>;

    /// The user's open orders across all markets.
    async fn fetch_open_orders(&self) -> Result<Vec<OpenOrder>, FeedError>;

    /// The user's positions across all markets.
    async fn fetch_positions(&self) -> Result<Vec<Position>, FeedError>;
}

/// Market info as served by the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarketResponse {
    #[serde(rename = "_id", alias = "id")]
    id: Option<String>,
    #[serde(alias = "lastTradePrice")]
    last_price: Option<WireNumber>,
}

/// List endpoints answer with a bare array or `{ "data": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Bare(Vec<Value>),
    Wrapped { data: Vec<Value> },
}

impl ListResponse {
    fn into_rows(self) -> Vec<Value> {
        match self {
            ListResponse::Bare(rows) | ListResponse::Wrapped { data: rows } => rows,
        }
    }
}

/// HTTP snapshot client.
#[derive(Debug, Clone)]
pub struct MarketClient {
    http: reqwest::Client,
    api_url: String,
    auth_token: Option<String>,
}

impl MarketClient {
    /// Create a client from config.
    pub fn new(config: &Config) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(Duration::from_millis(config.http_timeout_ms.min(2_000)))
            .tcp_nodelay(true)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    /// REST base URL.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        label: &'static str,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FeedError> {
        let start = Instant::now();
        let url = format!("{}{}", self.api_url, endpoint);

        let mut request = self.http.get(&url).query(query);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        metrics::record_snapshot_fetch_latency(start, label);

        if !response.status().is_success() {
            return Err(FeedError::Status {
                endpoint: endpoint.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.json().await.map_err(|e| FeedError::Parse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }
}

impl SnapshotSource for MarketClient {
    #[instrument(skip(self))]
    async fn fetch_book(&self, market_id: &str) -> Result<WireBook, FeedError> {
        let book: WireBook = self
            .get_json("book", &format!("/markets/{market_id}/orderbook"), &[])
            .await?;
        debug!(bids = book.bids.len(), asks = book.asks.len(), "Fetched book");
        Ok(book)
    }

    #[instrument(skip(self))]
    async fn fetch_market(&self, market_id: &str) -> Result<MarketInfo, FeedError> {
        let endpoint = format!("/markets/{market_id}");
        let response: MarketResponse = self.get_json("market", &endpoint, &[]).await?;

        let last_price = response
            .last_price
            .map(|p| p.decimal())
            .transpose()
            .map_err(|value| FeedError::Parse {
                endpoint: endpoint.clone(),
                reason: format!("lastPrice is not numeric: {value:?}"),
            })?;

        Ok(MarketInfo {
            id: response.id.unwrap_or_else(|| market_id.to_string()),
            last_price,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_open_orders(&self) -> Result<Vec<OpenOrder>, FeedError> {
        let rows: ListResponse = self.get_json("orders", "/orders", &[("status", "open")]).await?;
        Ok(decode_rows(rows.into_rows(), decode_order))
    }

    #[instrument(skip(self))]
    async fn fetch_positions(&self) -> Result<Vec<Position>, FeedError> {
        let rows: ListResponse = self.get_json("positions", "/positions", &[]).await?;
        Ok(decode_rows(rows.into_rows(), decode_position))
    }
}

/// What [`load_view`] seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Open orders now held.
    pub orders: usize,
    /// Positions now held.
    pub positions: usize,
    /// False if the fetched book was malformed and discarded.
    pub book_accepted: bool,
}

/// Fetch all snapshots for the active view concurrently and seed it.
///
/// Order and position failures propagate. A malformed book is discarded
/// (previous ladders stay), and a failed market-info fetch only loses the
/// last price.
pub async fn load_view<S: SnapshotSource>(
    source: &S,
    view: &mut ViewState,
) -> Result<LoadReport, FeedError> {
    let market_id = view.key().market_id.clone();

    let (book, market, orders, positions) = tokio::join!(
        source.fetch_book(&market_id),
        source.fetch_market(&market_id),
        source.fetch_open_orders(),
        source.fetch_positions(),
    );

    let orders = view.seed_orders(orders?);
    let positions = view.seed_positions(positions?);

    match market {
        Ok(info) => view.set_market_info(&info),
        Err(e) => warn!(market = %market_id, error = %e, "Market info unavailable"),
    }

    let book_accepted = view.apply_book(&book?).is_ok();

    info!(
        view = %view.key(),
        orders,
        positions,
        book_accepted,
        "View seeded from snapshots"
    );

    Ok(LoadReport {
        orders,
        positions,
        book_accepted,
    })
}

/// Refetch only the book, after a `chart-update`.
pub async fn refresh_book<S: SnapshotSource>(
    source: &S,
    view: &mut ViewState,
) -> Result<bool, FeedError> {
    let book = source.fetch_book(&view.key().market_id).await?;
    Ok(view.apply_book(&book).is_ok())
}

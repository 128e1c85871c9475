//! Order-book depth, fill simulation and live reconciliation for binary
//! prediction markets.
//!
//! Every market has two complementary outcomes, Yes and No. Only the Yes book
//! is published; the No ladder is derived from it:
//!
//! ```text
//! Yes bid  30¢ x 100   ->   No ask  70¢ x 100
//! Yes ask  40¢ x  50   ->   No bid  60¢ x  50
//! ```
//!
//! Prices are cents in [0, 100]; money is dollars. All arithmetic is
//! [`rust_decimal::Decimal`].
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`market`]: Market identity, snapshot client and mock source
//! - [`orderbook`]: Depth transform, cumulative ladders and summary
//! - [`trading`]: Orders, positions and fill simulation
//! - [`reconcile`]: Live order/position collections driven by push deltas
//! - [`feed`]: WebSocket push channel
//! - [`metrics`]: Metric names and recorders
//! - [`utils`]: Display formatting helpers

pub mod config;
pub mod error;
pub mod feed;
pub mod market;
pub mod metrics;
pub mod orderbook;
pub mod reconcile;
pub mod trading;
pub mod utils;

pub use config::Config;
pub use error::{CoreError, Result};

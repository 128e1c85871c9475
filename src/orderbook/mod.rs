//! Order book module for outcome ladders.
//!
//! This module handles:
//! - Book snapshot types and depth views
//! - The Yes/No complementary transform with cumulative totals
//! - Best bid/ask, spread and last-price summary
//! - Retaining the last valid ladders across malformed snapshots

pub mod depth;
pub mod summary;
pub mod tracker;
pub mod types;

pub use depth::{build_depth, transform_book};
pub use summary::{summarize, MarketSummary};
pub use tracker::DepthTracker;
pub use types::{BookSideKind, DepthView, OutcomeDepth, PriceLevel, RawBook, WireBook, WireLevel};

//! Market module for binary prediction markets.
//!
//! This module handles:
//! - Outcome, market and view identity types
//! - REST snapshot client and view seeding
//! - Mock snapshot source for testing

pub mod client;
pub mod mock;
pub mod types;

pub use client::{load_view, refresh_book, LoadReport, MarketClient, SnapshotSource};
pub use mock::{MockBookBuilder, MockConfig, MockSnapshotSource};
pub use types::{EventRef, MarketInfo, MarketRef, Outcome, ViewKey};

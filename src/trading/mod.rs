//! Trading module for orders, positions and fill estimates.
//!
//! This module handles:
//! - Open order types and lifecycle status
//! - Position tracking and P&L
//! - Market order fill simulation and limit order estimates

pub mod fill;
pub mod order;
pub mod position;

pub use fill::{estimate_limit, simulate, simulate_buy, simulate_sell, FillEstimate, LimitEstimate};
pub use order::{Action, OpenOrder, OrderStatus, TimeInForce};
pub use position::{FilledLot, Position};

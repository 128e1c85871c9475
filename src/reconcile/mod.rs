//! Live reconciliation of open orders and positions.
//!
//! This module handles:
//! - Keyed, market-grouped collections updated by insert/update/remove deltas
//! - Decoding push-channel events into strict order and position values
//! - Scoping view state to one subscription and dropping stale events

pub mod collection;
pub mod delta;
pub mod view;

pub use collection::{DeltaOutcome, LiveCollection, LiveEntry};
pub use delta::{decode_event, decode_order, decode_position, decode_rows, PushEvent};
pub use view::{Envelope, SubscriptionId, ViewAction, ViewState};

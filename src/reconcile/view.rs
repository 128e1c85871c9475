//! State behind one (market, outcome) view.
//!
//! Every push message is tagged with the [`SubscriptionId`] it arrived on.
//! Switching the view mints a new ID, so messages still in flight from the
//! previous subscription are recognized and dropped instead of touching the
//! new view's state.

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::collection::{DeltaOutcome, LiveCollection};
use super::delta::{decode_event, PushEvent};
use crate::error::{BookError, DeltaError};
use crate::market::{MarketInfo, ViewKey};
use crate::metrics;
use crate::orderbook::{DepthTracker, MarketSummary, OutcomeDepth, WireBook};
use crate::trading::{simulate, Action, FillEstimate, OpenOrder, Position};

/// Identifies one subscription lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A decoded push event with the subscription it arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Subscription that produced the event.
    pub subscription: SubscriptionId,
    /// The event.
    pub event: PushEvent,
}

/// What [`ViewState::handle`] did with an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
    /// An order or position delta was applied.
    Applied(DeltaOutcome),
    /// The active market's book changed; the caller should refetch it.
    RefreshBook,
    /// Arrived on a subscription that is no longer active.
    Stale,
    /// Valid but irrelevant to this view.
    Ignored,
}

/// Depth, orders and positions for the active view.
#[derive(Debug)]
pub struct ViewState {
    key: ViewKey,
    subscription: SubscriptionId,
    next_subscription: u64,
    depth: DepthTracker,
    orders: LiveCollection<OpenOrder>,
    positions: LiveCollection<Position>,
}

impl ViewState {
    /// Create the state for `key` under the first subscription.
    pub fn new(key: ViewKey) -> Self {
        Self {
            depth: DepthTracker::new(key.outcome),
            key,
            subscription: SubscriptionId(1),
            next_subscription: 2,
            orders: LiveCollection::new(),
            positions: LiveCollection::new(),
        }
    }

    /// Active view key.
    pub fn key(&self) -> &ViewKey {
        &self.key
    }

    /// Active subscription.
    pub fn subscription(&self) -> SubscriptionId {
        self.subscription
    }

    /// Switch to another market or outcome.
    ///
    /// All cached state is dropped and a fresh subscription ID is returned;
    /// the caller must reseed from snapshots under that ID.
    pub fn switch_to(&mut self, key: ViewKey) -> SubscriptionId {
        let previous = self.subscription;
        self.subscription = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;

        info!(from = %self.key, to = %key, %previous, current = %self.subscription, "Switching view");

        self.depth = DepthTracker::new(key.outcome);
        self.key = key;
        self.orders.clear();
        self.positions.clear();
        self.subscription
    }

    /// Seed open orders from a snapshot.
    pub fn seed_orders(&mut self, orders: Vec<OpenOrder>) -> usize {
        self.orders.seed(orders)
    }

    /// Seed positions from a snapshot.
    pub fn seed_positions(&mut self, positions: Vec<Position>) -> usize {
        self.positions.seed(positions)
    }

    /// Replace the ladders from a fetched book. On error the previous
    /// ladders stay visible.
    pub fn apply_book(&mut self, wire: &WireBook) -> Result<&OutcomeDepth, BookError> {
        self.depth.apply_wire(wire)
    }

    /// Record market metadata for the summary. Info for another market is
    /// ignored.
    pub fn set_market_info(&mut self, info: &MarketInfo) {
        if info.id != self.key.market_id {
            debug!(view = %self.key, market = %info.id, "Ignoring info for another market");
            return;
        }
        self.depth.set_last_price(info.last_price);
    }

    /// Apply one push event.
    pub fn handle(&mut self, envelope: Envelope) -> ViewAction {
        if envelope.subscription != self.subscription {
            debug!(
                received = %envelope.subscription,
                active = %self.subscription,
                "Dropping event from stale subscription"
            );
            metrics::inc_delta_dropped("stale_subscription");
            return ViewAction::Stale;
        }

        match envelope.event {
            PushEvent::Order(order) => ViewAction::Applied(self.orders.apply(order)),
            PushEvent::Position(position) => ViewAction::Applied(self.positions.apply(position)),
            PushEvent::BookRefresh { market_id } => match market_id {
                Some(id) if id != self.key.market_id => ViewAction::Ignored,
                _ => ViewAction::RefreshBook,
            },
        }
    }

    /// Decode and apply a raw push message. Undecodable messages are logged
    /// and dropped.
    pub fn handle_raw(&mut self, subscription: SubscriptionId, text: &str) -> ViewAction {
        match decode_event(text) {
            Ok(event) => self.handle(Envelope {
                subscription,
                event,
            }),
            Err(e) => {
                self.reject(&e);
                ViewAction::Ignored
            }
        }
    }

    fn reject(&self, error: &DeltaError) {
        warn!(view = %self.key, error = %error, "Dropping malformed push event");
        metrics::inc_delta_dropped(error.reason());
    }

    /// Simulate a market order against the current ladders.
    pub fn quote(&self, action: Action, amount: Decimal, taker_fee: Decimal) -> FillEstimate {
        match self.depth.depth() {
            Some(depth) => simulate(depth, action, amount, taker_fee),
            None => simulate(&OutcomeDepth::empty(self.key.outcome), action, amount, taker_fee),
        }
    }

    /// Summary line for the current ladders.
    pub fn summary(&self) -> MarketSummary {
        self.depth.summary()
    }

    /// Current ladders, if a snapshot has been accepted.
    pub fn depth(&self) -> Option<&OutcomeDepth> {
        self.depth.depth()
    }

    /// Open orders.
    pub fn orders(&self) -> &LiveCollection<OpenOrder> {
        &self.orders
    }

    /// Positions.
    pub fn positions(&self) -> &LiveCollection<Position> {
        &self.positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{MarketRef, Outcome};
    use crate::orderbook::WireLevel;
    use crate::trading::{OrderStatus, TimeInForce};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn order(id: &str, market: &str, status: OrderStatus) -> OpenOrder {
        OpenOrder {
            id: id.to_string(),
            market: MarketRef {
                id: market.to_string(),
                ..MarketRef::default()
            },
            price: dec!(40),
            quantity: dec!(10),
            exec_qty: Decimal::ZERO,
            side: Outcome::Yes,
            user_side: None,
            action: Action::Buy,
            time_in_force: TimeInForce::GTC,
            expiration: None,
            status,
            created_at: None,
        }
    }

    fn envelope(sub: SubscriptionId, event: PushEvent) -> Envelope {
        Envelope {
            subscription: sub,
            event,
        }
    }

    #[test]
    fn open_then_cancel_removes_order_and_group() {
        let mut view = ViewState::new(ViewKey::new("m1", Outcome::Yes));
        let sub = view.subscription();

        let action = view.handle(envelope(sub, PushEvent::Order(order("A", "m1", OrderStatus::Open))));
        assert_eq!(action, ViewAction::Applied(DeltaOutcome::Inserted));
        assert_eq!(view.orders().group("m1").map(<[OpenOrder]>::len), Some(1));

        let action = view.handle(envelope(
            sub,
            PushEvent::Order(order("A", "m1", OrderStatus::Cancelled)),
        ));
        assert_eq!(action, ViewAction::Applied(DeltaOutcome::Removed));
        assert!(view.orders().group("m1").is_none());
    }

    #[test]
    fn repeated_terminal_event_changes_nothing() {
        let mut view = ViewState::new(ViewKey::new("m1", Outcome::Yes));
        let sub = view.subscription();
        view.seed_orders(vec![order("B", "m1", OrderStatus::Open)]);

        let done = || PushEvent::Order(order("A", "m1", OrderStatus::Completed));
        assert_eq!(
            view.handle(envelope(sub, done())),
            ViewAction::Applied(DeltaOutcome::Ignored)
        );
        assert_eq!(
            view.handle(envelope(sub, done())),
            ViewAction::Applied(DeltaOutcome::Ignored)
        );
        assert_eq!(view.orders().len(), 1);
        assert!(view.orders().contains("B"));
    }

    #[test]
    fn events_from_previous_subscription_are_dropped() {
        let mut view = ViewState::new(ViewKey::new("m1", Outcome::Yes));
        let old = view.subscription();
        let new = view.switch_to(ViewKey::new("m2", Outcome::No));
        assert_ne!(old, new);

        let action = view.handle(envelope(old, PushEvent::Order(order("A", "m1", OrderStatus::Open))));
        assert_eq!(action, ViewAction::Stale);
        assert!(view.orders().is_empty());

        let action = view.handle(envelope(new, PushEvent::Order(order("A", "m2", OrderStatus::Open))));
        assert_eq!(action, ViewAction::Applied(DeltaOutcome::Inserted));
    }

    #[test]
    fn switching_clears_depth_and_collections() {
        let mut view = ViewState::new(ViewKey::new("m1", Outcome::Yes));
        view.seed_orders(vec![order("A", "m1", OrderStatus::Open)]);
        view.apply_book(&WireBook {
            bids: vec![WireLevel("40".into(), "5".into())],
            asks: vec![],
        })
        .unwrap();

        view.switch_to(ViewKey::new("m1", Outcome::No));
        assert!(view.orders().is_empty());
        assert!(view.depth().is_none());
        assert_eq!(view.key().outcome, Outcome::No);
    }

    #[test]
    fn chart_update_for_other_market_is_ignored() {
        let mut view = ViewState::new(ViewKey::new("m1", Outcome::Yes));
        let sub = view.subscription();

        let text = json!({"type": "chart-update", "data": {"marketId": "m1"}}).to_string();
        assert_eq!(view.handle_raw(sub, &text), ViewAction::RefreshBook);

        let text = json!({"type": "chart-update", "data": {"marketId": "m9"}}).to_string();
        assert_eq!(view.handle_raw(sub, &text), ViewAction::Ignored);
    }

    #[test]
    fn malformed_raw_event_is_dropped() {
        let mut view = ViewState::new(ViewKey::new("m1", Outcome::Yes));
        let sub = view.subscription();
        let text = json!({"type": "order", "data": {"marketId": "m1"}}).to_string();

        assert_eq!(view.handle_raw(sub, &text), ViewAction::Ignored);
        assert!(view.orders().is_empty());
    }

    #[test]
    fn quote_and_summary_use_viewed_outcome() {
        let mut view = ViewState::new(ViewKey::new("m1", Outcome::No));
        view.apply_book(&WireBook {
            bids: vec![WireLevel("30".into(), "100".into())],
            asks: vec![WireLevel("40".into(), "100".into())],
        })
        .unwrap();
        view.set_market_info(&MarketInfo {
            id: "m1".to_string(),
            last_price: Some(dec!(35)),
        });

        let summary = view.summary();
        assert_eq!(summary.best_bid, Some(dec!(60)));
        assert_eq!(summary.best_ask, Some(dec!(70)));
        assert_eq!(summary.spread_display(), "10.00");
        assert_eq!(summary.last_price, Some(dec!(65)));

        // Buying No lifts the complemented Yes bids: 70 cents each.
        let est = view.quote(Action::Buy, dec!(7), Decimal::ZERO);
        assert_eq!(est.contracts, dec!(10));
    }

    #[test]
    fn quote_without_book_fills_nothing() {
        let view = ViewState::new(ViewKey::new("m1", Outcome::Yes));
        assert!(view.quote(Action::Buy, dec!(5), Decimal::ZERO).is_empty());
        assert_eq!(view.summary().spread_display(), "--");
    }
}

//! View seeding and push reconciliation against the mock snapshot source.

use market_ladder::market::{
    load_view, refresh_book, MockBookBuilder, MockConfig, MockSnapshotSource, Outcome, ViewKey,
};
use market_ladder::reconcile::{decode_order, DeltaOutcome, ViewAction, ViewState};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use serde_json::json;

fn order_event(id: &str, market: &str, status: &str) -> String {
    json!({
        "type": "order",
        "data": {
            "_id": id,
            "marketId": {"_id": market, "eventId": "e1"},
            "price": 40,
            "quantity": 10,
            "execQty": 0,
            "side": "yes",
            "action": "buy",
            "status": status
        }
    })
    .to_string()
}

fn position_event(id: &str, market: &str, quantity: u32) -> String {
    json!({
        "type": "position",
        "data": json!({
            "_id": id,
            "eventId": "e1",
            "marketId": market,
            "outcomes": ["Yes", "No"],
            "side": "yes",
            "filled": [{"price": 38}],
            "quantity": quantity,
            "last": 41
        })
        .to_string()
    })
    .to_string()
}

fn seeded_source() -> MockSnapshotSource {
    let source = MockSnapshotSource::new();
    source.set_book(
        "m1",
        MockBookBuilder::new()
            .bid(dec!(30), dec!(100))
            .ask(dec!(40), dec!(50))
            .build(),
    );
    source.set_last_price("m1", Some(dec!(35)));
    source.add_order(
        decode_order(json!({
            "_id": "seed", "marketId": "m2", "price": 20, "quantity": 5,
            "side": "no", "action": "sell", "status": "open"
        }))
        .unwrap(),
    );
    source
}

#[tokio::test]
async fn load_view_seeds_depth_orders_and_summary() {
    let source = seeded_source();
    let mut view = ViewState::new(ViewKey::new("m1", Outcome::No));

    let report = load_view(&source, &mut view).await.unwrap();

    assert_eq!(report.orders, 1);
    assert!(report.book_accepted);
    let summary = view.summary();
    assert_eq!(summary.best_bid, Some(dec!(60)));
    assert_eq!(summary.best_ask, Some(dec!(70)));
    assert_eq!(summary.spread_display(), "10.00");
    assert_eq!(summary.last_price_display(), "65.00¢");
}

#[tokio::test]
async fn push_lifecycle_for_orders_and_positions() {
    let source = seeded_source();
    let mut view = ViewState::new(ViewKey::new("m1", Outcome::Yes));
    load_view(&source, &mut view).await.unwrap();
    let sub = view.subscription();

    assert_eq!(
        view.handle_raw(sub, &order_event("A", "m1", "open")),
        ViewAction::Applied(DeltaOutcome::Inserted)
    );
    assert_eq!(view.orders().group_count(), 2);

    assert_eq!(
        view.handle_raw(sub, &order_event("A", "m1", "filled")),
        ViewAction::Applied(DeltaOutcome::Removed)
    );
    assert!(view.orders().group("m1").is_none());
    assert_eq!(
        view.handle_raw(sub, &order_event("A", "m1", "filled")),
        ViewAction::Applied(DeltaOutcome::Ignored)
    );

    assert_eq!(
        view.handle_raw(sub, &position_event("P", "m1", 4)),
        ViewAction::Applied(DeltaOutcome::Inserted)
    );
    let position = view.positions().get("P").unwrap();
    assert_eq!(position.pnl(), Some(dec!(0.12)));

    assert_eq!(
        view.handle_raw(sub, &position_event("P", "m1", 0)),
        ViewAction::Applied(DeltaOutcome::Removed)
    );
    assert!(view.positions().is_empty());
}

#[tokio::test]
async fn switching_view_drops_stale_events() {
    let source = seeded_source();
    let mut view = ViewState::new(ViewKey::new("m1", Outcome::Yes));
    load_view(&source, &mut view).await.unwrap();
    let old = view.subscription();

    let new = view.switch_to(ViewKey::new("m1", Outcome::No));
    assert_eq!(
        view.handle_raw(old, &order_event("late", "m1", "open")),
        ViewAction::Stale
    );
    assert!(view.orders().is_empty());

    load_view(&source, &mut view).await.unwrap();
    assert_eq!(
        view.handle_raw(new, &order_event("fresh", "m1", "open")),
        ViewAction::Applied(DeltaOutcome::Inserted)
    );
}

#[tokio::test]
async fn malformed_book_refresh_keeps_previous_ladder() {
    let source = seeded_source();
    let mut view = ViewState::new(ViewKey::new("m1", Outcome::Yes));
    load_view(&source, &mut view).await.unwrap();
    let before = view.depth().cloned();

    source.set_book("m1", MockBookBuilder::new().raw_bid("abc", "1").build());
    let accepted = refresh_book(&source, &mut view).await.unwrap();

    assert!(!accepted);
    assert_eq!(view.depth().cloned(), before);
}

#[tokio::test]
async fn oversized_book_refresh_keeps_previous_ladder() {
    let source = seeded_source();
    let mut view = ViewState::new(ViewKey::new("m1", Outcome::No));
    load_view(&source, &mut view).await.unwrap();
    let before = view.depth().cloned();

    source.set_book(
        "m1",
        MockBookBuilder::new()
            .raw_bid("50", "79228162514264337593543950335")
            .build(),
    );
    let accepted = refresh_book(&source, &mut view).await.unwrap();

    assert!(!accepted);
    assert_eq!(view.depth().cloned(), before);
}

#[tokio::test]
async fn failing_order_snapshot_propagates() {
    let source = MockSnapshotSource::with_config(MockConfig {
        fail_orders: true,
        ..Default::default()
    });
    let mut view = ViewState::new(ViewKey::new("m1", Outcome::Yes));

    assert!(load_view(&source, &mut view).await.is_err());
}

#[tokio::test]
async fn failing_market_info_only_loses_last_price() {
    let source = MockSnapshotSource::with_config(MockConfig {
        fail_market: true,
        ..Default::default()
    });
    source.set_book("m1", MockBookBuilder::new().bid(dec!(30), dec!(1)).build());
    let mut view = ViewState::new(ViewKey::new("m1", Outcome::Yes));

    let report = load_view(&source, &mut view).await.unwrap();

    assert!(report.book_accepted);
    assert_eq!(view.summary().last_price_display(), "-");
    assert_eq!(view.summary().spread_display(), "--");
}

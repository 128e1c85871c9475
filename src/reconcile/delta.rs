//! Push-channel decoding.
//!
//! Loosely shaped JSON is validated here and converted into strict
//! [`OpenOrder`] / [`Position`] values before it reaches a collection.
//! Anything that fails decoding is reported as a [`DeltaError`]; callers log
//! and drop it.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::warn;

use crate::error::DeltaError;
use crate::market::{EventRef, MarketRef, Outcome};
use crate::metrics;
use crate::orderbook::types::WireNumber;
use crate::trading::{Action, FilledLot, OpenOrder, OrderStatus, Position, TimeInForce};

/// Decoded push event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// Order insert/update/terminal delta.
    Order(OpenOrder),
    /// Position insert/update/close delta.
    Position(Position),
    /// `chart-update`: the book for `market_id` (or the active one) changed.
    BookRefresh {
        /// Market to refresh, when the event names one.
        market_id: Option<String>,
    },
}

/// Envelope on the push channel: `{"type": ..., "data": ...}`.
#[derive(Debug, Deserialize)]
struct WireEnvelope {
    #[serde(rename = "type", alias = "event")]
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireTime {
    Millis(i64),
    Text(String),
}

impl WireTime {
    fn parse(&self, field: &'static str) -> Result<OffsetDateTime, DeltaError> {
        let invalid = || DeltaError::InvalidField {
            field,
            value: match self {
                WireTime::Millis(ms) => ms.to_string(),
                WireTime::Text(s) => s.clone(),
            },
        };
        match self {
            WireTime::Millis(ms) => from_millis(*ms).ok_or_else(invalid),
            WireTime::Text(s) => OffsetDateTime::parse(s, &Rfc3339)
                .ok()
                .or_else(|| s.trim().parse::<i64>().ok().and_then(from_millis))
                .ok_or_else(invalid),
        }
    }
}

fn from_millis(ms: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok()
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(rename = "_id")]
    id: Option<String>,
    slug: Option<String>,
    image: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireEventField {
    Object(WireEvent),
    Id(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMarket {
    #[serde(rename = "_id")]
    id: Option<String>,
    group_item_title: Option<String>,
    outcome: Option<String>,
    event_id: Option<WireEventField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireMarketField {
    Object(WireMarket),
    Id(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOrder {
    #[serde(rename = "_id")]
    id: Option<String>,
    market_id: Option<WireMarketField>,
    price: Option<WireNumber>,
    quantity: Option<WireNumber>,
    exec_qty: Option<WireNumber>,
    side: Option<String>,
    user_side: Option<String>,
    action: Option<String>,
    status: Option<String>,
    time_in_force: Option<String>,
    expiration: Option<WireTime>,
    created_at: Option<WireTime>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireOutcomes {
    List(Vec<String>),
    Encoded(String),
}

#[derive(Debug, Deserialize)]
struct WireLot {
    price: WireNumber,
    #[serde(default)]
    quantity: Option<WireNumber>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePosition {
    #[serde(rename = "_id")]
    id: Option<String>,
    event_id: Option<String>,
    event_title: Option<String>,
    event_image: Option<String>,
    event_slug: Option<String>,
    market_id: Option<String>,
    market_group_title: Option<String>,
    outcomes: Option<WireOutcomes>,
    side: Option<String>,
    #[serde(default)]
    filled: Vec<WireLot>,
    quantity: Option<WireNumber>,
    last: Option<WireNumber>,
}

fn non_empty(value: Option<String>, key: &'static str) -> Result<String, DeltaError> {
    value
        .filter(|s| !s.trim().is_empty())
        .ok_or(DeltaError::MissingKey(key))
}

fn decimal(value: &WireNumber, field: &'static str) -> Result<Decimal, DeltaError> {
    value
        .decimal()
        .map_err(|value| DeltaError::InvalidField { field, value })
}

fn enum_field<T: FromStr>(value: &str, field: &'static str) -> Result<T, DeltaError> {
    T::from_str(value.trim()).map_err(|_| DeltaError::InvalidField {
        field,
        value: value.to_string(),
    })
}

/// Field required on live deltas. Terminal deltas may omit it, since the
/// entry is about to leave the collection anyway.
fn required<T, F>(
    value: Option<T>,
    key: &'static str,
    terminal: bool,
    fallback: F,
) -> Result<T, DeltaError>
where
    F: FnOnce() -> T,
{
    match value {
        Some(v) => Ok(v),
        None if terminal => Ok(fallback()),
        None => Err(DeltaError::MissingKey(key)),
    }
}

/// Unwrap a payload that may arrive as a JSON-encoded string.
fn unwrap_payload(data: Value) -> Result<Value, DeltaError> {
    match data {
        Value::String(encoded) => Ok(serde_json::from_str(&encoded)?),
        other => Ok(other),
    }
}

/// Decode an order delta or snapshot row.
///
/// `_id`, `marketId` and `status` are always required. Price, quantity,
/// side and action are required unless the status is terminal.
pub fn decode_order(value: Value) -> Result<OpenOrder, DeltaError> {
    let wire: WireOrder = serde_json::from_value(unwrap_payload(value)?)?;

    let id = non_empty(wire.id, "_id")?;
    let market = match wire.market_id.ok_or(DeltaError::MissingKey("marketId"))? {
        WireMarketField::Id(id) => MarketRef {
            id: non_empty(Some(id), "marketId")?,
            ..MarketRef::default()
        },
        WireMarketField::Object(m) => MarketRef {
            id: non_empty(m.id, "marketId._id")?,
            group_item_title: m.group_item_title,
            outcome: m.outcome,
            event: match m.event_id {
                Some(WireEventField::Object(e)) => Some(EventRef {
                    id: e.id.unwrap_or_default(),
                    slug: e.slug,
                    image: e.image,
                    title: e.title,
                }),
                Some(WireEventField::Id(id)) => Some(EventRef {
                    id,
                    ..EventRef::default()
                }),
                None => None,
            },
        },
    };

    let status: OrderStatus =
        enum_field(&wire.status.ok_or(DeltaError::MissingKey("status"))?, "status")?;
    let terminal = status.is_terminal();

    let price = wire.price.map(|p| decimal(&p, "price")).transpose()?;
    let quantity = wire.quantity.map(|q| decimal(&q, "quantity")).transpose()?;
    let exec_qty = wire.exec_qty.map(|q| decimal(&q, "execQty")).transpose()?;
    let side = wire.side.map(|s| enum_field(&s, "side")).transpose()?;
    let action = wire.action.map(|a| enum_field(&a, "action")).transpose()?;
    let time_in_force: Option<TimeInForce> = wire
        .time_in_force
        .map(|t| enum_field(&t, "timeInForce"))
        .transpose()?;

    Ok(OpenOrder {
        id,
        market,
        price: required(price, "price", terminal, || Decimal::ZERO)?,
        quantity: required(quantity, "quantity", terminal, || Decimal::ZERO)?,
        exec_qty: exec_qty.unwrap_or(Decimal::ZERO),
        side: required(side, "side", terminal, Outcome::default)?,
        user_side: wire.user_side,
        action: required(action, "action", terminal, || Action::Buy)?,
        time_in_force: time_in_force.unwrap_or_default(),
        expiration: wire.expiration.map(|t| t.parse("expiration")).transpose()?,
        status,
        created_at: wire.created_at.map(|t| t.parse("createdAt")).transpose()?,
    })
}

/// Decode a position delta or snapshot row.
///
/// `_id`, `marketId` and `quantity` are always required; `side` unless the
/// quantity is zero.
pub fn decode_position(value: Value) -> Result<Position, DeltaError> {
    let wire: WirePosition = serde_json::from_value(unwrap_payload(value)?)?;

    let id = non_empty(wire.id, "_id")?;
    let market_id = non_empty(wire.market_id, "marketId")?;
    let quantity = decimal(
        &wire.quantity.ok_or(DeltaError::MissingKey("quantity"))?,
        "quantity",
    )?;
    if quantity < Decimal::ZERO {
        return Err(DeltaError::InvalidField {
            field: "quantity",
            value: quantity.to_string(),
        });
    }
    let side = wire.side.map(|s| enum_field(&s, "side")).transpose()?;

    let outcomes = match wire.outcomes {
        Some(WireOutcomes::List(list)) => list,
        Some(WireOutcomes::Encoded(encoded)) => {
            serde_json::from_str(&encoded).map_err(|_| DeltaError::InvalidField {
                field: "outcomes",
                value: encoded,
            })?
        }
        None => Vec::new(),
    };

    let filled = wire
        .filled
        .iter()
        .map(|lot| {
            Ok(FilledLot {
                price: decimal(&lot.price, "filled.price")?,
                quantity: lot
                    .quantity
                    .as_ref()
                    .map(|q| decimal(q, "filled.quantity"))
                    .transpose()?,
            })
        })
        .collect::<Result<Vec<_>, DeltaError>>()?;

    Ok(Position {
        id,
        event: EventRef {
            id: wire.event_id.unwrap_or_default(),
            slug: wire.event_slug,
            image: wire.event_image,
            title: wire.event_title,
        },
        market_id,
        market_group_title: wire.market_group_title,
        outcomes,
        side: required(side, "side", quantity.is_zero(), Outcome::default)?,
        quantity,
        filled,
        last: wire.last.map(|l| decimal(&l, "last")).transpose()?,
    })
}

/// Decode one push-channel message.
pub fn decode_event(text: &str) -> Result<PushEvent, DeltaError> {
    let envelope: WireEnvelope = serde_json::from_str(text)?;

    match envelope.kind.as_str() {
        "order" | "orders" => decode_order(envelope.data).map(PushEvent::Order),
        "position" | "positions" => decode_position(envelope.data).map(PushEvent::Position),
        "chart-update" | "book" => {
            let data = unwrap_payload(envelope.data)?;
            let market_id = data
                .get("marketId")
                .or_else(|| data.get("_id"))
                .and_then(Value::as_str)
                .map(str::to_string);
            Ok(PushEvent::BookRefresh { market_id })
        }
        other => Err(DeltaError::UnknownEvent(other.to_string())),
    }
}

/// Decode snapshot rows, dropping (and logging) the ones that fail.
pub fn decode_rows<T>(
    rows: Vec<Value>,
    decode: impl Fn(Value) -> Result<T, DeltaError>,
) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match decode(row) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Dropping malformed snapshot row");
                metrics::inc_delta_dropped(e.reason());
                None
            }
        })
        .collect()
}

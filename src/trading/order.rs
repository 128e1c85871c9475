//! Open order types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;

use crate::market::{MarketRef, Outcome};
use crate::reconcile::LiveEntry;

/// Order action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Buy contracts of the referenced outcome.
    #[strum(to_string = "buy", serialize = "BUY", serialize = "Buy")]
    Buy,
    /// Sell contracts of the referenced outcome.
    #[strum(to_string = "sell", serialize = "SELL", serialize = "Sell")]
    Sell,
}

/// Order time-in-force.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Good-till-cancelled: stays on book until filled or cancelled.
    #[default]
    #[strum(to_string = "GTC", serialize = "gtc")]
    GTC,
    /// Good-till-date: expires at `expiration`.
    #[strum(to_string = "GTD", serialize = "gtd")]
    GTD,
}

/// Order status as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Accepted, not yet resting.
    #[strum(to_string = "pending", serialize = "PENDING")]
    Pending,
    /// Resting on the book.
    #[strum(to_string = "open", serialize = "OPEN")]
    Open,
    /// Fully executed.
    #[strum(to_string = "completed", serialize = "COMPLETED", serialize = "filled")]
    Completed,
    /// Cancelled by the user or the exchange.
    #[strum(
        to_string = "cancelled",
        serialize = "canceled",
        serialize = "CANCELLED",
        serialize = "CANCELED"
    )]
    Cancelled,
    /// GTD order reached its expiration.
    #[strum(to_string = "expired", serialize = "EXPIRED")]
    Expired,
}

impl OrderStatus {
    /// Check if status is terminal (order leaves the open set).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }
}

/// A resting order owned by the user.
///
/// Never built from user input; only from a snapshot fetch or a push delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOrder {
    /// Order ID (stable, unique).
    pub id: String,
    /// Market the order rests in (immutable).
    pub market: MarketRef,
    /// Limit price in cents.
    pub price: Decimal,
    /// Original quantity.
    pub quantity: Decimal,
    /// Quantity executed so far.
    pub exec_qty: Decimal,
    /// Outcome the order references.
    pub side: Outcome,
    /// User-side label carried by the exchange (display only).
    pub user_side: Option<String>,
    /// Buy or sell.
    pub action: Action,
    /// Time-in-force.
    pub time_in_force: TimeInForce,
    /// Expiration for GTD orders.
    pub expiration: Option<OffsetDateTime>,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Creation time (immutable).
    pub created_at: Option<OffsetDateTime>,
}

impl OpenOrder {
    /// Quantity still resting.
    pub fn remaining(&self) -> Decimal {
        self.quantity.saturating_sub(self.exec_qty).max(Decimal::ZERO)
    }

    /// Executed fraction in [0, 1].
    pub fn fill_ratio(&self) -> Decimal {
        if self.quantity <= Decimal::ZERO {
            Decimal::ZERO
        } else {
            self.exec_qty
                .checked_div(self.quantity)
                .map_or(Decimal::ONE, |ratio| ratio.min(Decimal::ONE))
        }
    }

    /// Dollar value of the resting remainder at the limit price.
    pub fn resting_value(&self) -> Option<Decimal> {
        Some(self.remaining().checked_mul(self.price)? / Outcome::PAR_CENTS)
    }

    /// True if a GTD order's expiration is at or before `now`.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        match (self.time_in_force, self.expiration) {
            (TimeInForce::GTD, Some(expiration)) => expiration <= now,
            _ => false,
        }
    }
}

impl LiveEntry for OpenOrder {
    const ENTITY: &'static str = "order";

    fn key(&self) -> &str {
        &self.id
    }

    fn group(&self) -> &str {
        &self.market.id
    }

    fn is_live(&self) -> bool {
        !self.status.is_terminal()
    }

    fn absorb(&mut self, update: Self) {
        self.price = update.price;
        self.quantity = update.quantity;
        self.exec_qty = update.exec_qty;
        self.side = update.side;
        self.user_side = update.user_side;
        self.action = update.action;
        self.time_in_force = update.time_in_force;
        self.expiration = update.expiration;
        self.status = update.status;
    }
}

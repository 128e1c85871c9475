//! Position tracking.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::market::{EventRef, Outcome};
use crate::reconcile::LiveEntry;

/// One fill contributing to a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilledLot {
    /// Fill price in cents.
    pub price: Decimal,
    /// Filled quantity, when reported.
    #[serde(default)]
    pub quantity: Option<Decimal>,
}

/// User position in one outcome of one market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// Position ID.
    pub id: String,
    /// Parent event.
    pub event: EventRef,
    /// Market ID (grouping key, immutable).
    pub market_id: String,
    /// Title of the market inside its event group.
    pub market_group_title: Option<String>,
    /// Outcome labels of the market.
    pub outcomes: Vec<String>,
    /// Outcome held.
    pub side: Outcome,
    /// Contracts held; zero means the position no longer exists.
    pub quantity: Decimal,
    /// Fills, first entry carries the reference average entry price.
    pub filled: Vec<FilledLot>,
    /// Current mark price in cents.
    pub last: Option<Decimal>,
}

impl Position {
    /// Average entry price (`filled[0].price`).
    pub fn entry_price(&self) -> Option<Decimal> {
        self.filled.first().map(|lot| lot.price)
    }

    /// Cost basis in dollars.
    pub fn cost_basis(&self) -> Option<Decimal> {
        self.entry_price()
            .and_then(|entry| entry.checked_mul(self.quantity))
            .map(|cents| cents / Outcome::PAR_CENTS)
    }

    /// Value at the mark price, in dollars.
    pub fn current_value(&self) -> Option<Decimal> {
        self.last
            .and_then(|last| last.checked_mul(self.quantity))
            .map(|cents| cents / Outcome::PAR_CENTS)
    }

    /// Unrealized P&L in dollars.
    pub fn pnl(&self) -> Option<Decimal> {
        self.current_value()?.checked_sub(self.cost_basis()?)
    }

    /// Unrealized P&L as a percentage of entry.
    pub fn pnl_percent(&self) -> Option<Decimal> {
        let entry = self.entry_price()?;
        if entry.is_zero() {
            return None;
        }
        self.last?
            .checked_sub(entry)?
            .checked_div(entry)?
            .checked_mul(Decimal::ONE_HUNDRED)
    }

    /// Payout if the held outcome resolves true: one dollar per contract.
    pub fn payout_if_correct(&self) -> Decimal {
        self.quantity
    }
}

impl LiveEntry for Position {
    const ENTITY: &'static str = "position";

    fn key(&self) -> &str {
        &self.id
    }

    fn group(&self) -> &str {
        &self.market_id
    }

    fn is_live(&self) -> bool {
        self.quantity > Decimal::ZERO
    }

    fn absorb(&mut self, update: Self) {
        self.side = update.side;
        self.quantity = update.quantity;
        self.filled = update.filled;
        self.last = update.last;
    }
}

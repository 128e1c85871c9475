//! Market-related types for binary (Yes/No) prediction markets.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::BookError;

/// One of the two complementary contracts of a binary market.
///
/// The underlying book is Yes-denominated; a No price is `100 - yes_price`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The Yes contract (passes through the raw book unchanged).
    #[strum(to_string = "yes", serialize = "YES", serialize = "Yes")]
    #[default]
    Yes,
    /// The No contract (complemented view of the raw book).
    #[strum(to_string = "no", serialize = "NO", serialize = "No")]
    No,
}

impl Outcome {
    /// Price units a settled contract pays, in cents.
    pub const PAR_CENTS: Decimal = Decimal::ONE_HUNDRED;

    /// Get the opposite outcome.
    pub fn opposite(&self) -> Self {
        match self {
            Outcome::Yes => Outcome::No,
            Outcome::No => Outcome::Yes,
        }
    }

    /// Express a Yes-denominated price in this outcome's terms.
    ///
    /// Fails if either the input or the result falls outside [0, 100].
    pub fn price_from_yes(&self, yes_price: Decimal) -> Result<Decimal, BookError> {
        check_price(yes_price)?;
        let price = match self {
            Outcome::Yes => yes_price,
            Outcome::No => Self::PAR_CENTS - yes_price,
        };
        check_price(price)
    }
}

fn check_price(price: Decimal) -> Result<Decimal, BookError> {
    if price < Decimal::ZERO || price > Outcome::PAR_CENTS {
        Err(BookError::PriceOutOfRange { price })
    } else {
        Ok(price)
    }
}

/// Event a market belongs to, as carried on order deltas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRef {
    /// Event ID.
    pub id: String,
    /// URL slug.
    pub slug: Option<String>,
    /// Image URL.
    pub image: Option<String>,
    /// Display title.
    pub title: Option<String>,
}

/// Market an order references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketRef {
    /// Market ID (grouping key for open orders).
    pub id: String,
    /// Title of the market inside its event group.
    pub group_item_title: Option<String>,
    /// Outcome label as shown by the market.
    pub outcome: Option<String>,
    /// Parent event.
    pub event: Option<EventRef>,
}

/// Market-level data the summary needs besides the book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketInfo {
    /// Market ID.
    pub id: String,
    /// Last traded Yes price in cents, if any trade happened.
    pub last_price: Option<Decimal>,
}

/// The (market, outcome) pair a view is showing.
///
/// Subscriptions and cached depth are scoped to one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey {
    /// Market ID.
    pub market_id: String,
    /// Outcome being viewed.
    pub outcome: Outcome,
}

impl ViewKey {
    /// Create a new view key.
    pub fn new(market_id: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            market_id: market_id.into(),
            outcome,
        }
    }
}

impl std::fmt::Display for ViewKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.market_id, self.outcome)
    }
}

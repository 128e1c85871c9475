//! Order book types and data structures.
//!
//! Prices are cents in [0, 100]; sizes are contract counts.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BookError;
use crate::market::Outcome;

/// Single price level in an order book.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceLevel {
    /// Price at this level, in cents.
    pub price: Decimal,
    /// Total size available at this price.
    pub size: Decimal,
}

impl PriceLevel {
    /// Create a new price level.
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }

    /// Notional of the level in cents (`price * size`), `None` on overflow.
    pub fn notional(&self) -> Option<Decimal> {
        self.price.checked_mul(self.size)
    }
}

/// Numeric field as it appears on the wire: a string or a bare JSON number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireNumber {
    /// `"45"`, `"0.5"`.
    Text(String),
    /// `45`, `0.5`.
    Number(serde_json::Number),
}

impl WireNumber {
    /// Parse as a decimal; the raw text is returned on failure.
    pub fn decimal(&self) -> Result<Decimal, String> {
        let raw = match self {
            WireNumber::Text(s) => s.trim().to_string(),
            WireNumber::Number(n) => n.to_string(),
        };
        Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .map_err(|_| raw)
    }

    fn parse(&self, field: &'static str) -> Result<Decimal, BookError> {
        self.decimal()
            .map_err(|value| BookError::NonNumeric { field, value })
    }
}

impl From<&str> for WireNumber {
    fn from(value: &str) -> Self {
        WireNumber::Text(value.to_string())
    }
}

/// `[price, size]` pair from a book snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireLevel(pub WireNumber, pub WireNumber);

/// Book snapshot as fetched: `{ bids: [[price, size], ...], asks: [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireBook {
    /// Bid levels, any order.
    #[serde(default)]
    pub bids: Vec<WireLevel>,
    /// Ask levels, any order.
    #[serde(default)]
    pub asks: Vec<WireLevel>,
}

/// The underlying Yes-denominated book, one sequence of levels per side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBook {
    /// Bid levels.
    pub bids: Vec<PriceLevel>,
    /// Ask levels.
    pub asks: Vec<PriceLevel>,
}

impl RawBook {
    /// Create a book from `(price, size)` pairs.
    pub fn new(bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> Self {
        Self { bids, asks }
    }

    /// Parse and validate a wire snapshot.
    ///
    /// Every price must be numeric and within [0, 100]; every size numeric
    /// and non-negative. One bad level rejects the whole book.
    pub fn from_wire(wire: &WireBook) -> Result<Self, BookError> {
        let parse_side = |levels: &[WireLevel]| -> Result<Vec<PriceLevel>, BookError> {
            levels
                .iter()
                .map(|WireLevel(price, size)| {
                    let level = PriceLevel::new(price.parse("price")?, size.parse("size")?);
                    validate_level(&level)?;
                    Ok(level)
                })
                .collect()
        };

        Ok(Self {
            bids: parse_side(&wire.bids)?,
            asks: parse_side(&wire.asks)?,
        })
    }

    /// True if neither side has any level.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

pub(crate) fn validate_level(level: &PriceLevel) -> Result<(), BookError> {
    if level.price < Decimal::ZERO || level.price > Outcome::PAR_CENTS {
        return Err(BookError::PriceOutOfRange { price: level.price });
    }
    if level.size < Decimal::ZERO {
        return Err(BookError::NegativeSize {
            price: level.price,
            size: level.size,
        });
    }
    Ok(())
}

/// Which side of the ladder a view renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookSideKind {
    /// Resting buy interest; best price is the highest.
    Bid,
    /// Resting sell interest; best price is the lowest.
    Ask,
}

/// Rendered ladder for one side of one outcome.
///
/// `levels` are sorted by price descending, which is best-first for bids and
/// worst-first (farthest from mid) for asks. `cumulative[i]` is the running
/// sum of `price * size` over `levels[..=i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthView {
    /// Side this view renders.
    pub side: BookSideKind,
    /// Aggregated levels, price descending, no zero sizes, unique prices.
    pub levels: Vec<PriceLevel>,
    /// Running totals aligned with `levels`.
    pub cumulative: Vec<Decimal>,
}

impl DepthView {
    /// An empty view for `side`.
    pub fn empty(side: BookSideKind) -> Self {
        Self {
            side,
            levels: Vec::new(),
            cumulative: Vec::new(),
        }
    }

    /// True if the side has no liquidity.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Largest running total; used only to scale bar widths.
    pub fn highest(&self) -> Decimal {
        self.cumulative.last().copied().unwrap_or(Decimal::ZERO)
    }

    /// Bar width for row `index` as a fraction of [`highest`](Self::highest).
    pub fn relative_depth(&self, index: usize) -> Decimal {
        let highest = self.highest();
        match self.cumulative.get(index) {
            Some(total) if !highest.is_zero() => *total / highest,
            _ => Decimal::ZERO,
        }
    }

    /// Levels from the best price outward.
    pub fn best_first(&self) -> impl Iterator<Item = &PriceLevel> + '_ {
        let n = self.levels.len();
        let reversed = self.side == BookSideKind::Ask;
        (0..n).map(move |i| {
            if reversed {
                &self.levels[n - 1 - i]
            } else {
                &self.levels[i]
            }
        })
    }

    /// Best price on this side.
    pub fn best_price(&self) -> Option<Decimal> {
        self.best_first().next().map(|l| l.price)
    }

    /// Total contracts resting on this side.
    pub fn total_size(&self) -> Decimal {
        self.levels
            .iter()
            .fold(Decimal::ZERO, |total, l| total.saturating_add(l.size))
    }
}

/// Bid and ask ladders of one outcome, derived from a single raw book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeDepth {
    /// Outcome these ladders are denominated in.
    pub outcome: Outcome,
    /// Bid ladder (what a seller hits).
    pub bids: DepthView,
    /// Ask ladder (what a buyer lifts).
    pub asks: DepthView,
}

impl OutcomeDepth {
    /// Both sides empty.
    pub fn empty(outcome: Outcome) -> Self {
        Self {
            outcome,
            bids: DepthView::empty(BookSideKind::Bid),
            asks: DepthView::empty(BookSideKind::Ask),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(price: &str, size: &str) -> WireLevel {
        WireLevel(price.into(), size.into())
    }

    #[test]
    fn wire_book_accepts_strings_and_numbers() {
        let wire: WireBook =
            serde_json::from_str(r#"{"bids":[["45", 10]],"asks":[["55", "2.5"]]}"#).unwrap();
        let book = RawBook::from_wire(&wire).unwrap();

        assert_eq!(book.bids, vec![PriceLevel::new(dec!(45), dec!(10))]);
        assert_eq!(book.asks, vec![PriceLevel::new(dec!(55), dec!(2.5))]);
    }

    #[test]
    fn wire_book_missing_sides_default_empty() {
        let wire: WireBook = serde_json::from_str("{}").unwrap();
        assert!(RawBook::from_wire(&wire).unwrap().is_empty());
    }

    #[test]
    fn non_numeric_price_rejects_book() {
        let wire = WireBook {
            bids: vec![level("45", "1"), level("abc", "1")],
            asks: vec![],
        };
        assert!(matches!(
            RawBook::from_wire(&wire),
            Err(BookError::NonNumeric { field: "price", .. })
        ));
    }

    #[test]
    fn out_of_range_and_negative_levels_reject_book() {
        let wire = WireBook {
            bids: vec![level("101", "1")],
            asks: vec![],
        };
        assert_eq!(
            RawBook::from_wire(&wire),
            Err(BookError::PriceOutOfRange { price: dec!(101) })
        );

        let wire = WireBook {
            bids: vec![],
            asks: vec![level("40", "-3")],
        };
        assert!(matches!(
            RawBook::from_wire(&wire),
            Err(BookError::NegativeSize { .. })
        ));
    }

    #[test]
    fn best_first_reverses_asks_only() {
        let levels = vec![
            PriceLevel::new(dec!(60), dec!(1)),
            PriceLevel::new(dec!(55), dec!(1)),
        ];
        let asks = DepthView {
            side: BookSideKind::Ask,
            levels: levels.clone(),
            cumulative: vec![dec!(60), dec!(115)],
        };
        let bids = DepthView {
            side: BookSideKind::Bid,
            levels,
            cumulative: vec![dec!(60), dec!(115)],
        };

        assert_eq!(asks.best_price(), Some(dec!(55)));
        assert_eq!(bids.best_price(), Some(dec!(60)));
        assert_eq!(asks.relative_depth(1), dec!(1));
        assert_eq!(asks.relative_depth(5), Decimal::ZERO);
    }

    #[test]
    fn empty_view_has_zero_highest() {
        let view = DepthView::empty(BookSideKind::Bid);
        assert!(view.is_empty());
        assert_eq!(view.highest(), Decimal::ZERO);
        assert_eq!(view.relative_depth(0), Decimal::ZERO);
        assert_eq!(view.best_price(), None);
    }
}

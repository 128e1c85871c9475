//! Best bid/ask, spread and last-price display values.

use rust_decimal::Decimal;
use tracing::warn;

use super::types::OutcomeDepth;
use crate::utils::{format_2dp, format_cents, NO_SPREAD};

/// Summary line shown above the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarketSummary {
    /// Highest bid price, in cents.
    pub best_bid: Option<Decimal>,
    /// Lowest ask price, in cents.
    pub best_ask: Option<Decimal>,
    /// `best_ask - best_bid` when both sides have liquidity.
    pub spread: Option<Decimal>,
    /// Midpoint of best bid and best ask.
    pub mid: Option<Decimal>,
    /// Last traded price in the viewed outcome's terms.
    pub last_price: Option<Decimal>,
}

impl MarketSummary {
    /// Spread with 2 decimals, or `"--"` when a side is empty.
    pub fn spread_display(&self) -> String {
        self.spread
            .map(format_2dp)
            .unwrap_or_else(|| NO_SPREAD.to_string())
    }

    /// Last price as cents, or `"-"`.
    pub fn last_price_display(&self) -> String {
        format_cents(self.last_price)
    }
}

/// Derive the summary from a depth pair and the market's last Yes trade price.
pub fn summarize(depth: &OutcomeDepth, last_yes_price: Option<Decimal>) -> MarketSummary {
    let best_bid = depth.bids.levels.iter().map(|l| l.price).max();
    let best_ask = depth.asks.levels.iter().map(|l| l.price).min();

    let (spread, mid) = match (best_bid, best_ask) {
        (Some(bid), Some(ask)) => (Some(ask - bid), Some((bid + ask) / Decimal::TWO)),
        _ => (None, None),
    };

    let last_price = last_yes_price.and_then(|price| match depth.outcome.price_from_yes(price) {
        Ok(p) => Some(p),
        Err(e) => {
            warn!(error = %e, "Ignoring out-of-range last price");
            None
        }
    });

    MarketSummary {
        best_bid,
        best_ask,
        spread,
        mid,
        last_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Outcome;
    use crate::orderbook::depth::build_depth;
    use crate::orderbook::types::{PriceLevel, RawBook};
    use rust_decimal_macros::dec;

    fn book() -> RawBook {
        RawBook::new(
            vec![PriceLevel::new(dec!(40), dec!(10)), PriceLevel::new(dec!(42), dec!(5))],
            vec![PriceLevel::new(dec!(45), dec!(3)), PriceLevel::new(dec!(50), dec!(8))],
        )
    }

    #[test]
    fn spread_is_lowest_ask_minus_highest_bid() {
        let depth = build_depth(&book(), Outcome::Yes).unwrap();
        let summary = summarize(&depth, Some(dec!(44)));

        assert_eq!(summary.best_bid, Some(dec!(42)));
        assert_eq!(summary.best_ask, Some(dec!(45)));
        assert_eq!(summary.spread, Some(dec!(3)));
        assert_eq!(summary.spread_display(), "3.00");
        assert_eq!(summary.mid, Some(dec!(43.5)));
        assert_eq!(summary.last_price, Some(dec!(44)));
    }

    #[test]
    fn no_outcome_complements_last_price() {
        let depth = build_depth(&book(), Outcome::No).unwrap();
        let summary = summarize(&depth, Some(dec!(44)));

        // No bids 55, 50; No asks 58, 60.
        assert_eq!(summary.best_bid, Some(dec!(55)));
        assert_eq!(summary.best_ask, Some(dec!(58)));
        assert_eq!(summary.spread_display(), "3.00");
        assert_eq!(summary.last_price, Some(dec!(56)));
        assert_eq!(summary.last_price_display(), "56.00¢");
    }

    #[test]
    fn empty_side_shows_placeholder() {
        let one_sided = RawBook::new(vec![PriceLevel::new(dec!(40), dec!(1))], vec![]);
        let depth = build_depth(&one_sided, Outcome::Yes).unwrap();
        let summary = summarize(&depth, None);

        assert_eq!(summary.best_bid, Some(dec!(40)));
        assert_eq!(summary.best_ask, None);
        assert_eq!(summary.spread, None);
        assert_eq!(summary.spread_display(), "--");
        assert_eq!(summary.last_price_display(), "-");
    }

    #[test]
    fn fractional_spread_rounds_to_two_decimals() {
        let book = RawBook::new(
            vec![PriceLevel::new(dec!(40.125), dec!(1))],
            vec![PriceLevel::new(dec!(41), dec!(1))],
        );
        let depth = build_depth(&book, Outcome::Yes).unwrap();
        assert_eq!(summarize(&depth, None).spread_display(), "0.88");
    }
}

//! Last-valid depth retention for one outcome view.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::depth::build_depth;
use super::summary::{summarize, MarketSummary};
use super::types::{OutcomeDepth, RawBook, WireBook};
use crate::error::BookError;
use crate::market::Outcome;
use crate::metrics;

/// Holds the most recent valid ladders for one outcome.
///
/// A malformed snapshot is discarded and the previous ladders stay in place,
/// so the view never flashes to "no liquidity" on bad data.
#[derive(Debug, Clone)]
pub struct DepthTracker {
    outcome: Outcome,
    current: Option<OutcomeDepth>,
    last_yes_price: Option<Decimal>,
}

impl DepthTracker {
    /// Create an empty tracker.
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            current: None,
            last_yes_price: None,
        }
    }

    /// Outcome this tracker renders.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Latest valid ladders, if any snapshot has been accepted.
    pub fn depth(&self) -> Option<&OutcomeDepth> {
        self.current.as_ref()
    }

    /// Replace the ladders from a wire snapshot.
    ///
    /// On error the previous ladders are retained and the error is returned
    /// for the caller to log or ignore.
    pub fn apply_wire(&mut self, wire: &WireBook) -> Result<&OutcomeDepth, BookError> {
        let result = RawBook::from_wire(wire).and_then(|raw| build_depth(&raw, self.outcome));
        self.accept(result)
    }

    /// Replace the ladders from an already parsed book.
    pub fn apply_raw(&mut self, raw: &RawBook) -> Result<&OutcomeDepth, BookError> {
        let result = build_depth(raw, self.outcome);
        self.accept(result)
    }

    /// Record the market's last traded Yes price.
    pub fn set_last_price(&mut self, last_yes_price: Option<Decimal>) {
        self.last_yes_price = last_yes_price;
    }

    /// Summary of the current ladders (empty ladders before the first snapshot).
    pub fn summary(&self) -> MarketSummary {
        match &self.current {
            Some(depth) => summarize(depth, self.last_yes_price),
            None => summarize(&OutcomeDepth::empty(self.outcome), self.last_yes_price),
        }
    }

    fn accept(
        &mut self,
        result: Result<OutcomeDepth, BookError>,
    ) -> Result<&OutcomeDepth, BookError> {
        match result {
            Ok(depth) => {
                debug!(
                    outcome = %self.outcome,
                    bids = depth.bids.len(),
                    asks = depth.asks.len(),
                    "Depth updated"
                );
                Ok(self.current.insert(depth))
            }
            Err(e) => {
                warn!(
                    outcome = %self.outcome,
                    error = %e,
                    retained = self.current.is_some(),
                    "Discarding malformed book snapshot"
                );
                metrics::inc_book_discarded();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::types::WireLevel;
    use rust_decimal_macros::dec;

    fn wire(bids: &[(&str, &str)], asks: &[(&str, &str)]) -> WireBook {
        let side = |levels: &[(&str, &str)]| {
            levels
                .iter()
                .map(|(p, s)| WireLevel((*p).into(), (*s).into()))
                .collect()
        };
        WireBook {
            bids: side(bids),
            asks: side(asks),
        }
    }

    #[test]
    fn malformed_snapshot_keeps_previous_depth() {
        let mut tracker = DepthTracker::new(Outcome::Yes);
        tracker
            .apply_wire(&wire(&[("40", "10")], &[("45", "3")]))
            .unwrap();
        let before = tracker.depth().cloned();

        let err = tracker.apply_wire(&wire(&[("x", "10")], &[])).unwrap_err();
        assert!(matches!(err, BookError::NonNumeric { .. }));
        assert_eq!(tracker.depth().cloned(), before);
    }

    #[test]
    fn oversized_snapshot_keeps_previous_depth() {
        let mut tracker = DepthTracker::new(Outcome::Yes);
        tracker
            .apply_wire(&wire(&[("40", "10")], &[("45", "3")]))
            .unwrap();
        let before = tracker.depth().cloned();

        let err = tracker
            .apply_wire(&wire(&[("50", "79228162514264337593543950335")], &[]))
            .unwrap_err();
        assert_eq!(
            err,
            BookError::Overflow {
                price: dec!(50),
                size: Decimal::MAX,
            }
        );
        assert_eq!(tracker.depth().cloned(), before);

        let max = Decimal::MAX.to_string();
        let err = tracker
            .apply_wire(&wire(&[("1", max.as_str()), ("1", max.as_str())], &[]))
            .unwrap_err();
        assert!(matches!(err, BookError::Overflow { .. }));
        assert_eq!(tracker.depth().cloned(), before);
    }

    #[test]
    fn malformed_first_snapshot_leaves_nothing() {
        let mut tracker = DepthTracker::new(Outcome::No);
        assert!(tracker.apply_wire(&wire(&[("150", "1")], &[])).is_err());
        assert!(tracker.depth().is_none());
        assert_eq!(tracker.summary().spread_display(), "--");
    }

    #[test]
    fn summary_uses_outcome_terms() {
        let mut tracker = DepthTracker::new(Outcome::No);
        tracker
            .apply_wire(&wire(&[("40", "10")], &[("45", "3")]))
            .unwrap();
        tracker.set_last_price(Some(dec!(43)));

        let summary = tracker.summary();
        assert_eq!(summary.best_bid, Some(dec!(55)));
        assert_eq!(summary.best_ask, Some(dec!(60)));
        assert_eq!(summary.last_price, Some(dec!(57)));
    }
}

//! Depth transformer: raw Yes book to per-outcome ladders.
//!
//! For the No outcome the raw asks become bids and the raw bids become asks,
//! each price replaced by `100 - price`. The complement is applied before
//! aggregation and sorting.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::instrument;

use super::types::{validate_level, BookSideKind, DepthView, OutcomeDepth, PriceLevel, RawBook};
use crate::error::BookError;
use crate::market::Outcome;
use crate::metrics;

/// Express `book` in `outcome` terms, aggregated and sorted.
///
/// Bids come out price descending, asks price ascending (both best-first).
/// Duplicate prices are summed and zero-size levels dropped. Applying the
/// No transform twice yields the canonical Yes book.
pub fn transform_book(book: &RawBook, outcome: Outcome) -> Result<RawBook, BookError> {
    let (bid_src, ask_src) = match outcome {
        Outcome::Yes => (&book.bids, &book.asks),
        Outcome::No => (&book.asks, &book.bids),
    };

    let mut bids = aggregate(complement(bid_src, outcome)?)?;
    bids.reverse();
    let asks = aggregate(complement(ask_src, outcome)?)?;

    Ok(RawBook { bids, asks })
}

/// Build both ladders of `outcome` from the raw book.
#[instrument(skip_all, fields(outcome = %outcome, bids = book.bids.len(), asks = book.asks.len()))]
pub fn build_depth(book: &RawBook, outcome: Outcome) -> Result<OutcomeDepth, BookError> {
    let _timer = metrics::timer_depth_transform();
    let transformed = transform_book(book, outcome)?;

    Ok(OutcomeDepth {
        outcome,
        bids: depth_view(BookSideKind::Bid, transformed.bids)?,
        asks: depth_view(BookSideKind::Ask, transformed.asks)?,
    })
}

/// Sort `levels` price descending and attach running `price * size` totals.
///
/// Fails with [`BookError::Overflow`] if a running total leaves the decimal range.
pub fn depth_view(
    side: BookSideKind,
    mut levels: Vec<PriceLevel>,
) -> Result<DepthView, BookError> {
    levels.retain(|l| !l.size.is_zero());
    levels.sort_by(|a, b| b.price.cmp(&a.price));

    let mut total = Decimal::ZERO;
    let cumulative = levels
        .iter()
        .map(|level| {
            total = level
                .notional()
                .and_then(|notional| total.checked_add(notional))
                .ok_or(BookError::Overflow {
                    price: level.price,
                    size: level.size,
                })?;
            Ok(total)
        })
        .collect::<Result<Vec<_>, BookError>>()?;

    Ok(DepthView {
        side,
        levels,
        cumulative,
    })
}

fn complement(levels: &[PriceLevel], outcome: Outcome) -> Result<Vec<PriceLevel>, BookError> {
    levels
        .iter()
        .map(|level| {
            validate_level(level)?;
            Ok(PriceLevel::new(outcome.price_from_yes(level.price)?, level.size))
        })
        .collect()
}

/// Sum sizes per price; returns levels price ascending without zero sizes.
fn aggregate(levels: Vec<PriceLevel>) -> Result<Vec<PriceLevel>, BookError> {
    let mut by_price: BTreeMap<Decimal, Decimal> = BTreeMap::new();
    for level in levels {
        let price = level.price.normalize();
        let total = by_price.entry(price).or_insert(Decimal::ZERO);
        *total = total
            .checked_add(level.size)
            .ok_or(BookError::Overflow {
                price,
                size: level.size,
            })?;
    }

    Ok(by_price
        .into_iter()
        .filter(|(_, size)| *size > Decimal::ZERO)
        .map(|(price, size)| PriceLevel { price, size })
        .collect())
}

//! Market order fill simulation.
//!
//! Walks a ladder best price first as a pure fold over the levels. Partial
//! fills are normal results; nothing here returns an error.

use std::ops::ControlFlow;

use rust_decimal::Decimal;

use super::order::Action;
use crate::market::Outcome;
use crate::orderbook::{DepthView, OutcomeDepth};
use crate::utils::{format_cents, format_usd};

/// Outcome of a simulated market order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillEstimate {
    /// Buy (spend-driven) or sell (quantity-driven).
    pub action: Action,
    /// Contracts that would fill.
    pub contracts: Decimal,
    /// Volume-weighted average price in cents; `None` when nothing fills.
    pub avg_price: Option<Decimal>,
    /// Dollars: cost of the filled contracts (buy) or gross revenue (sell).
    pub total_cost: Decimal,
    /// Dollars: payout if correct (buy) or net proceeds after fee (sell).
    pub payout: Decimal,
    /// Unused request: fee-adjusted dollars (buy) or unfilled contracts (sell).
    pub remaining: Decimal,
}

impl FillEstimate {
    fn none(action: Action, remaining: Decimal) -> Self {
        Self {
            action,
            contracts: Decimal::ZERO,
            avg_price: None,
            total_cost: Decimal::ZERO,
            payout: Decimal::ZERO,
            remaining,
        }
    }

    /// True if no contract would fill.
    pub fn is_empty(&self) -> bool {
        self.contracts.is_zero()
    }

    /// Average price as cents, or `"-"`.
    pub fn avg_price_display(&self) -> String {
        format_cents(self.avg_price)
    }

    /// Payout as dollars ("$2.16").
    pub fn payout_display(&self) -> String {
        format_usd(self.payout)
    }
}

#[derive(Debug, Clone, Copy)]
struct Walk {
    remaining: Decimal,
    contracts: Decimal,
    notional: Decimal,
}

impl Walk {
    fn start(remaining: Decimal) -> Self {
        Self {
            remaining,
            contracts: Decimal::ZERO,
            notional: Decimal::ZERO,
        }
    }
}

fn settle(flow: ControlFlow<Walk, Walk>) -> Walk {
    match flow {
        ControlFlow::Continue(walk) | ControlFlow::Break(walk) => walk,
    }
}

fn fee_factor(fee_percent: Decimal) -> Decimal {
    Decimal::ONE - fee_percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED) / Decimal::ONE_HUNDRED
}

/// Simulate spending `spend` dollars against the ask ladder.
///
/// The spend is reduced by `taker_fee` percent and converted to cents; each
/// level then fills `min(floor(remaining / price), size)` contracts until the
/// remainder cannot buy one contract at the next price. A spend too large to
/// express in cents covers the whole ladder.
pub fn simulate_buy(asks: &DepthView, spend: Decimal, taker_fee: Decimal) -> FillEstimate {
    let net = spend.max(Decimal::ZERO) * fee_factor(taker_fee);
    if net.is_zero() || asks.is_empty() {
        return FillEstimate::none(Action::Buy, net);
    }
    let budget = net
        .checked_mul(Outcome::PAR_CENTS)
        .unwrap_or_else(|| asks.highest());

    let walk = settle(asks.best_first().try_fold(Walk::start(budget), |acc, level| {
        if level.price.is_zero() {
            return match acc.contracts.checked_add(level.size) {
                Some(contracts) => ControlFlow::Continue(Walk { contracts, ..acc }),
                None => ControlFlow::Break(acc),
            };
        }
        if acc.remaining < level.price {
            return ControlFlow::Break(acc);
        }
        let take = acc
            .remaining
            .checked_div(level.price)
            .map_or(level.size, |n| n.floor().min(level.size));
        let step = take.checked_mul(level.price).and_then(|cost| {
            Some(Walk {
                remaining: acc.remaining - cost,
                contracts: acc.contracts.checked_add(take)?,
                notional: acc.notional.checked_add(cost)?,
            })
        });
        match step {
            Some(next) => ControlFlow::Continue(next),
            None => ControlFlow::Break(acc),
        }
    }));

    if walk.contracts.is_zero() {
        return FillEstimate::none(Action::Buy, net);
    }

    let total_cost = walk.notional / Outcome::PAR_CENTS;
    FillEstimate {
        action: Action::Buy,
        contracts: walk.contracts,
        avg_price: Some(walk.notional / walk.contracts),
        total_cost,
        payout: walk.contracts,
        remaining: net - total_cost,
    }
}

/// Simulate selling `quantity` contracts into the bid ladder.
///
/// Net proceeds are `revenue / 100 * (1 - taker_fee / 100)`.
pub fn simulate_sell(bids: &DepthView, quantity: Decimal, taker_fee: Decimal) -> FillEstimate {
    let quantity = quantity.max(Decimal::ZERO);
    if quantity.is_zero() || bids.is_empty() {
        return FillEstimate::none(Action::Sell, quantity);
    }

    let walk = settle(bids.best_first().try_fold(Walk::start(quantity), |acc, level| {
        if acc.remaining <= Decimal::ZERO {
            return ControlFlow::Break(acc);
        }
        let take = acc.remaining.min(level.size);
        let notional = take
            .checked_mul(level.price)
            .and_then(|revenue| acc.notional.checked_add(revenue));
        match notional {
            Some(notional) => ControlFlow::Continue(Walk {
                remaining: acc.remaining - take,
                contracts: acc.contracts + take,
                notional,
            }),
            None => ControlFlow::Break(acc),
        }
    }));

    if walk.contracts.is_zero() {
        return FillEstimate::none(Action::Sell, walk.remaining);
    }

    let gross = walk.notional / Outcome::PAR_CENTS;
    FillEstimate {
        action: Action::Sell,
        contracts: walk.contracts,
        avg_price: Some(walk.notional / walk.contracts),
        total_cost: gross,
        payout: gross * fee_factor(taker_fee),
        remaining: walk.remaining,
    }
}

/// Dispatch on `action`: `amount` is dollars for a buy, contracts for a sell.
pub fn simulate(
    depth: &OutcomeDepth,
    action: Action,
    amount: Decimal,
    taker_fee: Decimal,
) -> FillEstimate {
    match action {
        Action::Buy => simulate_buy(&depth.asks, amount, taker_fee),
        Action::Sell => simulate_sell(&depth.bids, amount, taker_fee),
    }
}

/// Cost or proceeds of a resting limit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitEstimate {
    /// Buy or sell.
    pub action: Action,
    /// Dollars paid including maker fee (buy) or received net of it (sell).
    pub total: Decimal,
    /// Dollars paid at settlement if the outcome resolves true.
    pub payout_if_correct: Decimal,
}

/// Estimate a limit order at `price` cents for `quantity` contracts.
///
/// Returns `None` when the dollar total does not fit in a `Decimal`.
pub fn estimate_limit(
    action: Action,
    price: Decimal,
    quantity: Decimal,
    maker_fee: Decimal,
) -> Option<LimitEstimate> {
    let quantity = quantity.max(Decimal::ZERO);
    let notional = price.checked_mul(quantity)? / Outcome::PAR_CENTS;
    let fee = maker_fee.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED) / Decimal::ONE_HUNDRED;
    let total = match action {
        Action::Buy => notional.checked_mul(Decimal::ONE + fee)?,
        Action::Sell => notional * (Decimal::ONE - fee),
    };

    Some(LimitEstimate {
        action,
        total,
        payout_if_correct: quantity,
    })
}

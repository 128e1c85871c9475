//! Display formatting and process helpers.

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::info;

/// Placeholder for an undefined average price.
pub const NO_PRICE: &str = "-";

/// Placeholder for an undefined spread.
pub const NO_SPREAD: &str = "--";

/// Round to 2 decimals, midpoint away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format a number with exactly 2 decimals ("3" -> "3.00").
pub fn format_2dp(value: Decimal) -> String {
    format!("{:.2}", round2(value))
}

/// Format a dollar amount ("2.156" -> "$2.16").
pub fn format_usd(value: Decimal) -> String {
    if value.is_sign_negative() && !round2(value).is_zero() {
        format!("-${}", format_2dp(value.abs()))
    } else {
        format!("${}", format_2dp(value.abs()))
    }
}

/// Format an optional cent price, or [`NO_PRICE`].
pub fn format_cents(value: Option<Decimal>) -> String {
    match value {
        Some(price) => format!("{}¢", format_2dp(price)),
        None => NO_PRICE.to_string(),
    }
}

/// Wait for Ctrl+C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}

//! Unified error types for the ladder core.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the ladder core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Book snapshot could not be transformed.
    #[error("book error: {0}")]
    Book(#[from] BookError),

    /// Push or snapshot payload could not be decoded.
    #[error("delta error: {0}")]
    Delta(#[from] DeltaError),

    /// Snapshot fetch or push channel failure.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Malformed book data. The affected snapshot is discarded for the render cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    /// A price fell outside [0, 100] cents before or after the complement.
    #[error("price {price} outside [0, 100]")]
    PriceOutOfRange {
        /// The offending price in cents.
        price: Decimal,
    },

    /// A level field did not parse as a number.
    #[error("non-numeric {field} in book level: {value:?}")]
    NonNumeric {
        /// Which field failed ("price" or "size").
        field: &'static str,
        /// Raw value as received.
        value: String,
    },

    /// A level carried a negative size.
    #[error("negative size {size} at price {price}")]
    NegativeSize {
        /// Level price in cents.
        price: Decimal,
        /// Offending size.
        size: Decimal,
    },

    /// Summing or pricing a level exceeded the decimal range.
    #[error("level {size} at price {price} overflows depth totals")]
    Overflow {
        /// Level price in cents.
        price: Decimal,
        /// Size being added when the total overflowed.
        size: Decimal,
    },
}

/// Push-event decoding errors. Offending events are dropped, never propagated.
#[derive(Error, Debug)]
pub enum DeltaError {
    /// A required key (`_id`, `marketId`, ...) is absent.
    #[error("delta missing required key `{0}`")]
    MissingKey(&'static str),

    /// A key is present but its value cannot be converted.
    #[error("delta field `{field}` has invalid value {value:?}")]
    InvalidField {
        /// Field name on the wire.
        field: &'static str,
        /// Raw value as received.
        value: String,
    },

    /// Envelope `type` is not one this core understands.
    #[error("unknown push event type {0:?}")]
    UnknownEvent(String),

    /// Payload is not valid JSON or not the expected shape.
    #[error("malformed delta json: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeltaError {
    /// Short label used for the dropped-delta metric.
    pub fn reason(&self) -> &'static str {
        match self {
            DeltaError::MissingKey(_) => "missing_key",
            DeltaError::InvalidField { .. } => "invalid_field",
            DeltaError::UnknownEvent(_) => "unknown_event",
            DeltaError::Json(_) => "json",
        }
    }
}

/// Snapshot fetch and push channel errors.
#[derive(Error, Debug)]
pub enum FeedError {
    /// HTTP request failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        /// Endpoint path that failed.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },

    /// Response body could not be parsed.
    #[error("failed to parse {endpoint} response: {reason}")]
    Parse {
        /// Endpoint path.
        endpoint: String,
        /// Reason for failure.
        reason: String,
    },

    /// A configured URL is invalid.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// WebSocket connection failed.
    #[error("websocket connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to send on the WebSocket.
    #[error("failed to send websocket message: {0}")]
    SendFailed(String),

    /// Tungstenite error.
    #[error("tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn book_error_messages_name_the_value() {
        let err = BookError::PriceOutOfRange { price: dec!(101) };
        assert_eq!(err.to_string(), "price 101 outside [0, 100]");

        let err = BookError::NonNumeric {
            field: "price",
            value: "abc".to_string(),
        };
        assert!(err.to_string().contains("\"abc\""));
    }

    #[test]
    fn delta_error_reasons_are_stable() {
        assert_eq!(DeltaError::MissingKey("_id").reason(), "missing_key");
        assert_eq!(
            DeltaError::UnknownEvent("trade".to_string()).reason(),
            "unknown_event"
        );
    }

    #[test]
    fn core_error_wraps_book_error() {
        let err: CoreError = BookError::PriceOutOfRange { price: dec!(-1) }.into();
        assert!(matches!(err, CoreError::Book(_)));
    }

    #[test]
    fn overflow_message_names_the_level() {
        let err = BookError::Overflow {
            price: dec!(50),
            size: Decimal::MAX,
        };
        assert_eq!(
            err.to_string(),
            format!("level {} at price 50 overflows depth totals", Decimal::MAX)
        );
    }

    #[test]
    fn websocket_errors_convert_into_feed_error() {
        use tokio_tungstenite::tungstenite::Error as WsError;

        let err: FeedError = WsError::ConnectionClosed.into();
        assert!(matches!(err, FeedError::Tungstenite(WsError::ConnectionClosed)));

        let err: CoreError = err.into();
        assert!(err.to_string().starts_with("feed error: tungstenite error"));
    }
}

//! Push channel for live order, position and book-refresh events.

pub mod websocket;

pub use websocket::{feed_url, process_message, subscribe, Subscription};

//! WebSocket push channel for order, position and book-refresh events.
//!
//! Features:
//! - One reader task per subscription, feeding a bounded channel
//! - Every event is tagged with the subscription it arrived on
//! - Dropping the [`Subscription`] aborts the reader task
//!
//! Reconnection is left to the caller: a closed stream ends the channel and
//! the owner resubscribes (and reseeds) under a new ID.

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::FeedError;
use crate::market::ViewKey;
use crate::metrics;
use crate::reconcile::{decode_event, Envelope, SubscriptionId};

/// Subscribe request sent right after connecting.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeMessage<'a> {
    #[serde(rename = "type")]
    msg_type: &'static str,
    market_id: &'a str,
    outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
}

/// Live push subscription for one view.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::Receiver<Envelope>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// ID every event on this subscription carries.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next event; `None` once the connection has closed.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Parse the push endpoint; only `ws` and `wss` schemes are accepted.
pub fn feed_url(ws_url: &str) -> Result<Url, FeedError> {
    let url = Url::parse(ws_url)?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(FeedError::ConnectionFailed(format!(
            "unsupported push scheme {other:?}"
        ))),
    }
}

/// Connect, subscribe to `key` and start the reader task.
pub async fn subscribe(
    config: &Config,
    key: &ViewKey,
    id: SubscriptionId,
) -> Result<Subscription, FeedError> {
    let url = feed_url(&config.ws_url)?;
    info!(url = %url, view = %key, subscription = %id, "Connecting to push channel");

    let (ws_stream, _) = connect_async(url.as_str()).await?;
    let (mut write, mut read) = ws_stream.split();

    let subscribe_msg = SubscribeMessage {
        msg_type: "subscribe",
        market_id: &key.market_id,
        outcome: key.outcome.to_string(),
        token: config.auth_token.as_deref(),
    };
    let msg_json =
        serde_json::to_string(&subscribe_msg).map_err(|e| FeedError::SendFailed(e.to_string()))?;
    write.send(Message::Text(msg_json)).await?;

    info!(view = %key, "Subscribed to push channel");

    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let task = tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            let envelope = match msg {
                Ok(msg) => process_message(id, msg),
                Err(e) => {
                    error!(error = %e, subscription = %id, "Push channel error");
                    break;
                }
            };
            let Some(envelope) = envelope else {
                continue;
            };
            if tx.send(envelope).await.is_err() {
                debug!(subscription = %id, "Receiver dropped, stopping reader");
                return;
            }
        }
        warn!(subscription = %id, "Push channel closed");
    });

    Ok(Subscription { id, rx, task })
}

/// Turn one WebSocket frame into a tagged event.
///
/// Control frames and undecodable payloads yield `None`; the latter are
/// logged and counted.
pub fn process_message(id: SubscriptionId, msg: Message) -> Option<Envelope> {
    match msg {
        Message::Text(text) => match decode_event(&text) {
            Ok(event) => Some(Envelope {
                subscription: id,
                event,
            }),
            Err(e) => {
                warn!(error = %e, subscription = %id, "Dropping malformed push event");
                metrics::inc_delta_dropped(e.reason());
                None
            }
        },
        Message::Ping(_) | Message::Pong(_) => {
            debug!("Received ping/pong");
            None
        }
        Message::Close(frame) => {
            warn!(frame = ?frame, "Push channel closing");
            None
        }
        _ => None,
    }
}

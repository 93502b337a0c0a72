use geowatch_core::token::ChannelToken;
use serde_json::{Map, Value as JsonValue};

use crate::models::SignalEnvelope;
use crate::store::Store;

/// Queue `message` on `mailbox`. Returns the queue length after trimming.
pub async fn send(
    store: &Store,
    token: &ChannelToken,
    mailbox: &str,
    message: Map<String, JsonValue>,
) -> usize {
    let cap = store.policy().max_signals;
    let queued = store
        .update(token, |channel, ts| {
            let queue = channel.signals.entry(mailbox.to_string()).or_default();
            queue.push(SignalEnvelope {
                ts: ts.to_string(),
                message,
            });
            queue.len()
        })
        .await;
    queued.min(cap)
}

/// Drain `mailbox`. Every queued message is handed to exactly this caller;
/// a second poll without an intervening send returns nothing. Polling an
/// empty mailbox does not touch storage.
pub async fn poll(store: &Store, token: &ChannelToken, mailbox: &str) -> Vec<SignalEnvelope> {
    let pending = store
        .read(token, |channel| {
            channel.signals.get(mailbox).is_some_and(|q| !q.is_empty())
        })
        .await;
    if !pending {
        return Vec::new();
    }

    store
        .update(token, |channel, _| {
            channel.signals.remove(mailbox).unwrap_or_default()
        })
        .await
}

use std::sync::Arc;

use chrono::Utc;
use geowatch_core::retention::RetentionPolicy;
use geowatch_core::time::iso;
use geowatch_core::token::ChannelToken;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::backend::StorageBackend;
use crate::models::{Channel, ChannelInfo, ChannelSummary, Document};

/// Shared channel store.
///
/// All access is serialized through one lock. A mutation runs, the retention
/// policy trims the touched channel, and the whole document is written out
/// before the lock is released, so saves land in the same order as the
/// mutations that caused them. A failed save is logged and otherwise
/// ignored: memory stays authoritative for the life of the process.
pub struct Store {
    doc: Mutex<Document>,
    backend: Arc<dyn StorageBackend>,
    policy: RetentionPolicy,
}

impl Store {
    /// Load the persisted document, starting empty when nothing is stored or
    /// the stored copy cannot be read.
    pub async fn open(backend: Arc<dyn StorageBackend>, policy: RetentionPolicy) -> Self {
        let mut doc = match backend.load().await {
            Ok(Some(doc)) => doc,
            Ok(None) => Document::default(),
            Err(err) => {
                warn!(error = %err, "store: unreadable document, starting empty");
                Document::default()
            }
        };

        let now = Utc::now();
        for (token, channel) in doc.channels.iter_mut() {
            let report = policy.apply(channel, now);
            if !report.is_empty() {
                debug!(%token, ?report, "store: trimmed channel on load");
            }
        }

        info!(channels = doc.channels.len(), "store: opened");

        Self {
            doc: Mutex::new(doc),
            backend,
            policy,
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Idempotent. Persists only when the channel is new.
    pub async fn get_or_create(&self, token: &ChannelToken) -> ChannelInfo {
        let mut doc = self.doc.lock().await;
        if let Some(channel) = doc.channels.get(token.as_str()) {
            return ChannelInfo {
                token: token.to_string(),
                created_at: channel.created_at.clone(),
                created: false,
            };
        }

        let created_at = iso(Utc::now());
        doc.channels
            .insert(token.to_string(), Channel::new(created_at.clone()));
        info!(%token, "store: channel created");
        self.persist(&doc).await;

        ChannelInfo {
            token: token.to_string(),
            created_at,
            created: true,
        }
    }

    /// Read a channel. An unknown token is served an empty channel that is
    /// never inserted, so reads cannot grow the document.
    pub async fn read<R, F>(&self, token: &ChannelToken, f: F) -> R
    where
        F: FnOnce(&Channel) -> R,
    {
        let doc = self.doc.lock().await;
        match doc.channels.get(token.as_str()) {
            Some(channel) => f(channel),
            None => f(&Channel::new(iso(Utc::now()))),
        }
    }

    /// Mutate a channel, then trim and persist.
    ///
    /// `f` receives the timestamp for this mutation. It is issued under the
    /// store lock, so timestamps never go backwards within a channel.
    pub async fn update<R, F>(&self, token: &ChannelToken, f: F) -> R
    where
        F: FnOnce(&mut Channel, &str) -> R,
    {
        let mut doc = self.doc.lock().await;
        let now = Utc::now();
        let ts = iso(now);

        let channel = doc
            .channels
            .entry(token.to_string())
            .or_insert_with(|| Channel::new(ts.clone()));
        let result = f(channel, &ts);

        let report = self.policy.apply(channel, now);
        if !report.is_empty() {
            debug!(%token, ?report, "store: retention trimmed channel");
        }

        self.persist(&doc).await;
        result
    }

    pub async fn summaries(&self) -> Vec<ChannelSummary> {
        let doc = self.doc.lock().await;
        doc.channels
            .iter()
            .map(|(token, channel)| ChannelSummary::of(token, channel))
            .collect()
    }

    async fn persist(&self, doc: &Document) {
        if let Err(err) = self.backend.save(doc).await {
            warn!(error = %err, "store: persist failed, keeping in-memory state");
        }
    }
}

use geowatch_core::token::{session_id, ChannelToken};

use crate::models::{DeviceInfo, Session, SessionStatus};
use crate::store::Store;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Presence {
    pub ip: String,
    pub ua: String,
    pub device: DeviceInfo,
}

/// Create or overwrite a session. Returns the session id, generated when the
/// client did not supply one.
pub async fn start(
    store: &Store,
    token: &ChannelToken,
    requested_id: Option<String>,
    presence: Presence,
) -> String {
    let id = requested_id.unwrap_or_else(session_id);
    store
        .update(token, |channel, ts| {
            channel.sessions.insert(
                id.clone(),
                Session {
                    session_id: id.clone(),
                    started_at: ts.to_string(),
                    last_seen: ts.to_string(),
                    stopped_at: None,
                    status: SessionStatus::Online,
                    ip: presence.ip,
                    ua: presence.ua,
                    device: presence.device,
                },
            );
        })
        .await;
    id
}

/// Refresh `last_seen` and merge newly reported device fields. A session
/// evicted by retention (or never started) is recreated.
pub async fn heartbeat(store: &Store, token: &ChannelToken, id: &str, presence: Presence) {
    store
        .update(token, |channel, ts| {
            let session = channel
                .sessions
                .entry(id.to_string())
                .or_insert_with(|| Session {
                    session_id: id.to_string(),
                    started_at: ts.to_string(),
                    last_seen: ts.to_string(),
                    stopped_at: None,
                    status: SessionStatus::Online,
                    ip: String::new(),
                    ua: String::new(),
                    device: DeviceInfo::default(),
                });
            session.last_seen = ts.to_string();
            session.status = SessionStatus::Online;
            session.stopped_at = None;
            session.ip = presence.ip;
            if !presence.ua.is_empty() {
                session.ua = presence.ua;
            }
            session.device.merge(presence.device);
        })
        .await;
}

/// Mark a known session offline. Unknown ids are ignored; returns whether a
/// session was found.
pub async fn stop(store: &Store, token: &ChannelToken, id: &str) -> bool {
    store
        .update(token, |channel, ts| match channel.sessions.get_mut(id) {
            Some(session) => {
                session.status = SessionStatus::Offline;
                session.stopped_at = Some(ts.to_string());
                true
            }
            None => false,
        })
        .await
}

/// Most recently seen first.
pub async fn list(store: &Store, token: &ChannelToken) -> Vec<Session> {
    let mut sessions: Vec<Session> = store
        .read(token, |channel| channel.sessions.values().cloned().collect())
        .await;
    sessions.sort_by(|a, b| {
        b.last_seen
            .cmp(&a.last_seen)
            .then_with(|| b.started_at.cmp(&a.started_at))
    });
    sessions
}

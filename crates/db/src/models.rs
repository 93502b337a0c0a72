use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use geowatch_core::types::{
    Channel, CoordSource, Coords, DeviceInfo, Hit, HitKind, Session, SessionStatus,
    SignalEnvelope,
};

/// The persisted root: `{"channels": {token: channel}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub channels: BTreeMap<String, Channel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelInfo {
    pub token: String,
    pub created_at: String,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSummary {
    pub token: String,
    pub created_at: String,
    pub hit_count: usize,
    pub session_count: usize,
    pub last_hit_at: Option<String>,
}

impl ChannelSummary {
    pub fn of(token: &str, channel: &Channel) -> Self {
        Self {
            token: token.to_string(),
            created_at: channel.created_at.clone(),
            hit_count: channel.hits().len(),
            session_count: channel.sessions.len(),
            last_hit_at: channel.last_hit().map(|hit| hit.ts.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelExport {
    pub token: String,
    pub created_at: String,
    pub exported_at: String,
    pub hits: Vec<Hit>,
}

/// Everything a location hit carries besides the id and timestamp the store
/// assigns.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationInput {
    pub ip: String,
    pub ua: String,
    pub coords: Coords,
    pub ip_label: Option<String>,
    pub place: Option<String>,
}

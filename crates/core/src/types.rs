use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CoordSource {
    Gps,
    Camera,
    None,
    /// Named IP geolocation provider, e.g. `ipapi.co`.
    Provider(String),
}

impl From<String> for CoordSource {
    fn from(value: String) -> Self {
        match value.as_str() {
            "gps" => CoordSource::Gps,
            "camera" => CoordSource::Camera,
            "none" => CoordSource::None,
            _ => CoordSource::Provider(value),
        }
    }
}

impl From<CoordSource> for String {
    fn from(value: CoordSource) -> Self {
        value.to_string()
    }
}

impl fmt::Display for CoordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordSource::Gps => f.write_str("gps"),
            CoordSource::Camera => f.write_str("camera"),
            CoordSource::None => f.write_str("none"),
            CoordSource::Provider(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub acc: Option<f64>,
    pub source: CoordSource,
}

impl Coords {
    pub fn gps(lat: f64, lon: f64, acc: Option<f64>) -> Self {
        Self {
            lat: Some(lat),
            lon: Some(lon),
            acc,
            source: CoordSource::Gps,
        }
    }

    pub fn provider(lat: f64, lon: f64, provider: &str) -> Self {
        Self {
            lat: Some(lat),
            lon: Some(lon),
            acc: None,
            source: CoordSource::Provider(provider.to_string()),
        }
    }

    pub fn none() -> Self {
        Self {
            lat: None,
            lon: None,
            acc: None,
            source: CoordSource::None,
        }
    }

    pub fn point(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HitKind {
    #[default]
    Location,
    Photo,
}

impl fmt::Display for HitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HitKind::Location => f.write_str("location"),
            HitKind::Photo => f.write_str("photo"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub id: String,
    pub ts: String,
    #[serde(default)]
    pub kind: HitKind,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub ua: String,
    pub coords: Coords,
    #[serde(default)]
    pub ip_label: Option<String>,
    #[serde(default)]
    pub place: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl Hit {
    /// Photo hit attached to `parent`. Location data is copied, never looked up.
    pub fn photo_of(parent: &Hit, id: String, ts: String, photo_url: String) -> Self {
        Self {
            id,
            ts,
            kind: HitKind::Photo,
            ip: parent.ip.clone(),
            ua: parent.ua.clone(),
            coords: parent.coords.clone(),
            ip_label: parent.ip_label.clone(),
            place: parent.place.clone(),
            photo_url: Some(photo_url),
            parent_id: Some(parent.id.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Online,
    Offline,
}

/// Browser/device details reported by the share page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

impl DeviceInfo {
    /// Overwrite fields present in `update`; absent fields keep their value.
    pub fn merge(&mut self, update: DeviceInfo) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }
        take(&mut self.screen, update.screen);
        take(&mut self.language, update.language);
        take(&mut self.timezone, update.timezone);
        take(&mut self.platform, update.platform);
        take(&mut self.vendor, update.vendor);
        take(&mut self.connection, update.connection);
        take(&mut self.battery, update.battery);
        take(&mut self.visibility, update.visibility);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub started_at: String,
    pub last_seen: String,
    #[serde(default)]
    pub stopped_at: Option<String>,
    pub status: SessionStatus,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub ua: String,
    #[serde(default)]
    pub device: DeviceInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEnvelope {
    pub ts: String,
    pub message: Map<String, JsonValue>,
}

/// One tracking link: its hit log, visitor sessions and signaling mailboxes.
///
/// The hit log is append-only from the outside; removal goes through
/// [`Channel::retain_hits`] and [`Channel::clear_hits`] so the id index
/// stays consistent with the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "StoredChannel")]
pub struct Channel {
    pub created_at: String,
    hits: Vec<Hit>,
    pub sessions: BTreeMap<String, Session>,
    pub signals: BTreeMap<String, Vec<SignalEnvelope>>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct StoredChannel {
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    hits: Vec<Hit>,
    #[serde(default)]
    sessions: BTreeMap<String, Session>,
    #[serde(default)]
    signals: BTreeMap<String, Vec<SignalEnvelope>>,
}

impl From<StoredChannel> for Channel {
    fn from(stored: StoredChannel) -> Self {
        let mut channel = Channel {
            created_at: stored.created_at,
            hits: stored.hits,
            sessions: stored.sessions,
            signals: stored.signals,
            index: HashMap::new(),
        };
        channel.rebuild_index();
        channel
    }
}

impl Channel {
    pub fn new(created_at: String) -> Self {
        Self {
            created_at,
            hits: Vec::new(),
            sessions: BTreeMap::new(),
            signals: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    pub fn push_hit(&mut self, hit: Hit) {
        // Later entries shadow earlier ones with the same id.
        self.index.insert(hit.id.clone(), self.hits.len());
        self.hits.push(hit);
    }

    pub fn find_hit(&self, id: &str) -> Option<&Hit> {
        self.index.get(id).and_then(|pos| self.hits.get(*pos))
    }

    pub fn last_hit(&self) -> Option<&Hit> {
        self.hits.last()
    }

    /// Hits with `ts` strictly after `since`, in log order.
    pub fn hits_since(&self, since: Option<&str>) -> Vec<Hit> {
        match since {
            Some(since) => self
                .hits
                .iter()
                .filter(|hit| hit.ts.as_str() > since)
                .cloned()
                .collect(),
            None => self.hits.clone(),
        }
    }

    pub fn clear_hits(&mut self) -> usize {
        let removed = self.hits.len();
        self.hits.clear();
        self.index.clear();
        removed
    }

    /// Drop the `count` oldest hits.
    pub fn drop_oldest_hits(&mut self, count: usize) -> usize {
        let count = count.min(self.hits.len());
        if count > 0 {
            self.hits.drain(..count);
            self.rebuild_index();
        }
        count
    }

    pub fn retain_hits<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&Hit) -> bool,
    {
        let before = self.hits.len();
        self.hits.retain(keep);
        let removed = before - self.hits.len();
        if removed > 0 {
            self.rebuild_index();
        }
        removed
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .hits
            .iter()
            .enumerate()
            .map(|(pos, hit)| (hit.id.clone(), pos))
            .collect();
    }
}

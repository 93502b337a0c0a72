use std::fmt;
use std::path::PathBuf;

use crate::retention::RetentionPolicy;

pub const DEFAULT_REVERSE_GEOCODE_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Clone)]
pub struct Settings {
    pub geowatch_env: String,
    pub api_bind: String,
    pub data_file: PathBuf,
    pub photo_dir: PathBuf,
    pub admin_user: String,
    /// Admin routes reject every request while this is unset.
    pub admin_password: Option<String>,
    pub retention: RetentionPolicy,
    pub max_photo_bytes: usize,
    pub lookup_timeout_secs: u64,
    pub ip_lookup: bool,
    pub reverse_geocode_url: Option<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("geowatch_env", &self.geowatch_env)
            .field("api_bind", &self.api_bind)
            .field("data_file", &self.data_file)
            .field("photo_dir", &self.photo_dir)
            .field("admin_user", &self.admin_user)
            .field(
                "admin_password",
                &self.admin_password.as_ref().map(|_| "[redacted]"),
            )
            .field("retention", &self.retention)
            .field("max_photo_bytes", &self.max_photo_bytes)
            .field("lookup_timeout_secs", &self.lookup_timeout_secs)
            .field("ip_lookup", &self.ip_lookup)
            .field("reverse_geocode_url", &self.reverse_geocode_url)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| var(key).and_then(|v| v.trim().parse::<u64>().ok());
        let defaults = RetentionPolicy::default();

        let geowatch_env = var("GEOWATCH_ENV").unwrap_or_else(|| "development".to_string());
        let api_bind = var("GEOWATCH_API_BIND").unwrap_or_else(|| "0.0.0.0:5055".to_string());
        let data_file = var("GEOWATCH_DATA_FILE")
            .or_else(|| var("DATA_FILE"))
            .unwrap_or_else(|| "store.json".to_string())
            .into();
        let photo_dir = var("GEOWATCH_PHOTO_DIR")
            .unwrap_or_else(|| "uploads".to_string())
            .into();
        let admin_user = var("GEOWATCH_ADMIN_USER").unwrap_or_else(|| "admin".to_string());
        let admin_password = var("GEOWATCH_ADMIN_PASSWORD").filter(|v| !v.is_empty());

        let retention = RetentionPolicy {
            max_hits: cap(parsed("GEOWATCH_MAX_HITS"), defaults.max_hits),
            max_sessions: cap(parsed("GEOWATCH_MAX_SESSIONS"), defaults.max_sessions),
            max_signals: cap(parsed("GEOWATCH_MAX_SIGNALS"), defaults.max_signals),
            hit_ttl_secs: parsed("GEOWATCH_HIT_TTL_SECS").unwrap_or(defaults.hit_ttl_secs),
        };

        let max_photo_bytes = cap(parsed("GEOWATCH_MAX_PHOTO_BYTES"), 8 * 1024 * 1024);
        let lookup_timeout_secs = parsed("GEOWATCH_LOOKUP_TIMEOUT_SECS")
            .filter(|v| *v > 0)
            .unwrap_or(4);
        let ip_lookup = var("GEOWATCH_IP_LOOKUP")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(true);
        let reverse_geocode_url = match var("GEOWATCH_REVERSE_GEOCODE_URL") {
            Some(url) if url.trim().is_empty() => None,
            Some(url) => Some(url.trim().trim_end_matches('/').to_string()),
            None => Some(DEFAULT_REVERSE_GEOCODE_URL.to_string()),
        };

        Self {
            geowatch_env,
            api_bind,
            data_file,
            photo_dir,
            admin_user,
            admin_password,
            retention,
            max_photo_bytes,
            lookup_timeout_secs,
            ip_lookup,
            reverse_geocode_url,
        }
    }
}

/// Caps must keep at least one entry.
fn cap(value: Option<u64>, default: usize) -> usize {
    value
        .and_then(|v| usize::try_from(v).ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

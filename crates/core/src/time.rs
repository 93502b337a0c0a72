use chrono::{DateTime, Utc};

/// Fixed-width UTC timestamp format. Lexicographic order of formatted values
/// matches chronological order, which the `since` cursor relies on.
pub const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn iso(at: DateTime<Utc>) -> String {
    at.format(TS_FORMAT).to_string()
}

pub fn now_iso() -> String {
    iso(Utc::now())
}

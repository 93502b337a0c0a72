//! Geolocation contracts and provider response parsing.
//!
//! Network access lives in the API crate; this module only knows how to
//! address each provider and how to read its answer.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq)]
pub struct IpLocation {
    pub lat: f64,
    pub lon: f64,
    pub label: Option<String>,
    pub provider: String,
}

/// Resolves an IP address to approximate coordinates. Implementations absorb
/// every failure and answer `None`.
#[async_trait]
pub trait IpGeolocator: Send + Sync {
    async fn locate(&self, ip: &str) -> Option<IpLocation>;
}

/// Resolves coordinates to a human-readable place label.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn place(&self, lat: f64, lon: f64) -> Option<String>;
}

/// Used when lookups are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disabled;

#[async_trait]
impl IpGeolocator for Disabled {
    async fn locate(&self, _ip: &str) -> Option<IpLocation> {
        None
    }
}

#[async_trait]
impl ReverseGeocoder for Disabled {
    async fn place(&self, _lat: f64, _lon: f64) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpProvider {
    IpApi,
    IpInfo,
}

impl IpProvider {
    /// Lookup order.
    pub const ALL: [IpProvider; 2] = [IpProvider::IpApi, IpProvider::IpInfo];

    pub fn name(&self) -> &'static str {
        match self {
            IpProvider::IpApi => "ipapi.co",
            IpProvider::IpInfo => "ipinfo.io",
        }
    }

    pub fn url(&self, ip: &str) -> String {
        match self {
            IpProvider::IpApi => format!("https://ipapi.co/{ip}/json/"),
            IpProvider::IpInfo => format!("https://ipinfo.io/{ip}/json"),
        }
    }

    pub fn parse(&self, body: &JsonValue) -> Option<IpLocation> {
        match self {
            IpProvider::IpApi => parse_ipapi(body),
            IpProvider::IpInfo => parse_ipinfo(body),
        }
    }
}

fn parse_ipapi(body: &JsonValue) -> Option<IpLocation> {
    let lat = number(body.get("latitude")?)?;
    let lon = number(body.get("longitude")?)?;
    // ipapi.co answers 0/0 for addresses it cannot place.
    if lat == 0.0 || lon == 0.0 || !valid_point(lat, lon) {
        return None;
    }
    Some(IpLocation {
        lat,
        lon,
        label: join_label(&[
            text(body, "city"),
            text(body, "region"),
            text(body, "country_name"),
        ]),
        provider: IpProvider::IpApi.name().to_string(),
    })
}

fn parse_ipinfo(body: &JsonValue) -> Option<IpLocation> {
    let loc = body.get("loc")?.as_str()?;
    let (lat, lon) = loc.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lon = lon.trim().parse::<f64>().ok()?;
    if !valid_point(lat, lon) {
        return None;
    }
    Some(IpLocation {
        lat,
        lon,
        label: join_label(&[
            text(body, "city"),
            text(body, "region"),
            text(body, "country"),
        ]),
        provider: IpProvider::IpInfo.name().to_string(),
    })
}

/// `display_name` from a Nominatim-style reverse geocoding response.
pub fn parse_nominatim(body: &JsonValue) -> Option<String> {
    body.get("display_name")
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

pub fn valid_point(lat: f64, lon: f64) -> bool {
    lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Joins the non-empty parts with `", "`.
pub fn join_label(parts: &[Option<&str>]) -> Option<String> {
    let parts: Vec<&str> = parts
        .iter()
        .flatten()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn text<'a>(body: &'a JsonValue, key: &str) -> Option<&'a str> {
    body.get(key).and_then(JsonValue::as_str)
}

fn number(value: &JsonValue) -> Option<f64> {
    let parsed = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

//! Request-body validation and GPS/IP coordinate resolution for incoming
//! location events.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use crate::geo::{valid_point, IpGeolocator, ReverseGeocoder};
use crate::net::is_private_ip;
use crate::types::Coords;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("body is not valid JSON")]
    Malformed,
    #[error("body must be a JSON object")]
    NotObject,
    #[error("body is empty")]
    Empty,
    #[error("invalid field: {0}")]
    Field(String),
    #[error("{0} is out of range")]
    OutOfRange(&'static str),
}

/// Parse a body that must be a JSON object. An empty body yields
/// `T::default()`; clients posting from `sendBeacon` often send no
/// content type, so none is required.
pub fn parse_object<T>(bytes: &[u8]) -> Result<T, PayloadError>
where
    T: DeserializeOwned + Default,
{
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: JsonValue = serde_json::from_slice(bytes).map_err(|_| PayloadError::Malformed)?;
    if !value.is_object() {
        return Err(PayloadError::NotObject);
    }
    serde_json::from_value(value).map_err(|err| PayloadError::Field(err.to_string()))
}

/// A signaling message: any non-empty body that is a JSON object.
pub fn parse_message(bytes: &[u8]) -> Result<Map<String, JsonValue>, PayloadError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(PayloadError::Empty);
    }
    match serde_json::from_slice::<JsonValue>(bytes) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(_) => Err(PayloadError::NotObject),
        Err(_) => Err(PayloadError::Malformed),
    }
}

/// Browser-reported position. Either coordinate alone counts as no fix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct GpsFix {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub acc: Option<f64>,
}

impl GpsFix {
    pub fn from_body(bytes: &[u8]) -> Result<Self, PayloadError> {
        let fix: GpsFix = parse_object(bytes)?;
        fix.validate()?;
        Ok(fix)
    }

    fn validate(&self) -> Result<(), PayloadError> {
        if let Some(lat) = self.lat {
            if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
                return Err(PayloadError::OutOfRange("lat"));
            }
        }
        if let Some(lon) = self.lon {
            if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
                return Err(PayloadError::OutOfRange("lon"));
            }
        }
        if let Some(acc) = self.acc {
            if !acc.is_finite() || acc < 0.0 {
                return Err(PayloadError::OutOfRange("acc"));
            }
        }
        Ok(())
    }

    pub fn point(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub coords: Coords,
    pub ip_label: Option<String>,
    pub place: Option<String>,
}

/// GPS wins; otherwise a public caller IP is geolocated; otherwise the
/// coordinates stay empty with source `none`. Final coordinates, whatever
/// their origin, are offered to the reverse geocoder.
pub async fn resolve_location(
    fix: GpsFix,
    ip: &str,
    geolocator: &dyn IpGeolocator,
    geocoder: &dyn ReverseGeocoder,
) -> ResolvedLocation {
    let (coords, ip_label) = match fix.point() {
        Some((lat, lon)) => (Coords::gps(lat, lon, fix.acc), None),
        None if is_private_ip(ip) => (Coords::none(), None),
        None => match geolocator.locate(ip).await {
            Some(found) if valid_point(found.lat, found.lon) => (
                Coords::provider(found.lat, found.lon, &found.provider),
                found.label,
            ),
            _ => (Coords::none(), None),
        },
    };

    let place = match coords.point() {
        Some((lat, lon)) => geocoder.place(lat, lon).await,
        None => None,
    };

    ResolvedLocation {
        coords,
        ip_label,
        place,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Disabled, IpLocation};
    use crate::types::CoordSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FixedGeo {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IpGeolocator for FixedGeo {
        async fn locate(&self, _ip: &str) -> Option<IpLocation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(IpLocation {
                lat: -6.2,
                lon: 106.8,
                label: Some("Jakarta, Indonesia".to_string()),
                provider: "ipinfo.io".to_string(),
            })
        }
    }

    struct FixedPlace;

    #[async_trait]
    impl ReverseGeocoder for FixedPlace {
        async fn place(&self, lat: f64, lon: f64) -> Option<String> {
            Some(format!("near {lat},{lon}"))
        }
    }

    #[test]
    fn test_empty_body_is_no_fix() {
        assert_eq!(GpsFix::from_body(b"").unwrap(), GpsFix::default());
        assert_eq!(GpsFix::from_body(b"  \n").unwrap(), GpsFix::default());
    }

    #[test]
    fn test_fix_parses_numbers_and_nulls() {
        let fix = GpsFix::from_body(br#"{"lat": 1.5, "lon": 2.5, "acc": null}"#).unwrap();
        assert_eq!(fix.point(), Some((1.5, 2.5)));
        assert_eq!(fix.acc, None);
    }

    #[test]
    fn test_fix_rejects_bad_payloads() {
        assert_eq!(GpsFix::from_body(b"{lat"), Err(PayloadError::Malformed));
        assert_eq!(GpsFix::from_body(b"[1, 2]"), Err(PayloadError::NotObject));
        assert!(matches!(
            GpsFix::from_body(br#"{"lat": "north"}"#),
            Err(PayloadError::Field(_))
        ));
        assert_eq!(
            GpsFix::from_body(br#"{"lat": 91, "lon": 0}"#),
            Err(PayloadError::OutOfRange("lat"))
        );
        assert_eq!(
            GpsFix::from_body(br#"{"lat": 0, "lon": -181}"#),
            Err(PayloadError::OutOfRange("lon"))
        );
        assert_eq!(
            GpsFix::from_body(br#"{"lat": 0, "lon": 0, "acc": -1}"#),
            Err(PayloadError::OutOfRange("acc"))
        );
    }

    #[test]
    fn test_single_coordinate_is_no_fix() {
        let fix = GpsFix::from_body(br#"{"lat": 10.0}"#).unwrap();
        assert_eq!(fix.point(), None);
    }

    #[test]
    fn test_parse_message() {
        let msg = parse_message(br#"{"type": "offer"}"#).unwrap();
        assert_eq!(msg["type"], "offer");
        assert_eq!(parse_message(b""), Err(PayloadError::Empty));
        assert_eq!(parse_message(b"\"hi\""), Err(PayloadError::NotObject));
        assert_eq!(parse_message(b"{oops"), Err(PayloadError::Malformed));
    }

    #[tokio::test]
    async fn test_gps_wins_and_skips_ip_lookup() {
        let geo = FixedGeo::default();
        let fix = GpsFix {
            lat: Some(1.5),
            lon: Some(2.5),
            acc: Some(20.0),
        };

        let resolved = resolve_location(fix, "8.8.8.8", &geo, &FixedPlace).await;

        assert_eq!(resolved.coords, Coords::gps(1.5, 2.5, Some(20.0)));
        assert_eq!(resolved.coords.source, CoordSource::Gps);
        assert_eq!(resolved.ip_label, None);
        assert_eq!(resolved.place.as_deref(), Some("near 1.5,2.5"));
        assert_eq!(geo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_public_ip_falls_back_to_provider() {
        let geo = FixedGeo::default();

        let resolved = resolve_location(GpsFix::default(), "8.8.8.8", &geo, &Disabled).await;

        assert_eq!(
            resolved.coords.source,
            CoordSource::Provider("ipinfo.io".to_string())
        );
        assert_eq!(resolved.coords.point(), Some((-6.2, 106.8)));
        assert_eq!(resolved.coords.acc, None);
        assert_eq!(resolved.ip_label.as_deref(), Some("Jakarta, Indonesia"));
        assert_eq!(resolved.place, None);
    }

    #[tokio::test]
    async fn test_private_ip_is_never_looked_up() {
        let geo = FixedGeo::default();

        let resolved = resolve_location(GpsFix::default(), "192.168.1.5", &geo, &FixedPlace).await;

        assert_eq!(resolved.coords, Coords::none());
        assert_eq!(resolved.place, None);
        assert_eq!(geo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_lookup_records_none() {
        let resolved = resolve_location(GpsFix::default(), "8.8.8.8", &Disabled, &FixedPlace).await;
        assert_eq!(resolved.coords.source, CoordSource::None);
        assert_eq!(resolved.coords.point(), None);
    }
}

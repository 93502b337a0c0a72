//! HTTP-backed geolocation. Every failure (connect, timeout, status, body)
//! is logged at debug and treated as "no answer".

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use geowatch_core::geo::{parse_nominatim, IpGeolocator, IpLocation, IpProvider, ReverseGeocoder};
use serde_json::Value as JsonValue;
use tracing::debug;

pub fn http_client(timeout_secs: u64) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("geowatch/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Tries each provider in order and keeps the first usable answer.
pub struct HttpGeolocator {
    client: reqwest::Client,
    providers: Vec<IpProvider>,
}

impl HttpGeolocator {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            providers: IpProvider::ALL.to_vec(),
        }
    }
}

#[async_trait]
impl IpGeolocator for HttpGeolocator {
    async fn locate(&self, ip: &str) -> Option<IpLocation> {
        first_usable(&self.providers, ip, |url| fetch_json(self.client.get(url))).await
    }
}

/// Walks `providers` in order. A provider that fails or answers with no
/// usable coordinates hands over to the next one.
async fn first_usable<F, Fut>(providers: &[IpProvider], ip: &str, fetch: F) -> Option<IpLocation>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Option<JsonValue>>,
{
    for provider in providers {
        let Some(body) = fetch(provider.url(ip)).await else {
            continue;
        };
        match provider.parse(&body) {
            Some(found) => return Some(found),
            None => debug!(provider = provider.name(), %ip, "geo: unusable provider answer"),
        }
    }
    None
}

pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn place(&self, lat: f64, lon: f64) -> Option<String> {
        let request = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("zoom", "16".to_string()),
            ]);
        let body = fetch_json(request).await?;
        parse_nominatim(&body)
    }
}

async fn fetch_json(request: reqwest::RequestBuilder) -> Option<JsonValue> {
    let response = match request.send().await {
        Ok(response) => response,
        Err(err) => {
            debug!(error = %err, "geo: request failed");
            return None;
        }
    };
    let status = response.status();
    if !status.is_success() {
        debug!(status = status.as_u16(), url = %response.url(), "geo: non-success status");
        return None;
    }
    match response.json::<JsonValue>().await {
        Ok(body) => Some(body),
        Err(err) => {
            debug!(error = %err, "geo: undecodable body");
            None
        }
    }
}

use std::net::SocketAddr;
use std::sync::Arc;

use db::{JsonFileBackend, Store};
use geowatch_core::config::Settings;
use geowatch_core::geo::{Disabled, IpGeolocator, ReverseGeocoder};
use tokio::net::TcpListener;
use tracing::{info, warn};

mod error;
mod extract;
mod geo;
mod middleware;
mod routes;
mod state;
mod uploads;

use crate::geo::{HttpGeolocator, NominatimGeocoder};
use crate::state::AppState;
use crate::uploads::PhotoStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .init();

    let settings = Settings::from_env();
    info!(?settings, "loaded settings");
    if settings.admin_password.is_none() {
        warn!("GEOWATCH_ADMIN_PASSWORD is not set; admin routes will refuse every request");
    }

    let addr: SocketAddr = settings.api_bind.parse()?;

    let backend = Arc::new(JsonFileBackend::new(settings.data_file.clone()));
    let store = Store::open(backend, settings.retention).await;

    let client = geo::http_client(settings.lookup_timeout_secs)?;
    let geolocator: Arc<dyn IpGeolocator> = if settings.ip_lookup {
        Arc::new(HttpGeolocator::new(client.clone()))
    } else {
        Arc::new(Disabled)
    };
    let geocoder: Arc<dyn ReverseGeocoder> = match settings.reverse_geocode_url.as_deref() {
        Some(base_url) => Arc::new(NominatimGeocoder::new(client, base_url)),
        None => Arc::new(Disabled),
    };

    let state = AppState {
        store: Arc::new(store),
        geolocator,
        geocoder,
        photos: Arc::new(PhotoStore::new(settings.photo_dir.clone())),
        settings: Arc::new(settings),
    };

    let app = routes::app(state);

    info!(%addr, "starting api");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

use std::sync::Arc;

use db::Store;
use geowatch_core::config::Settings;
use geowatch_core::geo::{IpGeolocator, ReverseGeocoder};

use crate::uploads::PhotoStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub geolocator: Arc<dyn IpGeolocator>,
    pub geocoder: Arc<dyn ReverseGeocoder>,
    pub photos: Arc<PhotoStore>,
    pub settings: Arc<Settings>,
}

#[derive(Debug, Clone)]
pub struct RequestId(pub String);

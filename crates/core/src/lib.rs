//! Domain types and pure logic shared by the geowatch store and API.

pub mod auth;
pub mod config;
pub mod geo;
pub mod ingest;
pub mod net;
pub mod retention;
pub mod time;
pub mod token;
pub mod types;

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::Parser;

/// Delivery map and route planning API.
#[derive(Debug, Clone, Parser)]
#[command(name = "backend", version)]
pub struct Config {
    /// Address the HTTP server listens on.
    #[arg(long, env = "DELIVERY_MAP_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Directory holding the deliveries, fleet, regions, routes and geolocation files.
    #[arg(long, env = "DELIVERY_MAP_DATA", default_value = "backend/data")]
    pub data_dir: PathBuf,

    #[arg(
        long,
        env = "NOMINATIM_URL",
        default_value = "https://nominatim.openstreetmap.org/search"
    )]
    pub nominatim_url: String,

    /// Nominatim asks every client to identify itself.
    #[arg(
        long,
        env = "NOMINATIM_USER_AGENT",
        default_value = "delivery-map/0.1 (logistica@example.com)"
    )]
    pub user_agent: String,

    /// Minimum delay between two geocoding requests, in milliseconds.
    #[arg(long, env = "GEOCODE_INTERVAL_MS", default_value_t = 1000)]
    pub geocode_interval_ms: u64,
}

impl Config {
    pub fn geocode_interval(&self) -> Duration {
        Duration::from_millis(self.geocode_interval_ms)
    }
}

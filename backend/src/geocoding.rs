use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use shared::Coordinate;
use tokio::{sync::Mutex, time::Instant};

use crate::error::GeocodeError;

/// Free-text address lookup.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the service knows no place for `query`.
    async fn locate(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

fn parse_coordinate(raw: &str) -> Result<f64, GeocodeError> {
    raw.trim()
        .parse()
        .map_err(|_| GeocodeError::BadCoordinate(raw.to_string()))
}

/// Nominatim search client. Calls are spaced at least `min_interval` apart, as the
/// public instance allows one request per second.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    search_url: String,
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl NominatimGeocoder {
    pub fn new(
        search_url: impl Into<String>,
        user_agent: &str,
        min_interval: Duration,
    ) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            search_url: search_url.into(),
            min_interval,
            last_call: Mutex::new(None),
        })
    }

    async fn throttle(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn locate(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError> {
        self.throttle().await;
        tracing::debug!(query, "nominatim search");

        let places: Vec<NominatimPlace> = self
            .client
            .get(&self.search_url)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };
        Ok(Some(Coordinate {
            lat: parse_coordinate(&place.lat)?,
            lon: parse_coordinate(&place.lon)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nominatim_coordinates_are_strings() {
        let places: Vec<NominatimPlace> =
            serde_json::from_str(r#"[{"lat":"-25.4284","lon":"-49.2733","display_name":"Curitiba"}]"#)
                .unwrap();
        assert_eq!(parse_coordinate(&places[0].lat).unwrap(), -25.4284);
        assert!(matches!(
            parse_coordinate("north"),
            Err(GeocodeError::BadCoordinate(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_calls_are_spaced() {
        let geocoder =
            NominatimGeocoder::new("http://localhost/search", "test", Duration::from_secs(1))
                .unwrap();
        let start = Instant::now();
        geocoder.throttle().await;
        geocoder.throttle().await;
        geocoder.throttle().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}

// Handlers for the delivery map page: page data, geocoding, saved geolocations and
// delivery regions.

use std::collections::HashSet;

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use shared::{AbsEntry, GeocodeReply, MapPageData, Region, SaveRegionsRequest, StatusReply};

use crate::AppState;
use crate::error::{ApiFailure, PayloadError};
use crate::models::GeolocationPayload;

const SAVE_FAILED: &str = "Falha ao salvar.";
const SAVE_REGIONS_FAILED: &str = "Falha ao salvar as regiões.";

/// GET /mapa/data
pub async fn map_data(State(state): State<AppState>) -> Json<MapPageData> {
    Json(state.store.map_page().await)
}

/// POST /mapa/find_geolocation/:abs_entry
///
/// A hit is persisted before it is returned. Geocoder failures are reported in the
/// reply body, not as an HTTP error.
pub async fn find_geolocation(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<GeocodeReply>, ApiFailure> {
    let Path(id) = id.map_err(|_| ApiFailure::from(PayloadError::Invalid))?;
    let id = AbsEntry(id);
    let query = state
        .store
        .delivery(id)
        .map(|delivery| delivery.geocode_query())
        .ok_or_else(|| ApiFailure::unknown_delivery(id))?;

    match state.geocoder.locate(&query).await {
        Ok(Some(at)) => {
            state
                .store
                .save_geolocation(id, at)
                .await
                .map_err(|err| ApiFailure::persistence(SAVE_FAILED, err))?;
            tracing::info!(%id, lat = at.lat, lon = at.lon, "geolocation found");
            Ok(Json(GeocodeReply::Success {
                lat: at.lat,
                lon: at.lon,
            }))
        }
        Ok(None) => {
            tracing::info!(%id, query = %query, "no geocoding match");
            Ok(Json(GeocodeReply::NotFound))
        }
        Err(err) => {
            tracing::error!(%id, error = %err, "geocoding failed");
            Ok(Json(GeocodeReply::Error {
                message: err.to_string(),
            }))
        }
    }
}

/// POST /mapa/save_geolocation
pub async fn save_geolocation(
    State(state): State<AppState>,
    payload: Result<Json<GeolocationPayload>, JsonRejection>,
) -> Result<Json<StatusReply>, ApiFailure> {
    let Json(payload) = payload?;
    let (id, at) = payload.parse()?;
    state
        .store
        .save_geolocation(id, at)
        .await
        .map_err(|err| ApiFailure::persistence(SAVE_FAILED, err))?;
    Ok(Json(StatusReply::Success))
}

/// Trims names and city lists; rejects blank names, empty city sets and names that
/// repeat ignoring case.
pub fn validate_regions(regions: Vec<Region>) -> Result<Vec<Region>, PayloadError> {
    let mut seen = HashSet::new();
    regions
        .into_iter()
        .map(|region| {
            let name = region.name.trim().to_string();
            if name.is_empty() {
                return Err(PayloadError::Rejected(
                    "Por favor, dê um nome para a região.".into(),
                ));
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(PayloadError::Rejected(format!(
                    "A região \"{name}\" está duplicada."
                )));
            }
            let cities: Vec<String> = region
                .cities
                .iter()
                .map(|city| city.trim())
                .filter(|city| !city.is_empty())
                .map(str::to_string)
                .collect();
            if cities.is_empty() {
                return Err(PayloadError::Rejected(format!(
                    "A região \"{name}\" não tem cidades."
                )));
            }
            Ok(Region { name, cities })
        })
        .collect()
}

/// POST /mapa/save_regioes
pub async fn save_regions(
    State(state): State<AppState>,
    payload: Result<Json<SaveRegionsRequest>, JsonRejection>,
) -> Result<Json<StatusReply>, ApiFailure> {
    let Json(request) = payload?;
    let regions = validate_regions(request.regioes)?;
    state
        .store
        .save_regions(regions)
        .await
        .map_err(|err| ApiFailure::persistence(SAVE_REGIONS_FAILED, err))?;
    Ok(Json(StatusReply::Success))
}

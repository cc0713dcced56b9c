//! JSON file store for the delivery data directory.
//!
//! `deliveries.json` and `frota.json` are read once at startup and never written.
//! Geolocation overrides, regions and routes are kept in memory behind a lock and
//! rewritten whole (temp file + rename) on every change.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use shared::{
    AbsEntry, Coordinate, MapPageData, PlannedDelivery, PlanningPageData, Region, RouteOverview,
    Truck,
};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::{AVAILABLE_TRUCK, DeliveryRecord, RouteRecord, SavedGeolocation};

pub const DELIVERIES_FILE: &str = "deliveries.json";
pub const FLEET_FILE: &str = "frota.json";
pub const GEOLOCATIONS_FILE: &str = "geolocations.json";
pub const REGIONS_FILE: &str = "regioes.json";
pub const ROUTES_FILE: &str = "rotas.json";

#[derive(Default)]
struct Persisted {
    geolocations: BTreeMap<AbsEntry, Coordinate>,
    regions: Vec<Region>,
    routes: Vec<RouteRecord>,
}

pub struct DeliveryStore {
    data_dir: PathBuf,
    deliveries: Vec<DeliveryRecord>,
    trucks: Vec<Truck>,
    state: RwLock<Persisted>,
}

async fn read_json<T>(path: &Path) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
{
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.display().to_string(),
                source,
            });
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.display().to_string(),
            source,
        })
}

async fn write_json<T>(path: &Path, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
{
    let io_error = |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    };
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
        path: path.display().to_string(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await.map_err(io_error)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_error)
}

impl DeliveryStore {
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        let load = |name: &str| data_dir.join(name);

        let deliveries: Vec<DeliveryRecord> =
            read_json(&load(DELIVERIES_FILE)).await?.unwrap_or_default();
        let trucks: Vec<Truck> = read_json(&load(FLEET_FILE)).await?.unwrap_or_default();
        let saved: Vec<SavedGeolocation> =
            read_json(&load(GEOLOCATIONS_FILE)).await?.unwrap_or_default();
        let regions: Vec<Region> = read_json(&load(REGIONS_FILE)).await?.unwrap_or_default();
        let routes: Vec<RouteRecord> = read_json(&load(ROUTES_FILE)).await?.unwrap_or_default();

        tracing::info!(
            data_dir = %data_dir.display(),
            deliveries = deliveries.len(),
            trucks = trucks.len(),
            geolocations = saved.len(),
            regions = regions.len(),
            routes = routes.len(),
            "loaded delivery data"
        );

        let geolocations = saved
            .into_iter()
            .map(|g| (g.abs_entry, Coordinate::new(g.lat, g.lon)))
            .collect();

        Ok(Self {
            data_dir,
            deliveries,
            trucks,
            state: RwLock::new(Persisted {
                geolocations,
                regions,
                routes,
            }),
        })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    fn routed_deliveries(&self) -> impl Iterator<Item = &DeliveryRecord> {
        self.deliveries.iter().filter(|d| d.is_delivery())
    }

    pub fn delivery(&self, id: AbsEntry) -> Option<&DeliveryRecord> {
        self.routed_deliveries().find(|d| d.abs_entry == id)
    }

    pub fn truck(&self, id: &str) -> Option<&Truck> {
        self.trucks.iter().find(|t| t.id == id)
    }

    pub async fn map_page(&self) -> MapPageData {
        let state = self.state.read().await;
        let mut locations: Vec<_> = self
            .routed_deliveries()
            .map(|d| d.to_location(state.geolocations.get(&d.abs_entry).copied()))
            .collect();
        locations.sort_by(|a, b| a.card_name.cmp(&b.card_name));

        let cities: BTreeSet<String> = locations
            .iter()
            .filter(|l| !l.city.is_empty())
            .map(|l| l.city.clone())
            .collect();

        MapPageData {
            locations,
            cities: cities.into_iter().collect(),
            regions: state.regions.clone(),
        }
    }

    /// Deliveries not yet on any route, with their weight, and the available trucks.
    pub async fn planning_page(&self) -> PlanningPageData {
        let state = self.state.read().await;
        let allocated: HashSet<AbsEntry> = state
            .routes
            .iter()
            .flat_map(|r| r.stops.iter().map(|s| s.abs_entry))
            .collect();

        let mut pedidos: Vec<_> = self
            .routed_deliveries()
            .filter(|d| !allocated.contains(&d.abs_entry))
            .map(|d| PlannedDelivery {
                location: d.to_location(state.geolocations.get(&d.abs_entry).copied()),
                weight_kg: d.weight_kg(),
            })
            .collect();
        pedidos.sort_by(|a, b| a.location.card_name.cmp(&b.location.card_name));

        PlanningPageData {
            pedidos,
            caminhoes: self
                .trucks
                .iter()
                .filter(|t| t.status == AVAILABLE_TRUCK)
                .cloned()
                .collect(),
        }
    }

    pub async fn save_geolocation(&self, id: AbsEntry, at: Coordinate) -> Result<(), StoreError> {
        if self.delivery(id).is_none() {
            return Err(StoreError::UnknownDelivery(id));
        }
        let mut state = self.state.write().await;
        let previous = state.geolocations.insert(id, at);
        let saved: Vec<SavedGeolocation> = state
            .geolocations
            .iter()
            .map(|(&abs_entry, c)| SavedGeolocation {
                abs_entry,
                lat: c.lat,
                lon: c.lon,
            })
            .collect();

        if let Err(err) = write_json(&self.path(GEOLOCATIONS_FILE), &saved).await {
            match previous {
                Some(previous) => state.geolocations.insert(id, previous),
                None => state.geolocations.remove(&id),
            };
            return Err(err);
        }
        tracing::debug!(%id, lat = at.lat, lon = at.lon, "geolocation saved");
        Ok(())
    }

    pub async fn save_regions(&self, regions: Vec<Region>) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        write_json(&self.path(REGIONS_FILE), &regions).await?;
        tracing::debug!(count = regions.len(), "regions saved");
        state.regions = regions;
        Ok(())
    }

    /// Stores `route` under the next free id and returns that id.
    pub async fn create_route(&self, mut route: RouteRecord) -> Result<u32, StoreError> {
        let mut state = self.state.write().await;
        route.id = state.routes.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let id = route.id;
        state.routes.push(route);

        if let Err(err) = write_json(&self.path(ROUTES_FILE), &state.routes).await {
            state.routes.pop();
            return Err(err);
        }
        tracing::info!(id_rota = id, "route created");
        Ok(id)
    }

    /// Routes with stop count and total weight, newest route date first.
    pub async fn route_overviews(&self) -> Vec<RouteOverview> {
        let weights: HashMap<AbsEntry, f64> = self
            .deliveries
            .iter()
            .map(|d| (d.abs_entry, d.weight_kg()))
            .collect();
        let state = self.state.read().await;

        let mut routes: Vec<&RouteRecord> = state.routes.iter().collect();
        routes.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        routes
            .into_iter()
            .map(|route| RouteOverview {
                id_rota: route.id,
                id_caminhao: route.truck_id.clone(),
                placa: route.plate.clone(),
                motorista: route.driver.clone(),
                data_rota: route.date.format("%Y-%m-%d").to_string(),
                status: route.status.clone(),
                tipo: route.kind,
                num_paradas: route.stops.len(),
                peso_total_kg: route
                    .stops
                    .iter()
                    .map(|s| weights.get(&s.abs_entry).copied().unwrap_or(0.0))
                    .sum(),
            })
            .collect()
    }
}

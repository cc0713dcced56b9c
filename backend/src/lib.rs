pub mod config;
pub mod error;
pub mod geocoding;
pub mod map_handlers;
pub mod models;
pub mod route_handlers;
pub mod store;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::geocoding::Geocoder;
use crate::store::DeliveryStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DeliveryStore>,
    pub geocoder: Arc<dyn Geocoder>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/mapa/data", get(map_handlers::map_data))
        .route(
            "/mapa/find_geolocation/:abs_entry",
            post(map_handlers::find_geolocation),
        )
        .route("/mapa/save_geolocation", post(map_handlers::save_geolocation))
        .route("/mapa/save_regioes", post(map_handlers::save_regions))
        .route("/rotas/planejamento/data", get(route_handlers::planning_data))
        .route("/rotas/api/criar", post(route_handlers::create_route))
        .route("/rotas/api/lista", get(route_handlers::list_routes))
        .with_state(state)
}

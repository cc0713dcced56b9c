use std::sync::Arc;

use backend::{
    AppState, config::Config, create_router, geocoding::NominatimGeocoder, store::DeliveryStore,
};
use clap::Parser;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,tower_http=info,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    let store = DeliveryStore::open(&config.data_dir).await?;
    let geocoder = NominatimGeocoder::new(
        config.nominatim_url.as_str(),
        &config.user_agent,
        config.geocode_interval(),
    )?;

    let state = AppState {
        store: Arc::new(store),
        geocoder: Arc::new(geocoder),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!("starting backend on http://{}", config.bind);
    tracing::info!("  GET  /mapa/data");
    tracing::info!("  POST /mapa/find_geolocation/:abs_entry");
    tracing::info!("  POST /mapa/save_geolocation");
    tracing::info!("  POST /mapa/save_regioes");
    tracing::info!("  GET  /rotas/planejamento/data");
    tracing::info!("  POST /rotas/api/criar");
    tracing::info!("  GET  /rotas/api/lista");

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

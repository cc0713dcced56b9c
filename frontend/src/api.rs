//! Fetch calls to the delivery backend.
//!
//! Replies are parsed whatever the HTTP status, since error replies carry their
//! message in the JSON body. A request that throws or a body that is not the expected
//! JSON becomes [`UiError::Network`]; nothing is retried.

use seed::prelude::*;
use serde::{Serialize, de::DeserializeOwned};
use shared::{
    AbsEntry, Coordinate, CreateRouteReply, CreateRouteRequest, GeocodeReply, MapPageData,
    PlanningPageData, SaveGeolocationRequest, SaveRegionsRequest, StatusReply,
};

use crate::error::UiError;

pub fn api_root() -> String {
    option_env!("FRONTEND_API_ROOT")
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_default()
}

fn endpoint(path: &str) -> String {
    format!("{}{path}", api_root())
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(Coordinate),
    NotFound,
    Error(UiError),
}

impl From<Result<GeocodeReply, UiError>> for LookupOutcome {
    fn from(reply: Result<GeocodeReply, UiError>) -> Self {
        match reply {
            Ok(GeocodeReply::Success { lat, lon }) => Self::Found(Coordinate { lat, lon }),
            Ok(GeocodeReply::NotFound) => Self::NotFound,
            Ok(GeocodeReply::Error { message }) => Self::Error(UiError::Server(message)),
            Err(err) => Self::Error(err),
        }
    }
}

fn status_result(reply: StatusReply) -> Result<(), UiError> {
    reply.into_result().map_err(UiError::Server)
}

fn route_result(reply: CreateRouteReply) -> Result<u32, UiError> {
    match reply {
        CreateRouteReply::Success { id_rota } => Ok(id_rota),
        CreateRouteReply::Error { message } => Err(UiError::Server(message)),
    }
}

fn network_error(err: FetchError) -> UiError {
    web_sys::console::error_1(&format!("[frontend] request failed: {err:?}").into());
    UiError::Network
}

async fn send<R>(request: Request<'_>) -> Result<R, UiError>
where
    R: DeserializeOwned + 'static,
{
    let response = request.fetch().await.map_err(network_error)?;
    response.json::<R>().await.map_err(network_error)
}

async fn post_json<B, R>(path: &str, body: &B) -> Result<R, UiError>
where
    B: Serialize,
    R: DeserializeOwned + 'static,
{
    let request = Request::new(endpoint(path))
        .method(Method::Post)
        .json(body)
        .map_err(network_error)?;
    send(request).await
}

pub async fn load_map_page() -> Result<MapPageData, UiError> {
    send(Request::new(endpoint("/mapa/data"))).await
}

pub async fn load_planning_page() -> Result<PlanningPageData, UiError> {
    send(Request::new(endpoint("/rotas/planejamento/data"))).await
}

pub async fn lookup_geolocation(id: AbsEntry) -> LookupOutcome {
    let request = Request::new(endpoint(&format!("/mapa/find_geolocation/{id}"))).method(Method::Post);
    send::<GeocodeReply>(request).await.into()
}

pub async fn save_geolocation(id: AbsEntry, at: Coordinate) -> Result<(), UiError> {
    let body = SaveGeolocationRequest {
        abs_entry: Some(id),
        lat: Some(at.lat),
        lon: Some(at.lon),
    };
    status_result(post_json("/mapa/save_geolocation", &body).await?)
}

pub async fn save_regions(body: SaveRegionsRequest) -> Result<(), UiError> {
    status_result(post_json("/mapa/save_regioes", &body).await?)
}

pub async fn create_route(body: CreateRouteRequest) -> Result<u32, UiError> {
    route_result(post_json("/rotas/api/criar", &body).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_outcomes_are_distinct() {
        assert_eq!(
            LookupOutcome::from(Ok(GeocodeReply::Success { lat: -23.5, lon: -46.6 })),
            LookupOutcome::Found(Coordinate::new(-23.5, -46.6))
        );
        assert_eq!(
            LookupOutcome::from(Ok(GeocodeReply::NotFound)),
            LookupOutcome::NotFound
        );
        assert_eq!(
            LookupOutcome::from(Ok(GeocodeReply::Error {
                message: "timeout".into()
            })),
            LookupOutcome::Error(UiError::Server("timeout".into()))
        );
        assert_eq!(
            LookupOutcome::from(Err(UiError::Network)),
            LookupOutcome::Error(UiError::Network)
        );
    }

    #[test]
    fn server_messages_are_kept_verbatim() {
        assert_eq!(
            status_result(StatusReply::error("Falha ao salvar.")),
            Err(UiError::Server("Falha ao salvar.".into()))
        );
        assert_eq!(route_result(CreateRouteReply::Success { id_rota: 4 }), Ok(4));
        let err = route_result(CreateRouteReply::Error {
            message: "Selecione ao menos um pedido.".into(),
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Selecione ao menos um pedido.");
    }
}

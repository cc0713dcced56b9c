// Handlers for route planning: available deliveries and trucks, route creation and
// the route list.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use chrono::NaiveDate;
use shared::{CreateRouteReply, CreateRouteRequest, PlanningPageData, RouteKind, RouteOverview, Truck};

use crate::AppState;
use crate::error::{ApiFailure, PayloadError};
use crate::models::{PENDING, PLANNED, RouteRecord, StopRecord};

const SAVE_ROUTE_FAILED: &str = "Falha ao salvar a rota.";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// GET /rotas/planejamento/data
pub async fn planning_data(State(state): State<AppState>) -> Json<PlanningPageData> {
    Json(state.store.planning_page().await)
}

/// GET /rotas/api/lista
pub async fn list_routes(State(state): State<AppState>) -> Json<Vec<RouteOverview>> {
    Json(state.store.route_overviews().await)
}

fn parse_date(raw: &str) -> Result<NaiveDate, PayloadError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| PayloadError::Invalid)
}

/// Checks a create-route request and turns it into a record; the store assigns the id.
pub fn build_route(request: CreateRouteRequest, truck: &Truck) -> Result<RouteRecord, PayloadError> {
    if request.pedidos.is_empty() {
        return Err(PayloadError::Rejected("Selecione ao menos um pedido.".into()));
    }
    if request.data_rota.trim().is_empty() {
        return Err(PayloadError::Incomplete);
    }
    let date = parse_date(&request.data_rota)?;

    let pending = request.tipo == RouteKind::Pendente;
    let deadline = match request.data_limite.as_deref().map(str::trim) {
        Some(raw) if pending && !raw.is_empty() => Some(parse_date(raw)?),
        _ => None,
    };
    let target_kg = match request.meta_kg {
        Some(kg) if !kg.is_finite() || kg < 0.0 => return Err(PayloadError::Invalid),
        Some(kg) if pending => kg,
        _ => 0.0,
    };

    let stops = request
        .pedidos
        .into_iter()
        .zip(1..)
        .map(|(stop, visit_order)| StopRecord {
            abs_entry: stop.abs_entry,
            card_name: stop.card_name,
            visit_order,
            status: PENDING.to_string(),
        })
        .collect();

    Ok(RouteRecord {
        id: 0,
        truck_id: truck.id.clone(),
        plate: truck.plate.clone(),
        driver: truck.driver.clone(),
        date,
        status: (if pending { PENDING } else { PLANNED }).to_string(),
        target_kg,
        deadline,
        notes: request.observacoes.trim().to_string(),
        kind: request.tipo,
        stops,
    })
}

/// POST /rotas/api/criar
pub async fn create_route(
    State(state): State<AppState>,
    payload: Result<Json<CreateRouteRequest>, JsonRejection>,
) -> Result<Json<CreateRouteReply>, ApiFailure> {
    let Json(request) = payload?;
    if request.id_caminhao.trim().is_empty() {
        return Err(PayloadError::Incomplete.into());
    }
    let truck = state
        .store
        .truck(request.id_caminhao.trim())
        .ok_or_else(|| ApiFailure::bad_request("Caminhão não encontrado."))?;
    if let Some(unknown) = request
        .pedidos
        .iter()
        .find(|stop| state.store.delivery(stop.abs_entry).is_none())
    {
        return Err(ApiFailure::unknown_delivery(unknown.abs_entry));
    }

    let route = build_route(request, truck)?;
    let id_rota = state
        .store
        .create_route(route)
        .await
        .map_err(|err| ApiFailure::persistence(SAVE_ROUTE_FAILED, err))?;
    Ok(Json(CreateRouteReply::Success { id_rota }))
}

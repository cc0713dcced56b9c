use seed::{prelude::*, *};
use shared::{AbsEntry, PlanningPageData, RouteKind, Truck};

use super::{Notice, bool_attr, view_notice};
use crate::api;
use crate::error::UiError;
use crate::map::LeafletMap;
use crate::planner::RoutePlanner;
use crate::route_plan::RouteForm;

pub struct Model {
    map: Option<LeafletMap>,
    planner: Option<RoutePlanner<LeafletMap>>,
    trucks: Vec<Truck>,
    load_error: Option<UiError>,
    form: RouteForm,
    modal_open: bool,
    submitting: bool,
    notice: Option<Notice>,
}

pub enum Msg {
    DataLoaded(Result<PlanningPageData, UiError>),
    ToggleDelivery(AbsEntry),
    OpenModal,
    CloseModal,
    TruckChanged(String),
    DateChanged(String),
    KindChanged(String),
    TargetChanged(String),
    DeadlineChanged(String),
    NotesChanged(String),
    Submit,
    RouteCreated(Result<u32, UiError>),
    DismissNotice,
}

pub fn init(_: Url, orders: &mut impl Orders<Msg>) -> Model {
    orders.perform_cmd(async { Msg::DataLoaded(api::load_planning_page().await) });
    Model {
        map: Some(LeafletMap::mount("map-planejamento")),
        planner: None,
        trucks: Vec::new(),
        load_error: None,
        form: RouteForm::default(),
        modal_open: false,
        submitting: false,
        notice: None,
    }
}

pub fn update(msg: Msg, model: &mut Model, orders: &mut impl Orders<Msg>) {
    match msg {
        Msg::DataLoaded(Ok(data)) => {
            if let Some(map) = model.map.take() {
                model.planner = Some(RoutePlanner::new(map, data.pedidos));
            }
            model.trucks = data.caminhoes;
        }
        Msg::DataLoaded(Err(err)) => {
            web_sys::console::error_1(&format!("[frontend] planning data failed: {err}").into());
            model.load_error = Some(err);
        }
        Msg::ToggleDelivery(id) => {
            if let Some(planner) = model.planner.as_mut() {
                planner.toggle(id);
            }
        }
        Msg::OpenModal => model.modal_open = true,
        Msg::CloseModal => model.modal_open = false,
        Msg::TruckChanged(value) => model.form.truck_id = value,
        Msg::DateChanged(value) => model.form.date = value,
        Msg::KindChanged(value) => {
            model.form.kind = if value == RouteKind::Pendente.as_str() {
                RouteKind::Pendente
            } else {
                RouteKind::Normal
            };
        }
        Msg::TargetChanged(value) => model.form.target_kg = value,
        Msg::DeadlineChanged(value) => model.form.deadline = value,
        Msg::NotesChanged(value) => model.form.notes = value,
        Msg::Submit => {
            if model.submitting {
                return;
            }
            let Some(planner) = model.planner.as_ref() else {
                return;
            };
            match model.form.to_request(planner.selection()) {
                Ok(request) => {
                    model.submitting = true;
                    orders.perform_cmd(async move {
                        Msg::RouteCreated(api::create_route(request).await)
                    });
                }
                Err(err) => model.notice = Some(Notice::error("Erro: ", &err)),
            }
        }
        Msg::RouteCreated(result) => {
            model.submitting = false;
            match result {
                Ok(id) => {
                    web_sys::console::debug_1(&format!("[frontend] route {id} created").into());
                    model.modal_open = false;
                    model.notice = Some(Notice::info(format!("Rota #{id} criada com sucesso!")));
                    if let Err(err) = window().location().set_href("/rotas/") {
                        web_sys::console::error_1(&err);
                    }
                }
                Err(err) => model.notice = Some(Notice::error("Erro: ", &err)),
            }
        }
        Msg::DismissNotice => model.notice = None,
    }
}

pub fn view(model: &Model) -> Node<Msg> {
    let body = match (&model.planner, &model.load_error) {
        (_, Some(err)) => p![C!["geo-error"], format!("Falha ao carregar o planejamento: {err}")],
        (None, None) => p![C!["status-text"], "Carregando pedidos..."],
        (Some(planner), None) => div![
            view_delivery_table(planner),
            view_footer(planner),
            IF!(model.modal_open => view_modal(model)),
        ],
    };

    div![
        C!["planejamento-container"],
        view_notice(model.notice.as_ref(), || Msg::DismissNotice),
        body
    ]
}

fn view_delivery_table(planner: &RoutePlanner<LeafletMap>) -> Node<Msg> {
    table![
        C!["table", "pedidos-table"],
        thead![tr![th![""], th!["Pedido"], th!["Cliente"], th!["Cidade"], th!["Peso (kg)"]]],
        tbody![planner.deliveries().iter().map(|delivery| {
            let id = delivery.location.abs_entry;
            tr![
                td![input![
                    C!["pedido-checkbox"],
                    attrs! {
                        At::Type => "checkbox",
                        At::Value => id.to_string(),
                        At::Checked => bool_attr(planner.is_selected(id)),
                    },
                    ev(Ev::Change, move |_| Msg::ToggleDelivery(id)),
                ]],
                td![id.to_string()],
                td![delivery.location.card_name.as_str()],
                td![delivery.location.city.as_str()],
                td![format!("{:.2}", delivery.weight_kg)],
            ]
        })],
    ]
}

fn view_footer(planner: &RoutePlanner<LeafletMap>) -> Node<Msg> {
    let summary = planner.summary();
    div![
        id!("planejamento-footer"),
        IF!(summary.count == 0 => style! { St::Display => "none" }),
        span![id!("pedidos-selecionados-count"), summary.count.to_string()],
        " pedidos · ",
        span![id!("peso-total-selecionado"), summary.weight_label()],
        " kg",
        button![
            id!("btn-criar-rota"),
            C!["btn", "btn-primary"],
            "Criar Rota",
            ev(Ev::Click, |_| Msg::OpenModal),
        ],
    ]
}

fn view_modal(model: &Model) -> Node<Msg> {
    let form = &model.form;
    div![
        C!["modal", "show"],
        id!("modal-criar-rota"),
        div![
            C!["modal-content"],
            h3!["Nova Rota"],
            label!["Caminhão"],
            select![
                id!("caminhao-select"),
                option![attrs! { At::Value => "" }, "Selecione..."],
                model.trucks.iter().map(|truck| {
                    let value = truck.id.to_string();
                    option![
                        attrs! {
                            At::Value => value.as_str(),
                            At::Selected => bool_attr(form.truck_id == value),
                        },
                        format!("{} · {}", truck.plate, truck.driver),
                    ]
                }),
                input_ev(Ev::Change, Msg::TruckChanged),
            ],
            label!["Data da rota"],
            input![
                id!("data-rota"),
                attrs! { At::Type => "date", At::Value => form.date.as_str() },
                input_ev(Ev::Input, Msg::DateChanged),
            ],
            label!["Tipo"],
            select![
                id!("tipo-rota"),
                [RouteKind::Normal, RouteKind::Pendente].into_iter().map(|kind| {
                    option![
                        attrs! {
                            At::Value => kind.as_str(),
                            At::Selected => bool_attr(form.kind == kind),
                        },
                        kind.as_str(),
                    ]
                }),
                input_ev(Ev::Change, Msg::KindChanged),
            ],
            IF!(form.shows_pending_fields() => div![
                id!("campos-pendente"),
                label!["Meta (kg)"],
                input![
                    id!("meta-kg"),
                    attrs! { At::Value => form.target_kg.as_str(), At::from("inputmode") => "decimal" },
                    input_ev(Ev::Input, Msg::TargetChanged),
                ],
                label!["Data limite"],
                input![
                    id!("data-limite"),
                    attrs! { At::Type => "date", At::Value => form.deadline.as_str() },
                    input_ev(Ev::Input, Msg::DeadlineChanged),
                ],
            ]),
            label!["Observações"],
            textarea![
                id!("observacoes"),
                attrs! { At::Value => form.notes.as_str() },
                input_ev(Ev::Input, Msg::NotesChanged),
            ],
            div![
                C!["modal-actions"],
                button![
                    C!["btn"],
                    "Cancelar",
                    ev(Ev::Click, |_| Msg::CloseModal),
                ],
                button![
                    id!("btn-confirmar-rota"),
                    C!["btn", "btn-primary"],
                    if model.submitting { "Salvando..." } else { "Confirmar" },
                    attrs! { At::Disabled => bool_attr(model.submitting) },
                    ev(Ev::Click, |_| Msg::Submit),
                ],
            ],
        ],
    ]
}

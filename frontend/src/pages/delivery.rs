use seed::{prelude::*, *};
use shared::{AbsEntry, Coordinate, MapPageData, Region};

use super::{Notice, bool_attr, event_coordinate, view_notice};
use crate::api::{self, LookupOutcome};
use crate::delivery_map::{DeliveryItem, DeliveryMap};
use crate::edit::EditPhase;
use crate::error::UiError;
use crate::filters::FilterMode;
use crate::map::LeafletMap;
use crate::regions::RegionEditor;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tab {
    Map,
    Regions,
}

pub struct Model {
    page: Page,
    tab: Tab,
    notice: Option<Notice>,
    saving_regions: bool,
}

enum Page {
    Loading(Option<LeafletMap>),
    Failed(UiError),
    Ready(Box<Ready>),
}

struct Ready {
    deliveries: DeliveryMap<LeafletMap>,
    regions: RegionEditor,
}

pub enum Msg {
    DataLoaded(Result<MapPageData, UiError>),
    ShowTab(Tab),
    DismissNotice,
    FocusItem(AbsEntry),
    ToggleEdit(AbsEntry),
    CancelEdit,
    ToggleMapPlacing,
    EditLatChanged(String),
    EditLonChanged(String),
    SaveGeolocation,
    GeolocationSaved {
        id: AbsEntry,
        at: Coordinate,
        result: Result<(), UiError>,
    },
    FindOne(AbsEntry),
    FindAll,
    LookupFinished {
        id: AbsEntry,
        outcome: LookupOutcome,
    },
    MapClicked(Coordinate),
    DraftDragged(Coordinate),
    FilterModeToggled,
    ToggleFilter(String),
    SelectAllFilters,
    ClearFilters,
    RegionNameChanged(String),
    ToggleRegionCity(String),
    AddRegion,
    RemoveRegion(String),
    SaveRegions,
    RegionsSaved(Result<Vec<Region>, UiError>),
}

pub fn init(_: Url, orders: &mut impl Orders<Msg>) -> Model {
    orders.stream(streams::window_event(Ev::from("map-click"), |event| {
        let at = event_coordinate(event)?;
        web_sys::console::debug_1(
            &format!("[frontend] map click lat={:.5} lon={:.5}", at.lat, at.lon).into(),
        );
        Some(Msg::MapClicked(at))
    }));
    orders.stream(streams::window_event(
        Ev::from("draft-marker-drag"),
        |event| event_coordinate(event).map(Msg::DraftDragged),
    ));
    orders.perform_cmd(async { Msg::DataLoaded(api::load_map_page().await) });

    Model {
        page: Page::Loading(Some(LeafletMap::mount("map-render"))),
        tab: Tab::Map,
        notice: None,
        saving_regions: false,
    }
}

fn lookup(orders: &mut impl Orders<Msg>, id: AbsEntry) {
    orders.perform_cmd(async move {
        Msg::LookupFinished {
            id,
            outcome: api::lookup_geolocation(id).await,
        }
    });
}

pub fn update(msg: Msg, model: &mut Model, orders: &mut impl Orders<Msg>) {
    if let Msg::DataLoaded(result) = msg {
        model.page = match (result, std::mem::replace(&mut model.page, Page::Loading(None))) {
            (_, page @ Page::Ready(_)) => page,
            (Ok(data), Page::Loading(Some(map))) => {
                let regions = RegionEditor::new(data.regions.clone());
                Page::Ready(Box::new(Ready {
                    deliveries: DeliveryMap::new(map, data),
                    regions,
                }))
            }
            (Ok(_), _) => Page::Failed(UiError::Network),
            (Err(err), _) => {
                web_sys::console::error_1(&format!("[frontend] map data failed: {err}").into());
                Page::Failed(err)
            }
        };
        return;
    }
    let Page::Ready(ready) = &mut model.page else {
        return;
    };
    let ready = ready.as_mut();
    let deliveries = &mut ready.deliveries;

    match msg {
        Msg::DataLoaded(_) => {}
        Msg::ShowTab(tab) => {
            model.tab = tab;
            if tab == Tab::Map {
                deliveries.map().invalidate_size();
            }
        }
        Msg::DismissNotice => model.notice = None,
        Msg::FocusItem(id) => deliveries.focus(id),
        Msg::ToggleEdit(id) => deliveries.toggle_edit(id),
        Msg::CancelEdit => deliveries.cancel_edit(),
        Msg::ToggleMapPlacing => {
            deliveries.toggle_map_placing();
        }
        Msg::EditLatChanged(value) => deliveries.set_edit_lat(value),
        Msg::EditLonChanged(value) => deliveries.set_edit_lon(value),
        Msg::SaveGeolocation => match deliveries.begin_save() {
            Ok((id, at)) => {
                orders.perform_cmd(async move {
                    Msg::GeolocationSaved {
                        id,
                        at,
                        result: api::save_geolocation(id, at).await,
                    }
                });
            }
            Err(err) => model.notice = Some(Notice::error("Erro ao salvar: ", &err)),
        },
        Msg::GeolocationSaved { id, at, result } => match result {
            Ok(()) => {
                deliveries.geolocation_saved(id, at);
                model.notice = Some(Notice::info("Salvo com sucesso!"));
            }
            Err(err) => model.notice = Some(Notice::error("Erro ao salvar: ", &err)),
        },
        Msg::FindOne(id) => {
            if deliveries.begin_lookup(id) {
                lookup(orders, id);
            }
        }
        Msg::FindAll => {
            if let Some(id) = deliveries.start_find_all() {
                lookup(orders, id);
            }
        }
        Msg::LookupFinished { id, outcome } => {
            if let Some(next) = deliveries.finish_lookup(id, outcome) {
                lookup(orders, next);
            }
        }
        Msg::MapClicked(at) => {
            deliveries.map_clicked(at);
        }
        Msg::DraftDragged(at) => {
            deliveries.draft_dragged(at);
        }
        Msg::FilterModeToggled => {
            let mode = match deliveries.filters().mode() {
                FilterMode::Cities => FilterMode::Regions,
                FilterMode::Regions => FilterMode::Cities,
            };
            deliveries.set_filter_mode(mode);
        }
        Msg::ToggleFilter(name) => deliveries.toggle_filter(&name),
        Msg::SelectAllFilters => deliveries.select_all_filters(),
        Msg::ClearFilters => deliveries.clear_filters(),
        Msg::RegionNameChanged(name) => ready.regions.set_draft_name(name),
        Msg::ToggleRegionCity(city) => ready.regions.toggle_city(&city),
        Msg::AddRegion => {
            if let Err(err) = ready.regions.add_draft() {
                model.notice = Some(Notice::error("", &err));
            }
        }
        Msg::RemoveRegion(name) => {
            ready.regions.remove(&name);
        }
        Msg::SaveRegions => {
            if model.saving_regions {
                return;
            }
            model.saving_regions = true;
            let payload = ready.regions.save_payload();
            orders.perform_cmd(async move {
                let regions = payload.regioes.clone();
                Msg::RegionsSaved(api::save_regions(payload).await.map(|()| regions))
            });
        }
        Msg::RegionsSaved(result) => {
            model.saving_regions = false;
            match result {
                Ok(regions) => {
                    deliveries.regions_saved(regions);
                    model.notice = Some(Notice::info("Regiões salvas com sucesso!"));
                }
                Err(err) => {
                    model.notice = Some(Notice::error("Erro ao salvar as regiões: ", &err))
                }
            }
        }
    }
}

pub fn view(model: &Model) -> Node<Msg> {
    let body = match &model.page {
        Page::Loading(_) => p![C!["status-text"], "Carregando entregas..."],
        Page::Failed(err) => p![C!["geo-error"], format!("Falha ao carregar o mapa: {err}")],
        Page::Ready(ready) => div![
            view_tabs(model.tab),
            div![
                C!["tab-content", IF!(model.tab == Tab::Map => "active")],
                id!("mapa"),
                view_sidebar(&ready.deliveries),
            ],
            div![
                C!["tab-content", IF!(model.tab == Tab::Regions => "active")],
                id!("regioes"),
                view_regions(&ready.regions, ready.deliveries.cities(), model.saving_regions),
            ],
        ],
    };

    div![
        C!["app-container"],
        view_notice(model.notice.as_ref(), || Msg::DismissNotice),
        body
    ]
}

fn view_tabs(active: Tab) -> Node<Msg> {
    let tab = |tab: Tab, label: &str| {
        button![
            C!["tab-link", IF!(active == tab => "active")],
            label,
            ev(Ev::Click, move |_| Msg::ShowTab(tab)),
        ]
    };
    div![C!["tabs"], tab(Tab::Map, "Mapa"), tab(Tab::Regions, "Regiões")]
}

fn view_sidebar(deliveries: &DeliveryMap<LeafletMap>) -> Node<Msg> {
    let filters = deliveries.filters();
    let finding_all = deliveries.is_finding_all();

    div![
        id!("sidebar"),
        div![
            C!["filter-header"],
            label![
                input![
                    id!("filter-toggle"),
                    attrs! {
                        At::Type => "checkbox",
                        At::Checked => bool_attr(filters.mode() == FilterMode::Regions),
                    },
                    ev(Ev::Change, |_| Msg::FilterModeToggled),
                ],
                span![id!("filter-type-label"), filters.mode().label()],
            ],
            button![C!["btn", "btn-sm"], "Selecionar todos", ev(Ev::Click, |_| Msg::SelectAllFilters)],
            button![C!["btn", "btn-sm"], "Limpar", ev(Ev::Click, |_| Msg::ClearFilters)],
        ],
        div![
            id!("filter-container"),
            filters.buttons().iter().map(|button| {
                let name = button.name.clone();
                button![
                    C!["filter-btn", IF!(button.active => "active")],
                    attrs! {
                        At::Type => "button",
                        At::from("data-filter") => button.name.as_str(),
                        At::from("data-type") => filters.mode().kind(),
                        At::from("aria-pressed") => if button.active { "true" } else { "false" },
                    },
                    button.name.as_str(),
                    ev(Ev::Click, move |event| {
                        event.stop_propagation();
                        Msg::ToggleFilter(name)
                    }),
                ]
            }),
        ],
        button![
            id!("find-all-btn"),
            C!["btn"],
            if finding_all {
                "Buscando..."
            } else {
                "Buscar Geolocalizações Faltantes"
            },
            attrs! { At::Disabled => bool_attr(finding_all) },
            ev(Ev::Click, |_| Msg::FindAll),
        ],
        div![
            C!["pedido-list"],
            deliveries
                .items()
                .iter()
                .map(|item| view_item(item, deliveries)),
        ],
    ]
}

fn view_item(item: &DeliveryItem, deliveries: &DeliveryMap<LeafletMap>) -> Node<Msg> {
    let id = item.id();
    let location = &item.location;
    let editing = deliveries.editing() == Some(id);
    let coordinate_attr = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_else(|| "None".into());

    div![
        C!["pedido-item"],
        id!(format!("pedido-{id}")),
        attrs! {
            At::from("data-absentry") => id.to_string(),
            At::from("data-city") => location.city.as_str(),
            At::from("data-lat") => coordinate_attr(location.latitude),
            At::from("data-lon") => coordinate_attr(location.longitude),
        },
        IF!(!item.visible => style! { St::Display => "none" }),
        div![
            C!["pedido-header"],
            strong![location.card_name.as_str()],
            small![format!(" Pedido {id} · {}", location.city)],
            ev(Ev::Click, move |_| Msg::FocusItem(id)),
        ],
        div![
            C!["geo-status"],
            p![
                C![if item.geo_status.is_error() { "geo-error" } else { "status-text" }],
                item.geo_status.text(),
            ],
        ],
        div![
            C!["pedido-actions"],
            IF!(location.coordinate().is_none() && !item.find_button_hidden => button![
                C!["btn", "btn-sm", "btn-find-one"],
                "Buscar",
                ev(Ev::Click, move |event| {
                    event.stop_propagation();
                    Msg::FindOne(id)
                }),
            ]),
            button![
                C!["btn", "btn-sm", "btn-edit"],
                "Editar",
                ev(Ev::Click, move |event| {
                    event.stop_propagation();
                    Msg::ToggleEdit(id)
                }),
            ],
        ],
        if editing {
            view_edit_form(deliveries)
        } else {
            empty![]
        },
    ]
}

fn view_edit_form(deliveries: &DeliveryMap<LeafletMap>) -> Node<Msg> {
    let Some(form) = deliveries.edit_form() else {
        return empty![];
    };
    let placing = deliveries.edit_phase() == EditPhase::MapPlacing;
    let input_field = |placeholder: &str, value: &str, msg: fn(String) -> Msg| {
        input![
            attrs! {
                At::Placeholder => placeholder,
                At::Value => value,
                At::AutoComplete => "off",
                At::SpellCheck => "false",
            },
            input_ev(Ev::Input, msg),
        ]
    };

    div![
        C!["edit-form"],
        attrs! { At::from("aria-hidden") => "false" },
        ev(Ev::Click, |event| event.stop_propagation()),
        input_field("Latitude", &form.lat, Msg::EditLatChanged),
        input_field("Longitude", &form.lon, Msg::EditLonChanged),
        button![
            C!["btn", "btn-sm", "btn-mark-map", IF!(placing => "active")],
            if placing { "Clique no mapa..." } else { "Marcar no mapa" },
            ev(Ev::Click, |_| Msg::ToggleMapPlacing),
        ],
        button![
            C!["btn", "btn-sm", "btn-save-geo"],
            "Salvar",
            ev(Ev::Click, |_| Msg::SaveGeolocation),
        ],
        button![
            C!["btn", "btn-sm", "btn-cancel-edit"],
            "Cancelar",
            ev(Ev::Click, |_| Msg::CancelEdit),
        ],
    ]
}

fn view_regions(editor: &RegionEditor, cities: &[String], saving: bool) -> Node<Msg> {
    div![
        C!["regioes"],
        div![
            id!("regioes-list"),
            editor.regions().iter().map(|region| {
                let name = region.name.clone();
                div![
                    C!["regiao-item"],
                    h4![region.name.as_str()],
                    p![region.cities.join(", ")],
                    button![
                        C!["btn", "btn-danger", "btn-sm", "remove-regiao-btn"],
                        "Remover",
                        ev(Ev::Click, move |_| Msg::RemoveRegion(name)),
                    ],
                ]
            }),
        ],
        fieldset![
            legend!["Nova região"],
            input![
                id!("regiao-nome"),
                attrs! {
                    At::Placeholder => "Nome da região",
                    At::Value => editor.draft_name(),
                },
                input_ev(Ev::Input, Msg::RegionNameChanged),
            ],
            div![
                id!("cidades-toggle-container"),
                cities.iter().map(|city| {
                    let value = city.clone();
                    button![
                        C!["city-toggle-btn", IF!(editor.is_city_selected(city) => "active")],
                        attrs! { At::Type => "button", At::from("data-city") => city.as_str() },
                        city.as_str(),
                        ev(Ev::Click, move |_| Msg::ToggleRegionCity(value)),
                    ]
                }),
            ],
            button![
                id!("add-regiao-btn"),
                C!["btn"],
                "Adicionar região",
                ev(Ev::Click, |_| Msg::AddRegion),
            ],
        ],
        button![
            id!("save-regioes-btn"),
            C!["btn", "btn-primary"],
            "Salvar regiões",
            attrs! { At::Disabled => bool_attr(saving) },
            ev(Ev::Click, |_| Msg::SaveRegions),
        ],
    ]
}

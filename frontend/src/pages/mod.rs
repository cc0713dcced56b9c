pub mod delivery;
pub mod planner;

use seed::{prelude::*, virtual_dom::AtValue, *};
use serde::Deserialize;
use shared::Coordinate;

use crate::error::UiError;

fn bool_attr(value: bool) -> AtValue {
    if value {
        AtValue::Some("true".into())
    } else {
        AtValue::Ignored
    }
}

/// Banner replacing the browser alerts of the server-rendered pages.
#[derive(Debug, Clone, PartialEq)]
struct Notice {
    text: String,
    error: bool,
}

impl Notice {
    fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            error: false,
        }
    }

    fn error(prefix: &str, err: &UiError) -> Self {
        Self {
            text: format!("{prefix}{err}"),
            error: true,
        }
    }
}

fn view_notice<Ms: 'static>(notice: Option<&Notice>, dismiss: impl FnOnce() -> Ms + Clone + 'static) -> Node<Ms> {
    match notice {
        Some(notice) => div![
            C!["notice", IF!(notice.error => "notice-error")],
            span![notice.text.as_str()],
            button![
                C!["btn", "btn-sm"],
                "×",
                ev(Ev::Click, move |_| dismiss()),
            ],
        ],
        None => empty![],
    }
}

/// Payload of the `map-click` / `draft-marker-drag` window events.
#[derive(Deserialize)]
struct MapPointPayload {
    lat: f64,
    lon: f64,
}

fn event_coordinate(event: web_sys::Event) -> Option<Coordinate> {
    let event = event.dyn_into::<web_sys::CustomEvent>().ok()?;
    let payload: MapPointPayload = serde_wasm_bindgen::from_value(event.detail()).ok()?;
    Some(Coordinate {
        lat: payload.lat,
        lon: payload.lon,
    })
}

//! Browser client for the delivery map and route planning pages.
//!
//! The page logic (markers, filters, the geolocation edit flow, route selection)
//! is written against [`map::MapSurface`] and runs natively under test; only the
//! `pages` module and the Leaflet bindings touch the browser.

pub mod api;
pub mod delivery_map;
pub mod edit;
pub mod error;
pub mod filters;
pub mod logging;
pub mod map;
pub mod markers;
pub mod pages;
pub mod planner;
pub mod regions;
pub mod route_plan;

use seed::prelude::*;
use wasm_bindgen::prelude::wasm_bindgen;

/// Which page the host document asks for, from `<div id="app" data-page="...">`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    DeliveryMap,
    RoutePlanning,
}

impl PageKind {
    pub fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some("planejamento") => Self::RoutePlanning,
            _ => Self::DeliveryMap,
        }
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    logging::init();
    let attr = seed::document()
        .get_element_by_id("app")
        .and_then(|element| element.get_attribute("data-page"));
    match PageKind::from_attr(attr.as_deref()) {
        PageKind::DeliveryMap => {
            App::start("app", pages::delivery::init, pages::delivery::update, pages::delivery::view);
        }
        PageKind::RoutePlanning => {
            App::start("app", pages::planner::init, pages::planner::update, pages::planner::view);
        }
    }
}

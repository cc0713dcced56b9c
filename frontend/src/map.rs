use shared::{AbsEntry, Bounds, Coordinate};
use wasm_bindgen::prelude::wasm_bindgen;

pub const DEFAULT_CENTER: Coordinate = Coordinate {
    lat: -14.2350,
    lon: -51.9253,
};
pub const DEFAULT_ZOOM: u8 = 4;

/// Map widget seam. Everything the interaction core does to the map goes through here,
/// so the core can run against a fake in tests.
pub trait MapSurface {
    type Clicks: ClickSubscription;

    /// Creates a delivery marker and puts it on the map.
    fn add_marker(&mut self, id: AbsEntry, at: Coordinate, popup_html: &str);
    fn move_marker(&mut self, id: AbsEntry, at: Coordinate);
    fn attach_marker(&mut self, id: AbsEntry);
    fn detach_marker(&mut self, id: AbsEntry);
    fn open_popup(&mut self, id: AbsEntry);

    /// Creates the draggable draft marker, or moves it when it already exists.
    fn place_draft_marker(&mut self, at: Coordinate);
    fn remove_draft_marker(&mut self);

    fn fly_to(&mut self, at: Coordinate, zoom: u8);
    fn set_view(&mut self, at: Coordinate, zoom: u8);
    fn fit_bounds(&mut self, bounds: Bounds);

    /// Starts forwarding map clicks. Clicks stop once the returned handle is cancelled
    /// or dropped.
    fn listen_clicks(&mut self) -> Self::Clicks;
}

/// Handle to an installed map click listener.
///
/// `cancel` must be idempotent: cancelling twice removes the listener once.
pub trait ClickSubscription {
    fn cancel(&mut self);
    fn is_active(&self) -> bool;
}

#[wasm_bindgen(module = "/leaflet_map.js")]
extern "C" {
    #[wasm_bindgen(js_name = initMap)]
    fn init_map_js(element_id: &str, lat: f64, lon: f64, zoom: u8);
    #[wasm_bindgen(js_name = addMarker)]
    fn add_marker_js(id: f64, lat: f64, lon: f64, popup_html: &str);
    #[wasm_bindgen(js_name = moveMarker)]
    fn move_marker_js(id: f64, lat: f64, lon: f64);
    #[wasm_bindgen(js_name = attachMarker)]
    fn attach_marker_js(id: f64);
    #[wasm_bindgen(js_name = detachMarker)]
    fn detach_marker_js(id: f64);
    #[wasm_bindgen(js_name = openPopup)]
    fn open_popup_js(id: f64);
    #[wasm_bindgen(js_name = placeDraftMarker)]
    fn place_draft_marker_js(lat: f64, lon: f64);
    #[wasm_bindgen(js_name = removeDraftMarker)]
    fn remove_draft_marker_js();
    #[wasm_bindgen(js_name = flyTo)]
    fn fly_to_js(lat: f64, lon: f64, zoom: u8);
    #[wasm_bindgen(js_name = setView)]
    fn set_view_js(lat: f64, lon: f64, zoom: u8);
    #[wasm_bindgen(js_name = fitBounds)]
    fn fit_bounds_js(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64);
    #[wasm_bindgen(js_name = enableMapClicks)]
    fn enable_map_clicks_js();
    #[wasm_bindgen(js_name = disableMapClicks)]
    fn disable_map_clicks_js();
    #[wasm_bindgen(js_name = invalidateSize)]
    fn invalidate_size_js();
}

/// Leaflet map living in the host page, driven through `leaflet_map.js`.
///
/// Map clicks and draft marker drags come back as `map-click` and
/// `draft-marker-drag` window events.
pub struct LeafletMap {
    _private: (),
}

impl LeafletMap {
    pub fn mount(element_id: &str) -> Self {
        init_map_js(element_id, DEFAULT_CENTER.lat, DEFAULT_CENTER.lon, DEFAULT_ZOOM);
        Self { _private: () }
    }

    pub fn invalidate_size(&self) {
        invalidate_size_js();
    }
}

// Leaflet marker ids cross the JS boundary as numbers.
fn js_id(id: AbsEntry) -> f64 {
    id.0 as f64
}

impl MapSurface for LeafletMap {
    type Clicks = LeafletClicks;

    fn add_marker(&mut self, id: AbsEntry, at: Coordinate, popup_html: &str) {
        add_marker_js(js_id(id), at.lat, at.lon, popup_html);
    }

    fn move_marker(&mut self, id: AbsEntry, at: Coordinate) {
        move_marker_js(js_id(id), at.lat, at.lon);
    }

    fn attach_marker(&mut self, id: AbsEntry) {
        attach_marker_js(js_id(id));
    }

    fn detach_marker(&mut self, id: AbsEntry) {
        detach_marker_js(js_id(id));
    }

    fn open_popup(&mut self, id: AbsEntry) {
        open_popup_js(js_id(id));
    }

    fn place_draft_marker(&mut self, at: Coordinate) {
        place_draft_marker_js(at.lat, at.lon);
    }

    fn remove_draft_marker(&mut self) {
        remove_draft_marker_js();
    }

    fn fly_to(&mut self, at: Coordinate, zoom: u8) {
        fly_to_js(at.lat, at.lon, zoom);
    }

    fn set_view(&mut self, at: Coordinate, zoom: u8) {
        set_view_js(at.lat, at.lon, zoom);
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        fit_bounds_js(bounds.min_lat, bounds.min_lon, bounds.max_lat, bounds.max_lon);
    }

    fn listen_clicks(&mut self) -> LeafletClicks {
        enable_map_clicks_js();
        LeafletClicks { active: true }
    }
}

pub struct LeafletClicks {
    active: bool,
}

impl ClickSubscription for LeafletClicks {
    fn cancel(&mut self) {
        if self.active {
            disable_map_clicks_js();
            self.active = false;
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for LeafletClicks {
    fn drop(&mut self) {
        self.cancel();
    }
}

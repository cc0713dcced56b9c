use std::collections::VecDeque;

use shared::{AbsEntry, Bounds, Coordinate, DeliveryLocation, MapPageData, Region};

use crate::api::LookupOutcome;
use crate::edit::{EditController, EditPhase, GeoForm};
use crate::error::UiError;
use crate::filters::{FilterMode, FilterPanel, is_visible};
use crate::map::MapSurface;
use crate::markers::MarkerRegistry;

pub const FOCUS_ZOOM: u8 = 15;
pub const FIT_PADDING: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoStatus {
    Missing,
    Located,
    Searching,
    NotFound,
    SearchFailed,
    ConnectionFailed,
    Saved,
}

impl GeoStatus {
    pub fn text(self) -> &'static str {
        match self {
            Self::Missing => "Sem geolocalização.",
            Self::Located => "",
            Self::Searching => "Procurando geolocalização...",
            Self::NotFound => "Não encontrada.",
            Self::SearchFailed => "Erro na busca.",
            Self::ConnectionFailed => "Erro de conexão.",
            Self::Saved => "Geolocalização OK.",
        }
    }

    /// Items in these states are picked up by "find all missing".
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Self::Missing | Self::NotFound | Self::SearchFailed | Self::ConnectionFailed
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryItem {
    pub location: DeliveryLocation,
    pub geo_status: GeoStatus,
    pub visible: bool,
    pub lookup_in_flight: bool,
    pub find_button_hidden: bool,
}

impl DeliveryItem {
    fn new(location: DeliveryLocation) -> Self {
        let geo_status = if location.coordinate().is_some() {
            GeoStatus::Located
        } else {
            GeoStatus::Missing
        };
        Self {
            location,
            geo_status,
            visible: true,
            lookup_in_flight: false,
            find_button_hidden: false,
        }
    }

    pub fn id(&self) -> AbsEntry {
        self.location.abs_entry
    }
}

struct FindAll {
    current: Option<AbsEntry>,
    pending: VecDeque<AbsEntry>,
}

/// Everything the delivery map page mutates: the map itself, its markers, the sidebar
/// items, the filter panel and the edit controller.
pub struct DeliveryMap<M: MapSurface> {
    map: M,
    markers: MarkerRegistry,
    items: Vec<DeliveryItem>,
    cities: Vec<String>,
    regions: Vec<Region>,
    filters: FilterPanel,
    edit: EditController<M::Clicks>,
    find_all: Option<FindAll>,
}

impl<M: MapSurface> DeliveryMap<M> {
    pub fn new(mut map: M, data: MapPageData) -> Self {
        let mut markers = MarkerRegistry::new();
        let items: Vec<DeliveryItem> = data.locations.into_iter().map(DeliveryItem::new).collect();
        for item in &items {
            if let Some(at) = item.location.coordinate() {
                markers.upsert(&mut map, item.id(), at, &popup_html(&item.location));
            }
        }
        if let Some(bounds) = Bounds::enclosing(markers.iter().map(|(_, m)| m.position)) {
            map.fit_bounds(bounds.padded(FIT_PADDING));
        }

        let filters = FilterPanel::new(FilterMode::Cities, &data.cities, &data.regions);
        let mut context = Self {
            map,
            markers,
            items,
            cities: data.cities,
            regions: data.regions,
            filters,
            edit: EditController::new(),
            find_all: None,
        };
        context.apply_filters();
        context
    }

    pub fn items(&self) -> &[DeliveryItem] {
        &self.items
    }

    pub fn item(&self, id: AbsEntry) -> Option<&DeliveryItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    fn item_mut(&mut self, id: AbsEntry) -> Option<&mut DeliveryItem> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn filters(&self) -> &FilterPanel {
        &self.filters
    }

    pub fn markers(&self) -> &MarkerRegistry {
        &self.markers
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn edit_phase(&self) -> EditPhase {
        self.edit.phase()
    }

    pub fn editing(&self) -> Option<AbsEntry> {
        self.edit.editing()
    }

    pub fn edit_form(&self) -> Option<&GeoForm> {
        self.edit.form()
    }

    // --- edit mode ---

    pub fn toggle_edit(&mut self, id: AbsEntry) {
        let Some(existing) = self.item(id).map(|item| item.location.coordinate()) else {
            return;
        };
        self.edit.toggle(&mut self.map, id, existing);
    }

    pub fn cancel_edit(&mut self) {
        self.edit.close(&mut self.map);
    }

    pub fn toggle_map_placing(&mut self) -> EditPhase {
        self.edit.toggle_map_placing(&mut self.map)
    }

    pub fn map_clicked(&mut self, at: Coordinate) -> bool {
        self.edit.map_clicked(&mut self.map, at)
    }

    pub fn draft_dragged(&mut self, at: Coordinate) -> bool {
        self.edit.draft_dragged(at)
    }

    pub fn set_edit_lat(&mut self, value: String) {
        self.edit.set_lat_input(value);
    }

    pub fn set_edit_lon(&mut self, value: String) {
        self.edit.set_lon_input(value);
    }

    /// Coordinates to send for the open form.
    pub fn begin_save(&self) -> Result<(AbsEntry, Coordinate), UiError> {
        self.edit.pending_save()
    }

    /// A manual save succeeded: store the coordinates, place the marker, close the form.
    pub fn geolocation_saved(&mut self, id: AbsEntry, at: Coordinate) {
        self.apply_coordinates(id, at, GeoStatus::Saved);
        if self.edit.is_editing(id) {
            self.edit.close(&mut self.map);
        }
    }

    fn apply_coordinates(&mut self, id: AbsEntry, at: Coordinate, status: GeoStatus) {
        let Some(item) = self.item_mut(id) else {
            tracing::debug!(%id, "coordinates for unknown delivery ignored");
            return;
        };
        item.location.set_coordinate(at);
        item.geo_status = status;
        let visible = item.visible;
        let popup = popup_html(&item.location);

        self.markers.upsert(&mut self.map, id, at, &popup);
        self.markers.set_visible(&mut self.map, id, visible);
        self.map.fly_to(at, FOCUS_ZOOM);
    }

    // --- geocode lookups ---

    /// Marks a lookup as started. Returns false when the item is unknown or already
    /// being looked up.
    pub fn begin_lookup(&mut self, id: AbsEntry) -> bool {
        match self.item_mut(id) {
            Some(item) if !item.lookup_in_flight => {
                item.lookup_in_flight = true;
                item.find_button_hidden = true;
                item.geo_status = GeoStatus::Searching;
                true
            }
            _ => false,
        }
    }

    /// Applies a lookup result and returns the next queued id to look up, if the
    /// "find all" queue is running.
    ///
    /// Results always reach the item; an edit form is only closed when it belongs to
    /// the same item.
    pub fn finish_lookup(&mut self, id: AbsEntry, outcome: LookupOutcome) -> Option<AbsEntry> {
        if let Some(item) = self.item_mut(id) {
            item.lookup_in_flight = false;
            item.geo_status = match &outcome {
                LookupOutcome::Found(_) => GeoStatus::Saved,
                LookupOutcome::NotFound => GeoStatus::NotFound,
                LookupOutcome::Error(UiError::Network) => GeoStatus::ConnectionFailed,
                LookupOutcome::Error(_) => GeoStatus::SearchFailed,
            };
        }
        if let LookupOutcome::Found(at) = outcome {
            // the server persisted the hit before replying
            self.apply_coordinates(id, at, GeoStatus::Saved);
            if self.edit.is_editing(id) {
                self.edit.close(&mut self.map);
            }
        }

        let queued = matches!(&self.find_all, Some(queue) if queue.current == Some(id));
        if queued {
            self.advance_find_all()
        } else {
            None
        }
    }

    pub fn is_finding_all(&self) -> bool {
        self.find_all.is_some()
    }

    /// Queues every item whose geolocation is missing or failed and starts the first.
    pub fn start_find_all(&mut self) -> Option<AbsEntry> {
        if self.find_all.is_some() {
            return None;
        }
        let pending: VecDeque<AbsEntry> = self
            .items
            .iter()
            .filter(|item| item.geo_status.is_error() && !item.lookup_in_flight)
            .map(DeliveryItem::id)
            .collect();
        tracing::debug!(count = pending.len(), "find all missing geolocations");
        self.find_all = Some(FindAll {
            current: None,
            pending,
        });
        self.advance_find_all()
    }

    fn advance_find_all(&mut self) -> Option<AbsEntry> {
        loop {
            let queue = self.find_all.as_mut()?;
            let Some(id) = queue.pending.pop_front() else {
                self.find_all = None;
                return None;
            };
            if self.begin_lookup(id) {
                if let Some(queue) = self.find_all.as_mut() {
                    queue.current = Some(id);
                }
                return Some(id);
            }
        }
    }

    // --- sidebar ---

    /// Flies to a located item and opens its popup.
    pub fn focus(&mut self, id: AbsEntry) {
        let Some(at) = self.item(id).and_then(|item| item.location.coordinate()) else {
            return;
        };
        self.map.fly_to(at, FOCUS_ZOOM);
        if self.markers.contains(id) {
            self.map.open_popup(id);
        }
    }

    // --- filters ---

    pub fn set_filter_mode(&mut self, mode: FilterMode) {
        self.filters.set_mode(mode, &self.cities, &self.regions);
        self.apply_filters();
    }

    pub fn toggle_filter(&mut self, name: &str) {
        if self.filters.toggle(name).is_some() {
            self.apply_filters();
        }
    }

    pub fn select_all_filters(&mut self) {
        self.filters.select_all();
        self.apply_filters();
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.apply_filters();
    }

    /// The server confirmed a new region list.
    pub fn regions_saved(&mut self, regions: Vec<Region>) {
        self.regions = regions;
        self.filters.rebuild(&self.cities, &self.regions);
        self.apply_filters();
    }

    /// Reconciles item visibility and marker membership with the active filters, then
    /// frames the markers that remain on the map.
    pub fn apply_filters(&mut self) {
        let mode = self.filters.mode();
        let active = self.filters.active_tokens();
        for item in &mut self.items {
            item.visible = is_visible(mode, &active, &item.location.city, &self.regions);
            self.markers
                .set_visible(&mut self.map, item.location.abs_entry, item.visible);
        }

        let shown = self
            .items
            .iter()
            .filter(|item| item.visible)
            .filter_map(|item| self.markers.get(item.id()))
            .filter(|marker| marker.on_map)
            .map(|marker| marker.position);
        if let Some(bounds) = Bounds::enclosing(shown) {
            self.map.fit_bounds(bounds.padded(FIT_PADDING));
        }
    }
}

pub fn popup_html(location: &DeliveryLocation) -> String {
    format!(
        "<b>{name}</b><br>Pedido: {id}<br>Status: {status}<br>\
         <a href=\"/picking/{id}?source=mapa\" class=\"btn\">Ver Detalhes</a>",
        name = escape_html(&location.card_name),
        id = location.abs_entry,
        status = escape_html(&location.status),
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::fake::FakeMap;

    fn location(id: i64, city: &str, at: Option<(f64, f64)>) -> DeliveryLocation {
        DeliveryLocation {
            abs_entry: AbsEntry(id),
            card_name: format!("Cliente {id}"),
            status: "Pendente".into(),
            latitude: at.map(|(lat, _)| lat),
            longitude: at.map(|(_, lon)| lon),
            address: String::new(),
            city: city.into(),
        }
    }

    fn page() -> MapPageData {
        MapPageData {
            locations: vec![
                location(1, "Curitiba", Some((-25.4, -49.3))),
                location(2, "Recife", Some((-8.0, -34.9))),
                location(3, "Curitiba", None),
            ],
            cities: vec!["Curitiba".into(), "Recife".into()],
            regions: vec![Region {
                name: "Sul".into(),
                cities: vec!["Porto Alegre".into(), "Curitiba".into()],
            }],
        }
    }

    fn context() -> DeliveryMap<FakeMap> {
        DeliveryMap::new(FakeMap::default(), page())
    }

    #[test]
    fn startup_places_markers_and_frames_them() {
        let ctx = context();
        assert_eq!(ctx.markers().len(), 2);
        assert_eq!(ctx.map().markers.len(), 2);
        assert!(ctx.map().markers[&AbsEntry(1)].popup.contains("Cliente 1"));
        assert!(!ctx.map().fits.is_empty());
        assert_eq!(ctx.item(AbsEntry(3)).unwrap().geo_status, GeoStatus::Missing);
        assert!(ctx.items().iter().all(|item| item.visible));
    }

    #[test]
    fn region_filter_hides_items_and_markers() {
        let mut ctx = context();
        ctx.set_filter_mode(FilterMode::Regions);
        ctx.toggle_filter("Sul");

        assert!(ctx.item(AbsEntry(1)).unwrap().visible);
        assert!(!ctx.item(AbsEntry(2)).unwrap().visible);
        assert!(ctx.item(AbsEntry(3)).unwrap().visible);
        assert!(ctx.map().markers[&AbsEntry(1)].on_map);
        assert!(!ctx.map().markers[&AbsEntry(2)].on_map);

        let last_fit = *ctx.map().fits.last().unwrap();
        assert_eq!(last_fit, Bounds::enclosing([Coordinate::new(-25.4, -49.3)]).unwrap());
    }

    #[test]
    fn unknown_filter_names_are_ignored() {
        let mut ctx = context();
        // "Sul" is not a city button, so nothing is toggled
        ctx.toggle_filter("Sul");
        assert!(ctx.items().iter().all(|item| item.visible));

        ctx.toggle_filter("Recife");
        let fits_before = ctx.map().fits.len();
        ctx.toggle_filter("Recife");
        ctx.toggle_filter("Curitiba");
        assert!(!ctx.item(AbsEntry(2)).unwrap().visible);
        assert!(ctx.map().fits.len() > fits_before);
    }

    #[test]
    fn empty_visible_set_leaves_the_view() {
        let mut ctx = DeliveryMap::new(
            FakeMap::default(),
            MapPageData {
                locations: vec![location(3, "Curitiba", None)],
                cities: vec!["Curitiba".into()],
                regions: vec![],
            },
        );
        ctx.select_all_filters();
        assert!(ctx.map().fits.is_empty());
    }

    #[test]
    fn mode_switch_resets_selection() {
        let mut ctx = context();
        ctx.toggle_filter("Recife");
        assert!(!ctx.item(AbsEntry(1)).unwrap().visible);

        ctx.set_filter_mode(FilterMode::Regions);
        assert!(ctx.filters().active_tokens().is_empty());
        assert!(ctx.items().iter().all(|item| item.visible));
        assert!(ctx.map().markers.values().all(|m| m.on_map));
    }

    #[test]
    fn saving_geolocation_updates_item_marker_and_closes_form() {
        let mut ctx = context();
        ctx.toggle_edit(AbsEntry(3));
        ctx.toggle_map_placing();
        assert!(ctx.map_clicked(Coordinate::new(-23.4, -46.5)));
        ctx.set_edit_lat("-23.5".into());
        ctx.set_edit_lon("-46.6".into());

        let (id, at) = ctx.begin_save().unwrap();
        assert_eq!((id, at), (AbsEntry(3), Coordinate::new(-23.5, -46.6)));
        ctx.geolocation_saved(id, at);

        let item = ctx.item(AbsEntry(3)).unwrap();
        assert_eq!(item.location.latitude, Some(-23.5));
        assert_eq!(item.location.longitude, Some(-46.6));
        assert_eq!(item.geo_status, GeoStatus::Saved);
        assert_eq!(ctx.map().markers[&AbsEntry(3)].position, at);
        assert_eq!(ctx.map().flights.last(), Some(&(at, FOCUS_ZOOM)));
        assert_eq!(ctx.map().draft, None);
        assert_eq!(ctx.map().listeners(), 0);
        assert_eq!(ctx.edit_phase(), EditPhase::Closed);
    }

    #[test]
    fn saving_relocates_existing_marker() {
        let mut ctx = context();
        ctx.toggle_edit(AbsEntry(1));
        ctx.geolocation_saved(AbsEntry(1), Coordinate::new(-25.5, -49.2));
        assert_eq!(ctx.markers().len(), 2);
        assert_eq!(
            ctx.markers().get(AbsEntry(1)).unwrap().position,
            Coordinate::new(-25.5, -49.2)
        );
    }

    #[test]
    fn reopening_edit_seeds_draft_at_saved_zero_latitude() {
        let mut ctx = context();
        let at = Coordinate::new(0.0, -51.07);
        ctx.geolocation_saved(AbsEntry(1), at);
        assert_eq!(ctx.item(AbsEntry(1)).unwrap().location.coordinate(), Some(at));

        ctx.toggle_edit(AbsEntry(1));
        assert_eq!(ctx.map().draft, Some(at));
        assert_eq!(
            ctx.edit_form(),
            Some(&GeoForm {
                lat: "0.000000".into(),
                lon: "-51.070000".into(),
            })
        );
    }

    #[test]
    fn lookup_outcomes_set_status() {
        let mut ctx = context();
        assert!(ctx.begin_lookup(AbsEntry(3)));
        assert!(!ctx.begin_lookup(AbsEntry(3)));
        assert_eq!(ctx.item(AbsEntry(3)).unwrap().geo_status, GeoStatus::Searching);

        ctx.finish_lookup(AbsEntry(3), LookupOutcome::Error(UiError::Network));
        assert_eq!(
            ctx.item(AbsEntry(3)).unwrap().geo_status,
            GeoStatus::ConnectionFailed
        );

        ctx.begin_lookup(AbsEntry(3));
        ctx.finish_lookup(AbsEntry(3), LookupOutcome::NotFound);
        assert_eq!(ctx.item(AbsEntry(3)).unwrap().geo_status, GeoStatus::NotFound);

        ctx.begin_lookup(AbsEntry(3));
        ctx.finish_lookup(AbsEntry(3), LookupOutcome::Found(Coordinate::new(-25.0, -49.0)));
        let item = ctx.item(AbsEntry(3)).unwrap();
        assert_eq!(item.geo_status, GeoStatus::Saved);
        assert_eq!(item.geo_status.text(), "Geolocalização OK.");
        assert!(ctx.markers().contains(AbsEntry(3)));
    }

    #[test]
    fn late_lookup_leaves_other_edit_form_alone() {
        let mut ctx = context();
        ctx.begin_lookup(AbsEntry(3));
        ctx.toggle_edit(AbsEntry(1));

        ctx.finish_lookup(AbsEntry(3), LookupOutcome::Found(Coordinate::new(-25.0, -49.0)));

        assert_eq!(ctx.editing(), Some(AbsEntry(1)));
        assert_eq!(ctx.map().draft, Some(Coordinate::new(-25.4, -49.3)));
    }

    #[test]
    fn find_all_runs_sequentially_over_failed_items() {
        let mut ctx = DeliveryMap::new(
            FakeMap::default(),
            MapPageData {
                locations: vec![
                    location(1, "A", None),
                    location(2, "A", Some((-1.0, -1.0))),
                    location(3, "A", None),
                ],
                cities: vec!["A".into()],
                regions: vec![],
            },
        );

        assert_eq!(ctx.start_find_all(), Some(AbsEntry(1)));
        assert!(ctx.is_finding_all());
        assert_eq!(ctx.start_find_all(), None);

        let next = ctx.finish_lookup(AbsEntry(1), LookupOutcome::NotFound);
        assert_eq!(next, Some(AbsEntry(3)));
        let next = ctx.finish_lookup(AbsEntry(3), LookupOutcome::Found(Coordinate::new(-2.0, -2.0)));
        assert_eq!(next, None);
        assert!(!ctx.is_finding_all());
    }

    #[test]
    fn focus_opens_popup_for_located_items_only() {
        let mut ctx = context();
        ctx.focus(AbsEntry(3));
        assert!(ctx.map().popups_opened.is_empty());
        ctx.focus(AbsEntry(2));
        assert_eq!(ctx.map().popups_opened, vec![AbsEntry(2)]);
    }

    #[test]
    fn saved_regions_rebuild_region_buttons() {
        let mut ctx = context();
        ctx.set_filter_mode(FilterMode::Regions);
        ctx.toggle_filter("Sul");
        ctx.regions_saved(vec![Region {
            name: "Nordeste".into(),
            cities: vec!["Recife".into()],
        }]);
        let names: Vec<_> = ctx.filters().buttons().iter().map(|b| b.name.clone()).collect();
        assert_eq!(names, vec!["Nordeste".to_string()]);
        assert!(ctx.items().iter().all(|item| item.visible));
    }

    #[test]
    fn popup_escapes_names() {
        let mut loc = location(5, "A", None);
        loc.card_name = "A & <B>".into();
        assert!(popup_html(&loc).contains("A &amp; &lt;B&gt;"));
    }
}

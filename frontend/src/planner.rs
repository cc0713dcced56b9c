use shared::{AbsEntry, Bounds, PlannedDelivery};

use crate::delivery_map::popup_html;
use crate::map::{DEFAULT_CENTER, DEFAULT_ZOOM, MapSurface};
use crate::markers::MarkerRegistry;
use crate::route_plan::{RouteSelection, SelectionSummary};

pub const SELECTION_PADDING: f64 = 0.1;

/// Route planning map: only the selected deliveries have their marker on the map.
pub struct RoutePlanner<M: MapSurface> {
    map: M,
    markers: MarkerRegistry,
    deliveries: Vec<PlannedDelivery>,
    selection: RouteSelection,
}

impl<M: MapSurface> RoutePlanner<M> {
    pub fn new(mut map: M, deliveries: Vec<PlannedDelivery>) -> Self {
        let mut markers = MarkerRegistry::new();
        for delivery in &deliveries {
            if let Some(at) = delivery.location.coordinate() {
                let id = delivery.location.abs_entry;
                markers.upsert(&mut map, id, at, &popup_html(&delivery.location));
                markers.hide(&mut map, id);
            }
        }
        Self {
            map,
            markers,
            deliveries,
            selection: RouteSelection::new(),
        }
    }

    pub fn deliveries(&self) -> &[PlannedDelivery] {
        &self.deliveries
    }

    pub fn selection(&self) -> &RouteSelection {
        &self.selection
    }

    pub fn summary(&self) -> SelectionSummary {
        self.selection.summary()
    }

    pub fn is_selected(&self, id: AbsEntry) -> bool {
        self.selection.contains(id)
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    /// Checkbox change for `id`.
    pub fn toggle(&mut self, id: AbsEntry) {
        let Some(delivery) = self.deliveries.iter().find(|d| d.location.abs_entry == id) else {
            return;
        };
        let selected = !self.selection.contains(id);
        self.selection
            .toggle(id, &delivery.location.card_name, delivery.weight_kg, selected);
        tracing::debug!(%id, selected, count = self.selection.stops().len(), "route selection changed");
        self.sync_markers();
    }

    fn sync_markers(&mut self) {
        let ids: Vec<AbsEntry> = self.markers.iter().map(|(id, _)| id).collect();
        for id in ids {
            let selected = self.selection.contains(id);
            self.markers.set_visible(&mut self.map, id, selected);
        }

        let selected = self
            .selection
            .stops()
            .iter()
            .filter_map(|stop| self.markers.get(stop.abs_entry))
            .map(|marker| marker.position);
        match Bounds::enclosing(selected) {
            Some(bounds) => self.map.fit_bounds(bounds.padded(SELECTION_PADDING)),
            None if !self.deliveries.is_empty() => self.map.set_view(DEFAULT_CENTER, DEFAULT_ZOOM),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use shared::{Coordinate, DeliveryLocation};

    use super::*;
    use crate::map::fake::FakeMap;

    fn delivery(id: i64, weight: f64, at: Option<(f64, f64)>) -> PlannedDelivery {
        PlannedDelivery {
            location: DeliveryLocation {
                abs_entry: AbsEntry(id),
                card_name: format!("Cliente {id}"),
                status: "Pendente".into(),
                latitude: at.map(|(lat, _)| lat),
                longitude: at.map(|(_, lon)| lon),
                address: String::new(),
                city: "Curitiba".into(),
            },
            weight_kg: weight,
        }
    }

    fn planner() -> RoutePlanner<FakeMap> {
        RoutePlanner::new(
            FakeMap::default(),
            vec![
                delivery(1, 100.0, Some((-25.0, -49.0))),
                delivery(2, 50.5, Some((-26.0, -48.0))),
                delivery(3, 10.0, None),
            ],
        )
    }

    #[test]
    fn markers_start_off_the_map() {
        let planner = planner();
        assert_eq!(planner.map().markers.len(), 2);
        assert!(planner.map().markers.values().all(|m| !m.on_map));
    }

    #[test]
    fn selecting_shows_marker_and_frames_selection() {
        let mut planner = planner();
        planner.toggle(AbsEntry(1));
        planner.toggle(AbsEntry(3));

        assert!(planner.map().markers[&AbsEntry(1)].on_map);
        assert!(!planner.map().markers[&AbsEntry(2)].on_map);
        assert_eq!(
            planner.map().fits.last(),
            Some(&Bounds::enclosing([Coordinate::new(-25.0, -49.0)]).unwrap())
        );
        let summary = planner.summary();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.weight_label(), "110.00");
    }

    #[test]
    fn clearing_selection_resets_the_view() {
        let mut planner = planner();
        planner.toggle(AbsEntry(2));
        planner.toggle(AbsEntry(2));
        assert!(planner.selection().is_empty());
        assert_eq!(planner.map().views.last(), Some(&(DEFAULT_CENTER, DEFAULT_ZOOM)));
        assert!(planner.map().markers.values().all(|m| !m.on_map));
    }

    #[test]
    fn unknown_delivery_is_ignored() {
        let mut planner = planner();
        planner.toggle(AbsEntry(99));
        assert!(planner.selection().is_empty());
    }
}

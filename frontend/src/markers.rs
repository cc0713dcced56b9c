use std::collections::BTreeMap;

use shared::{AbsEntry, Coordinate};

use crate::map::MapSurface;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerState {
    pub position: Coordinate,
    pub on_map: bool,
}

/// One marker per delivery, keyed by its id.
///
/// Hiding only takes a marker off the map; its position is kept.
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    entries: BTreeMap<AbsEntry, MarkerState>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the marker (on the map) or relocates the existing one.
    pub fn upsert<M: MapSurface>(
        &mut self,
        map: &mut M,
        id: AbsEntry,
        at: Coordinate,
        popup_html: &str,
    ) -> MarkerState {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.position = at;
                map.move_marker(id, at);
                *entry
            }
            None => {
                map.add_marker(id, at, popup_html);
                let entry = MarkerState {
                    position: at,
                    on_map: true,
                };
                self.entries.insert(id, entry);
                entry
            }
        }
    }

    pub fn get(&self, id: AbsEntry) -> Option<MarkerState> {
        self.entries.get(&id).copied()
    }

    pub fn contains(&self, id: AbsEntry) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn show<M: MapSurface>(&mut self, map: &mut M, id: AbsEntry) {
        if let Some(entry) = self.entries.get_mut(&id) {
            if !entry.on_map {
                map.attach_marker(id);
                entry.on_map = true;
            }
        }
    }

    pub fn hide<M: MapSurface>(&mut self, map: &mut M, id: AbsEntry) {
        if let Some(entry) = self.entries.get_mut(&id) {
            if entry.on_map {
                map.detach_marker(id);
                entry.on_map = false;
            }
        }
    }

    pub fn set_visible<M: MapSurface>(&mut self, map: &mut M, id: AbsEntry, visible: bool) {
        if visible {
            self.show(map, id);
        } else {
            self.hide(map, id);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (AbsEntry, MarkerState)> + '_ {
        self.entries.iter().map(|(id, state)| (*id, *state))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

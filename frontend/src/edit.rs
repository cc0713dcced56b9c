use shared::{AbsEntry, Coordinate};

use crate::error::UiError;
use crate::map::{ClickSubscription, MapSurface};

/// Zoom used when an edit form opens on an already located delivery.
pub const EDIT_ZOOM: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    Closed,
    FormOpen,
    MapPlacing,
}

/// Latitude/longitude inputs of the edit form, kept as typed text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoForm {
    pub lat: String,
    pub lon: String,
}

impl GeoForm {
    fn from_coordinate(at: Coordinate) -> Self {
        let mut form = Self::default();
        form.fill(at);
        form
    }

    fn fill(&mut self, at: Coordinate) {
        self.lat = format_input(at.lat);
        self.lon = format_input(at.lon);
    }

    pub fn to_coordinate(&self) -> Result<Coordinate, UiError> {
        let lat = parse_input(&self.lat, 90.0)?;
        let lon = parse_input(&self.lon, 180.0)?;
        Ok(Coordinate { lat, lon })
    }
}

fn parse_input(text: &str, limit: f64) -> Result<f64, UiError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(UiError::validation("Dados incompletos."));
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value.abs() <= limit => Ok(value),
        _ => Err(UiError::validation("Valores inválidos.")),
    }
}

pub fn format_input(value: f64) -> String {
    format!("{value:.6}")
}

struct OpenEdit<S> {
    item: AbsEntry,
    form: GeoForm,
    draft: Option<Coordinate>,
    clicks: Option<S>,
}

enum EditState<S> {
    Closed,
    Open(OpenEdit<S>),
}

/// Manual geolocation editing.
///
/// Owns the only draft marker and the only map click subscription. Opening a form
/// always closes the previous one first, so at most one form, one draft marker and one
/// click listener exist at any time.
pub struct EditController<S> {
    state: EditState<S>,
}

impl<S> Default for EditController<S> {
    fn default() -> Self {
        Self {
            state: EditState::Closed,
        }
    }
}

impl<S: ClickSubscription> EditController<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> EditPhase {
        match &self.state {
            EditState::Closed => EditPhase::Closed,
            EditState::Open(open) if open.clicks.is_some() => EditPhase::MapPlacing,
            EditState::Open(_) => EditPhase::FormOpen,
        }
    }

    pub fn editing(&self) -> Option<AbsEntry> {
        match &self.state {
            EditState::Open(open) => Some(open.item),
            EditState::Closed => None,
        }
    }

    pub fn is_editing(&self, item: AbsEntry) -> bool {
        self.editing() == Some(item)
    }

    pub fn form(&self) -> Option<&GeoForm> {
        match &self.state {
            EditState::Open(open) => Some(&open.form),
            EditState::Closed => None,
        }
    }

    pub fn draft(&self) -> Option<Coordinate> {
        match &self.state {
            EditState::Open(open) => open.draft,
            EditState::Closed => None,
        }
    }

    /// Opens the form for `item`, closing whatever form was open before. An item that
    /// already has coordinates seeds the draft marker there and the map flies to it.
    pub fn open<M>(&mut self, map: &mut M, item: AbsEntry, existing: Option<Coordinate>)
    where
        M: MapSurface<Clicks = S>,
    {
        self.close(map);

        let form = match existing {
            Some(at) => {
                map.place_draft_marker(at);
                map.fly_to(at, EDIT_ZOOM);
                GeoForm::from_coordinate(at)
            }
            None => GeoForm::default(),
        };
        tracing::debug!(%item, seeded = existing.is_some(), "edit form opened");
        self.state = EditState::Open(OpenEdit {
            item,
            form,
            draft: existing,
            clicks: None,
        });
    }

    /// Edit button: closes the form when it belongs to `item`, otherwise opens it.
    pub fn toggle<M>(&mut self, map: &mut M, item: AbsEntry, existing: Option<Coordinate>)
    where
        M: MapSurface<Clicks = S>,
    {
        if self.is_editing(item) {
            self.close(map);
        } else {
            self.open(map, item, existing);
        }
    }

    /// "Mark on map" toggle. The draft marker stays where it is when placing stops.
    pub fn toggle_map_placing<M>(&mut self, map: &mut M) -> EditPhase
    where
        M: MapSurface<Clicks = S>,
    {
        if let EditState::Open(open) = &mut self.state {
            match open.clicks.take() {
                Some(mut clicks) => clicks.cancel(),
                None => open.clicks = Some(map.listen_clicks()),
            }
        }
        self.phase()
    }

    /// Map click while placing: creates or moves the draft marker and fills the inputs.
    /// Returns false when the click was not consumed.
    pub fn map_clicked<M>(&mut self, map: &mut M, at: Coordinate) -> bool
    where
        M: MapSurface<Clicks = S>,
    {
        match &mut self.state {
            EditState::Open(open) if open.clicks.as_ref().is_some_and(|c| c.is_active()) => {
                map.place_draft_marker(at);
                open.draft = Some(at);
                open.form.fill(at);
                true
            }
            _ => false,
        }
    }

    /// The draft marker was dragged on the map; mirror its position into the inputs.
    pub fn draft_dragged(&mut self, at: Coordinate) -> bool {
        match &mut self.state {
            EditState::Open(open) if open.draft.is_some() => {
                open.draft = Some(at);
                open.form.fill(at);
                true
            }
            _ => false,
        }
    }

    pub fn set_lat_input(&mut self, value: String) {
        if let EditState::Open(open) = &mut self.state {
            open.form.lat = value;
        }
    }

    pub fn set_lon_input(&mut self, value: String) {
        if let EditState::Open(open) = &mut self.state {
            open.form.lon = value;
        }
    }

    /// Item and coordinates to hand to the save call.
    pub fn pending_save(&self) -> Result<(AbsEntry, Coordinate), UiError> {
        match &self.state {
            EditState::Open(open) => Ok((open.item, open.form.to_coordinate()?)),
            EditState::Closed => Err(UiError::validation("Nenhum pedido em edição.")),
        }
    }

    /// Cancels the click listener, removes the draft marker and hides the form.
    pub fn close<M>(&mut self, map: &mut M)
    where
        M: MapSurface<Clicks = S>,
    {
        if let EditState::Open(mut open) = std::mem::replace(&mut self.state, EditState::Closed) {
            if let Some(mut clicks) = open.clicks.take() {
                clicks.cancel();
            }
            if open.draft.is_some() {
                map.remove_draft_marker();
            }
            tracing::debug!(item = %open.item, "edit form closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::fake::{FakeClicks, FakeMap};

    const A: AbsEntry = AbsEntry(10);
    const B: AbsEntry = AbsEntry(20);

    fn controller() -> EditController<FakeClicks> {
        EditController::new()
    }

    #[test]
    fn opening_with_coordinates_seeds_the_draft() {
        let mut map = FakeMap::default();
        let mut edit = controller();
        let at = Coordinate::new(-23.5, -46.6);

        edit.open(&mut map, A, Some(at));

        assert_eq!(edit.phase(), EditPhase::FormOpen);
        assert_eq!(edit.draft(), Some(at));
        assert_eq!(map.draft, Some(at));
        assert_eq!(map.flights, vec![(at, EDIT_ZOOM)]);
        let form = edit.form().unwrap();
        assert_eq!(form.lat, "-23.500000");
        assert_eq!(form.lon, "-46.600000");
    }

    #[test]
    fn opening_without_coordinates_waits_for_a_click() {
        let mut map = FakeMap::default();
        let mut edit = controller();

        edit.open(&mut map, A, None);
        assert_eq!(edit.draft(), None);
        assert_eq!(map.draft, None);
        assert_eq!(edit.form(), Some(&GeoForm::default()));

        // clicks are ignored until placing is switched on
        assert!(!edit.map_clicked(&mut map, Coordinate::new(-1.0, -2.0)));
        assert_eq!(map.draft, None);

        assert_eq!(edit.toggle_map_placing(&mut map), EditPhase::MapPlacing);
        assert!(edit.map_clicked(&mut map, Coordinate::new(-1.0, -2.0)));
        assert!(edit.map_clicked(&mut map, Coordinate::new(-3.0, -4.0)));
        assert_eq!(map.draft, Some(Coordinate::new(-3.0, -4.0)));
        assert_eq!(edit.form().unwrap().lat, "-3.000000");
    }

    #[test]
    fn toggling_placing_off_keeps_the_draft() {
        let mut map = FakeMap::default();
        let mut edit = controller();
        edit.open(&mut map, A, None);
        edit.toggle_map_placing(&mut map);
        edit.map_clicked(&mut map, Coordinate::new(-5.0, -6.0));

        assert_eq!(edit.toggle_map_placing(&mut map), EditPhase::FormOpen);
        assert_eq!(map.listeners(), 0);
        assert_eq!(map.draft, Some(Coordinate::new(-5.0, -6.0)));
        assert!(!edit.map_clicked(&mut map, Coordinate::new(0.5, 0.5)));
    }

    #[test]
    fn dragging_writes_back_into_the_inputs() {
        let mut map = FakeMap::default();
        let mut edit = controller();
        edit.open(&mut map, A, Some(Coordinate::new(-23.0, -46.0)));

        assert!(edit.draft_dragged(Coordinate::new(-23.25, -46.125)));
        let form = edit.form().unwrap();
        assert_eq!(form.lat, "-23.250000");
        assert_eq!(form.lon, "-46.125000");
    }

    #[test]
    fn opening_another_item_closes_the_first() {
        let mut map = FakeMap::default();
        let mut edit = controller();
        edit.open(&mut map, A, Some(Coordinate::new(-23.0, -46.0)));
        edit.toggle_map_placing(&mut map);
        assert_eq!(map.listeners(), 1);

        edit.open(&mut map, B, None);

        assert_eq!(edit.editing(), Some(B));
        assert_eq!(edit.phase(), EditPhase::FormOpen);
        assert_eq!(map.listeners(), 0);
        assert_eq!(map.draft, None);
    }

    #[test]
    fn edit_button_toggles_the_same_item() {
        let mut map = FakeMap::default();
        let mut edit = controller();
        edit.toggle(&mut map, A, None);
        assert!(edit.is_editing(A));
        edit.toggle(&mut map, A, None);
        assert_eq!(edit.phase(), EditPhase::Closed);
    }

    #[test]
    fn pending_save_validates_inputs() {
        let mut map = FakeMap::default();
        let mut edit = controller();
        assert!(edit.pending_save().is_err());

        edit.open(&mut map, A, None);
        assert_eq!(
            edit.pending_save(),
            Err(UiError::validation("Dados incompletos."))
        );
        edit.set_lat_input("abc".into());
        edit.set_lon_input("-46.6".into());
        assert_eq!(
            edit.pending_save(),
            Err(UiError::validation("Valores inválidos."))
        );
        edit.set_lat_input(" -23.5 ".into());
        assert_eq!(
            edit.pending_save(),
            Ok((A, Coordinate::new(-23.5, -46.6)))
        );
        edit.set_lat_input("0".into());
        assert_eq!(edit.pending_save(), Ok((A, Coordinate::new(0.0, -46.6))));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Action {
            Open(i64, bool),
            Toggle(i64),
            Placing,
            Click(f64, f64),
            Drag(f64, f64),
            Close,
        }

        fn action() -> impl Strategy<Value = Action> {
            prop_oneof![
                (0i64..4, any::<bool>()).prop_map(|(id, located)| Action::Open(id, located)),
                (0i64..4).prop_map(Action::Toggle),
                Just(Action::Placing),
                (-80.0..80.0, -170.0..170.0).prop_map(|(lat, lon)| Action::Click(lat, lon)),
                (-80.0..80.0, -170.0..170.0).prop_map(|(lat, lon)| Action::Drag(lat, lon)),
                Just(Action::Close),
            ]
        }

        proptest! {
            #[test]
            fn prop_at_most_one_listener_and_draft_tracks_state(
                actions in prop::collection::vec(action(), 1..60)
            ) {
                let mut map = FakeMap::default();
                let mut edit = controller();
                let seed = Coordinate::new(-10.0, -50.0);

                for action in actions {
                    match action {
                        Action::Open(id, located) => {
                            edit.open(&mut map, AbsEntry(id), located.then_some(seed))
                        }
                        Action::Toggle(id) => edit.toggle(&mut map, AbsEntry(id), None),
                        Action::Placing => {
                            edit.toggle_map_placing(&mut map);
                        }
                        Action::Click(lat, lon) => {
                            edit.map_clicked(&mut map, Coordinate::new(lat, lon));
                        }
                        Action::Drag(lat, lon) => {
                            if edit.draft_dragged(Coordinate::new(lat, lon)) {
                                map.place_draft_marker(Coordinate::new(lat, lon));
                            }
                        }
                        Action::Close => edit.close(&mut map),
                    }

                    prop_assert!(map.listeners() <= 1);
                    prop_assert_eq!(map.listeners() == 1, edit.phase() == EditPhase::MapPlacing);
                    prop_assert_eq!(map.draft, edit.draft());
                    if edit.phase() == EditPhase::Closed {
                        prop_assert!(edit.form().is_none());
                    }
                }
            }
        }
    }
}

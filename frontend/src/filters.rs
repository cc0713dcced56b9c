use std::collections::HashSet;

use shared::Region;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Cities,
    Regions,
}

impl FilterMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Cities => "Cidades",
            Self::Regions => "Regiões",
        }
    }

    pub fn kind(self) -> &'static str {
        match self {
            Self::Cities => "cidade",
            Self::Regions => "regiao",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterButton {
    pub name: String,
    pub active: bool,
}

/// Filter buttons for the current mode and which of them are pressed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPanel {
    mode: FilterMode,
    buttons: Vec<FilterButton>,
}

impl FilterPanel {
    pub fn new(mode: FilterMode, cities: &[String], regions: &[Region]) -> Self {
        let mut panel = Self {
            mode,
            buttons: Vec::new(),
        };
        panel.rebuild(cities, regions);
        panel
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn buttons(&self) -> &[FilterButton] {
        &self.buttons
    }

    /// Switching mode discards every active selection.
    pub fn set_mode(&mut self, mode: FilterMode, cities: &[String], regions: &[Region]) {
        self.mode = mode;
        self.rebuild(cities, regions);
    }

    /// Regenerates the buttons from the current mode's source list, all inactive.
    pub fn rebuild(&mut self, cities: &[String], regions: &[Region]) {
        let names: Vec<&String> = match self.mode {
            FilterMode::Cities => cities.iter().collect(),
            FilterMode::Regions => regions.iter().map(|r| &r.name).collect(),
        };
        let mut seen = HashSet::new();
        self.buttons = names
            .into_iter()
            .filter(|&name| seen.insert(name.as_str()))
            .map(|name| FilterButton {
                name: name.clone(),
                active: false,
            })
            .collect();
        tracing::debug!(mode = ?self.mode, buttons = self.buttons.len(), "filter buttons rebuilt");
    }

    /// Flips one button; returns its new state, `None` for an unknown name.
    pub fn toggle(&mut self, name: &str) -> Option<bool> {
        let button = self.buttons.iter_mut().find(|b| b.name == name)?;
        button.active = !button.active;
        Some(button.active)
    }

    pub fn select_all(&mut self) {
        self.buttons.iter_mut().for_each(|b| b.active = true);
    }

    pub fn clear(&mut self) {
        self.buttons.iter_mut().for_each(|b| b.active = false);
    }

    pub fn active_tokens(&self) -> Vec<&str> {
        self.buttons
            .iter()
            .filter(|b| b.active)
            .map(|b| b.name.as_str())
            .collect()
    }
}

/// Visibility of a delivery in `city` under the active tokens.
///
/// No token shows everything. In city mode a token must equal the city; in region mode
/// the city must belong to some region named by a token.
pub fn is_visible(mode: FilterMode, active: &[&str], city: &str, regions: &[Region]) -> bool {
    if active.is_empty() {
        return true;
    }
    match mode {
        FilterMode::Cities => active.contains(&city),
        FilterMode::Regions => active.iter().any(|token| {
            regions
                .iter()
                .find(|region| region.name == *token)
                .is_some_and(|region| region.contains_city(city))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sul() -> Vec<Region> {
        vec![Region {
            name: "Sul".into(),
            cities: vec!["Porto Alegre".into(), "Curitiba".into()],
        }]
    }

    #[test]
    fn region_scenario() {
        let regions = sul();
        assert!(is_visible(FilterMode::Regions, &["Sul"], "Curitiba", &regions));
        assert!(is_visible(FilterMode::Regions, &[], "Curitiba", &regions));
        // a region name is not a city
        assert!(!is_visible(FilterMode::Cities, &["Sul"], "Curitiba", &regions));
        assert!(!is_visible(FilterMode::Regions, &["Sul"], "Recife", &regions));
        assert!(!is_visible(FilterMode::Regions, &["Norte"], "Curitiba", &regions));
    }

    #[test]
    fn city_mode_matches_exact_city() {
        assert!(is_visible(FilterMode::Cities, &["Curitiba", "Recife"], "Recife", &[]));
        assert!(!is_visible(FilterMode::Cities, &["Curitiba"], "curitiba", &[]));
    }

    #[test]
    fn switching_mode_resets_selection_and_dedups() {
        let cities = vec!["Curitiba".to_string(), "Recife".into(), "Curitiba".into()];
        let mut panel = FilterPanel::new(FilterMode::Cities, &cities, &sul());
        let names: Vec<_> = panel.buttons().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Curitiba", "Recife"]);

        assert_eq!(panel.toggle("Recife"), Some(true));
        assert_eq!(panel.active_tokens(), ["Recife"]);

        panel.set_mode(FilterMode::Regions, &cities, &sul());
        assert!(panel.active_tokens().is_empty());
        assert_eq!(panel.buttons().len(), 1);
        assert_eq!(panel.buttons()[0].name, "Sul");
        assert_eq!(panel.mode().label(), "Regiões");
    }

    #[test]
    fn select_all_and_clear() {
        let cities = vec!["A".to_string(), "B".into()];
        let mut panel = FilterPanel::new(FilterMode::Cities, &cities, &[]);
        panel.select_all();
        assert_eq!(panel.active_tokens(), ["A", "B"]);
        panel.clear();
        assert!(panel.active_tokens().is_empty());
        assert_eq!(panel.toggle("missing"), None);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_city_mode_visibility_law(
                tokens in prop::collection::vec("[a-d]", 0..4),
                city in "[a-e]",
            ) {
                let active: Vec<&str> = tokens.iter().map(String::as_str).collect();
                let shown = is_visible(FilterMode::Cities, &active, &city, &[]);
                prop_assert_eq!(shown, active.is_empty() || active.contains(&city.as_str()));
            }

            #[test]
            fn prop_region_mode_visibility_law(
                tokens in prop::collection::vec("[rs]", 0..3),
                city in "[a-e]",
            ) {
                let regions = vec![
                    Region { name: "r".into(), cities: vec!["a".into(), "b".into()] },
                    Region { name: "s".into(), cities: vec!["c".into()] },
                ];
                let active: Vec<&str> = tokens.iter().map(String::as_str).collect();
                let expected = active.is_empty()
                    || regions
                        .iter()
                        .any(|r| active.contains(&r.name.as_str()) && r.contains_city(&city));
                prop_assert_eq!(is_visible(FilterMode::Regions, &active, &city, &regions), expected);
            }
        }
    }
}

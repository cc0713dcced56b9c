use std::collections::BTreeSet;

use shared::{Region, SaveRegionsRequest};

use crate::error::UiError;

/// Local editing of the region list. Changes stay in memory until `save_payload` is
/// sent; a failed save leaves them in place.
#[derive(Debug, Clone, Default)]
pub struct RegionEditor {
    regions: Vec<Region>,
    draft_name: String,
    draft_cities: BTreeSet<String>,
}

impl RegionEditor {
    pub fn new(regions: Vec<Region>) -> Self {
        Self {
            regions,
            ..Self::default()
        }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn draft_name(&self) -> &str {
        &self.draft_name
    }

    pub fn set_draft_name(&mut self, name: String) {
        self.draft_name = name;
    }

    pub fn is_city_selected(&self, city: &str) -> bool {
        self.draft_cities.contains(city)
    }

    pub fn toggle_city(&mut self, city: &str) {
        if !self.draft_cities.remove(city) {
            self.draft_cities.insert(city.to_string());
        }
    }

    /// Adds the draft as a new region and resets the draft.
    pub fn add_draft(&mut self) -> Result<(), UiError> {
        let cities: Vec<String> = self.draft_cities.iter().cloned().collect();
        let name = self.draft_name.clone();
        self.add(&name, cities)?;
        self.draft_name.clear();
        self.draft_cities.clear();
        Ok(())
    }

    /// Names are trimmed and must be unique ignoring case; a region needs a city.
    pub fn add(&mut self, name: &str, cities: Vec<String>) -> Result<(), UiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(UiError::validation("Por favor, dê um nome para a região."));
        }
        let lowered = name.to_lowercase();
        if self
            .regions
            .iter()
            .any(|r| r.name.to_lowercase() == lowered)
        {
            return Err(UiError::validation("Uma região com este nome já existe."));
        }
        if cities.is_empty() {
            return Err(UiError::validation(
                "Selecione pelo menos uma cidade para a região.",
            ));
        }
        tracing::debug!(name, cities = cities.len(), "region added");
        self.regions.push(Region {
            name: name.to_string(),
            cities,
        });
        Ok(())
    }

    /// Removes the region with exactly this name.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.regions.len();
        self.regions.retain(|r| r.name != name);
        before != self.regions.len()
    }

    pub fn save_payload(&self) -> SaveRegionsRequest {
        SaveRegionsRequest {
            regioes: self.regions.clone(),
        }
    }
}

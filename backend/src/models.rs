//! Records as stored in the data directory, and the parsing of loosely typed request
//! bodies.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{AbsEntry, Coordinate, DeliveryLocation, RouteKind};

use crate::error::PayloadError;

/// Carrier code of orders the customer collects; those never show on the map.
pub const PICKUP_CARRIER: &str = "02";
pub const AVAILABLE_TRUCK: &str = "Disponível";
pub const PENDING: &str = "Pendente";
pub const PLANNED: &str = "Planejada";

fn pending() -> String {
    PENDING.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickingLine {
    #[serde(rename = "SWeight1", default)]
    pub unit_weight: f64,
    #[serde(rename = "RelQtty", default)]
    pub quantity: f64,
}

/// One picking order from `deliveries.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    #[serde(rename = "AbsEntry")]
    pub abs_entry: AbsEntry,
    #[serde(rename = "CardName")]
    pub card_name: String,
    #[serde(rename = "Status", default = "pending")]
    pub status: String,
    #[serde(rename = "U_TU_QuemEntrega", default)]
    pub carrier: String,
    #[serde(rename = "U_GI_Rua", default)]
    pub street: String,
    #[serde(rename = "U_GI_NumRua", default)]
    pub street_number: String,
    #[serde(rename = "U_GI_Bairro", default)]
    pub district: String,
    #[serde(rename = "U_GI_Cidade", default)]
    pub city: String,
    #[serde(rename = "U_GI_Estado", default)]
    pub state: String,
    #[serde(rename = "U_SPS_Latitude", default)]
    pub latitude: Option<f64>,
    #[serde(rename = "U_SPS_Longitude", default)]
    pub longitude: Option<f64>,
    #[serde(rename = "Linhas", default)]
    pub lines: Vec<PickingLine>,
}

impl DeliveryRecord {
    pub fn is_delivery(&self) -> bool {
        self.carrier.trim() != PICKUP_CARRIER
    }

    pub fn weight_kg(&self) -> f64 {
        self.lines
            .iter()
            .map(|line| line.unit_weight * line.quantity)
            .sum()
    }

    pub fn address(&self) -> String {
        [
            &self.street,
            &self.street_number,
            &self.district,
            &self.city,
            &self.state,
        ]
        .into_iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty() && !part.eq_ignore_ascii_case("nan"))
        .collect::<Vec<_>>()
        .join(", ")
    }

    /// "street, city, state" works best with Nominatim.
    pub fn geocode_query(&self) -> String {
        format!(
            "{}, {}, {}",
            self.street.trim(),
            self.city.trim(),
            self.state.trim()
        )
    }

    /// Location as the pages see it; a saved geolocation wins over the source one.
    pub fn to_location(&self, saved: Option<Coordinate>) -> DeliveryLocation {
        let at = saved.or_else(|| Coordinate::from_parts(self.latitude, self.longitude));
        DeliveryLocation {
            abs_entry: self.abs_entry,
            card_name: self.card_name.clone(),
            status: self.status.clone(),
            latitude: at.map(|c| c.lat),
            longitude: at.map(|c| c.lon),
            address: self.address(),
            city: self.city.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedGeolocation {
    #[serde(rename = "AbsEntry")]
    pub abs_entry: AbsEntry,
    #[serde(rename = "Latitude")]
    pub lat: f64,
    #[serde(rename = "Longitude")]
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopRecord {
    #[serde(rename = "AbsEntry")]
    pub abs_entry: AbsEntry,
    #[serde(rename = "CardName")]
    pub card_name: String,
    #[serde(rename = "Ordem_Visita")]
    pub visit_order: u32,
    #[serde(rename = "Status_Parada")]
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRecord {
    #[serde(rename = "ID_Rota")]
    pub id: u32,
    #[serde(rename = "ID_Caminhao")]
    pub truck_id: String,
    #[serde(rename = "Placa_Caminhao")]
    pub plate: String,
    #[serde(rename = "Nome_Motorista")]
    pub driver: String,
    #[serde(rename = "Data_Rota")]
    pub date: NaiveDate,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Meta_KG", default)]
    pub target_kg: f64,
    #[serde(rename = "Data_Limite", default)]
    pub deadline: Option<NaiveDate>,
    #[serde(rename = "Observacoes", default)]
    pub notes: String,
    #[serde(rename = "Tipo", default)]
    pub kind: RouteKind,
    #[serde(rename = "Paradas", default)]
    pub stops: Vec<StopRecord>,
}

/// `/mapa/save_geolocation` body. Values may arrive as numbers or numeric strings.
#[derive(Debug, Default, Deserialize)]
pub struct GeolocationPayload {
    #[serde(default)]
    pub abs_entry: Value,
    #[serde(default)]
    pub lat: Value,
    #[serde(default)]
    pub lon: Value,
}

// Only absent values count as missing; a numeric zero is a coordinate like any other.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|n: &f64| n.is_finite())
}

impl GeolocationPayload {
    pub fn parse(&self) -> Result<(AbsEntry, Coordinate), PayloadError> {
        if [&self.abs_entry, &self.lat, &self.lon].into_iter().any(is_blank) {
            return Err(PayloadError::Incomplete);
        }
        let id = as_number(&self.abs_entry)
            .filter(|n| n.fract() == 0.0)
            .ok_or(PayloadError::Invalid)?;
        let lat = as_number(&self.lat)
            .filter(|v| (-90.0..=90.0).contains(v))
            .ok_or(PayloadError::Invalid)?;
        let lon = as_number(&self.lon)
            .filter(|v| (-180.0..=180.0).contains(v))
            .ok_or(PayloadError::Invalid)?;
        Ok((AbsEntry(id as i64), Coordinate { lat, lon }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record() -> DeliveryRecord {
        serde_json::from_value(json!({
            "AbsEntry": 10,
            "CardName": "Mercado Central",
            "U_GI_Rua": "Rua XV de Novembro",
            "U_GI_NumRua": "120",
            "U_GI_Bairro": "nan",
            "U_GI_Cidade": " Curitiba ",
            "U_GI_Estado": "PR",
            "U_SPS_Latitude": 0.0,
            "U_SPS_Longitude": 0.0,
            "Linhas": [
                {"SWeight1": 2.5, "RelQtty": 4.0},
                {"SWeight1": 1.0, "RelQtty": 3.0}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn record_defaults_and_derived_fields() {
        let record = record();
        assert_eq!(record.status, PENDING);
        assert!(record.is_delivery());
        assert_eq!(record.weight_kg(), 13.0);
        assert_eq!(record.address(), "Rua XV de Novembro, 120, Curitiba, PR");
        assert_eq!(record.geocode_query(), "Rua XV de Novembro, Curitiba, PR");
    }

    #[test]
    fn saved_geolocation_overrides_missing_source() {
        let record = record();
        let location = record.to_location(None);
        assert_eq!(location.coordinate(), None);
        assert_eq!(location.city, "Curitiba");

        let location = record.to_location(Some(Coordinate::new(-25.43, -49.27)));
        assert_eq!(location.latitude, Some(-25.43));
        assert_eq!(location.longitude, Some(-49.27));
    }

    #[test]
    fn geolocation_payload_validation() {
        let parse = |body: Value| serde_json::from_value::<GeolocationPayload>(body).unwrap().parse();

        assert_eq!(
            parse(json!({"abs_entry": 10, "lat": -23.5, "lon": -46.6})),
            Ok((AbsEntry(10), Coordinate::new(-23.5, -46.6)))
        );
        assert_eq!(
            parse(json!({"abs_entry": "10", "lat": "-23.5", "lon": "-46.6"})),
            Ok((AbsEntry(10), Coordinate::new(-23.5, -46.6)))
        );
        assert_eq!(parse(json!({"abs_entry": 10, "lat": -23.5})), Err(PayloadError::Incomplete));
        assert_eq!(
            parse(json!({"abs_entry": 10, "lat": "", "lon": -46.6})),
            Err(PayloadError::Incomplete)
        );
        assert_eq!(
            parse(json!({"abs_entry": 10, "lat": "abc", "lon": -46.6})),
            Err(PayloadError::Invalid)
        );
        assert_eq!(
            parse(json!({"abs_entry": 10, "lat": 123.0, "lon": -46.6})),
            Err(PayloadError::Invalid)
        );
        assert_eq!(
            parse(json!({"abs_entry": 10, "lat": [], "lon": -46.6})),
            Err(PayloadError::Invalid)
        );
    }

    #[test]
    fn zero_is_a_valid_saved_coordinate() {
        let parse = |body: Value| serde_json::from_value::<GeolocationPayload>(body).unwrap().parse();

        assert_eq!(
            parse(json!({"abs_entry": 10, "lat": 0.0, "lon": -50.07})),
            Ok((AbsEntry(10), Coordinate::new(0.0, -50.07)))
        );
        assert_eq!(
            parse(json!({"abs_entry": 10, "lat": "0.000000", "lon": "-50.070000"})),
            Ok((AbsEntry(10), Coordinate::new(0.0, -50.07)))
        );

        let location = record().to_location(Some(Coordinate::new(0.0, -50.07)));
        assert_eq!(location.coordinate(), Some(Coordinate::new(0.0, -50.07)));
    }
}

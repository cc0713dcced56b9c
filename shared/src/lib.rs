use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque delivery identifier ("AbsEntry").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbsEntry(pub i64);

impl fmt::Display for AbsEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Builds a coordinate from source record values, where zero marks a missing value.
    pub fn from_parts(lat: Option<f64>, lon: Option<f64>) -> Option<Self> {
        match (lat, lon) {
            (Some(lat), Some(lon)) if lat != 0.0 && lon != 0.0 && lat.is_finite() && lon.is_finite() => {
                Some(Self { lat, lon })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Bounds {
    /// Smallest box containing every point, `None` for an empty input.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Coordinate>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let seed = Self {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lon: first.lon,
            max_lon: first.lon,
        };
        Some(iter.fold(seed, |acc, p| Self {
            min_lat: acc.min_lat.min(p.lat),
            max_lat: acc.max_lat.max(p.lat),
            min_lon: acc.min_lon.min(p.lon),
            max_lon: acc.max_lon.max(p.lon),
        }))
    }

    /// Grows the box by `ratio` of its height/width on every side.
    pub fn padded(self, ratio: f64) -> Self {
        let dlat = (self.max_lat - self.min_lat).abs() * ratio;
        let dlon = (self.max_lon - self.min_lon).abs() * ratio;
        Self {
            min_lat: self.min_lat - dlat,
            max_lat: self.max_lat + dlat,
            min_lon: self.min_lon - dlon,
            max_lon: self.max_lon + dlon,
        }
    }
}

/// One delivery as handed to the map page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryLocation {
    #[serde(rename = "AbsEntry")]
    pub abs_entry: AbsEntry,
    #[serde(rename = "CardName")]
    pub card_name: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Latitude", default)]
    pub latitude: Option<f64>,
    #[serde(rename = "Longitude", default)]
    pub longitude: Option<f64>,
    #[serde(rename = "Endereco", default)]
    pub address: String,
    #[serde(rename = "Cidade", default)]
    pub city: String,
}

impl DeliveryLocation {
    /// Present when both values are set. Zero is a real value here: source zeros are
    /// already dropped when the location is built.
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some(Coordinate { lat, lon }),
            _ => None,
        }
    }

    pub fn set_coordinate(&mut self, at: Coordinate) {
        self.latitude = Some(at.lat);
        self.longitude = Some(at.lon);
    }
}

/// A delivery still available for routing, with its total weight in kg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedDelivery {
    #[serde(flatten)]
    pub location: DeliveryLocation,
    #[serde(rename = "Peso", default)]
    pub weight_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    #[serde(rename = "Nome")]
    pub name: String,
    #[serde(rename = "Cidades")]
    pub cities: Vec<String>,
}

impl Region {
    pub fn contains_city(&self, city: &str) -> bool {
        self.cities.iter().any(|c| c == city)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truck {
    #[serde(rename = "ID_Caminhao")]
    pub id: String,
    #[serde(rename = "Placa")]
    pub plate: String,
    #[serde(rename = "Nome_Motorista")]
    pub driver: String,
    #[serde(rename = "Status")]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPageData {
    pub locations: Vec<DeliveryLocation>,
    pub cities: Vec<String>,
    pub regions: Vec<Region>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningPageData {
    pub pedidos: Vec<PlannedDelivery>,
    pub caminhoes: Vec<Truck>,
}

/// Reply of the geocode lookup endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GeocodeReply {
    Success { lat: f64, lon: f64 },
    NotFound,
    Error {
        #[serde(default)]
        message: String,
    },
}

/// Generic `{status: "success"} | {status: "error", message}` reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusReply {
    Success,
    Error { message: String },
}

impl StatusReply {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn into_result(self) -> Result<(), String> {
        match self {
            Self::Success => Ok(()),
            Self::Error { message } => Err(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveGeolocationRequest {
    pub abs_entry: Option<AbsEntry>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRegionsRequest {
    #[serde(default)]
    pub regioes: Vec<Region>,
}

/// One selected delivery inside a route creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
    #[serde(rename = "AbsEntry")]
    pub abs_entry: AbsEntry,
    #[serde(rename = "CardName")]
    pub card_name: String,
    pub peso: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RouteKind {
    #[default]
    Normal,
    Pendente,
}

impl RouteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Pendente => "Pendente",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRouteRequest {
    pub pedidos: Vec<RouteStop>,
    pub id_caminhao: String,
    pub data_rota: String,
    pub tipo: RouteKind,
    #[serde(default)]
    pub meta_kg: Option<f64>,
    #[serde(default)]
    pub data_limite: Option<String>,
    #[serde(default)]
    pub observacoes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CreateRouteReply {
    Success { id_rota: u32 },
    Error { message: String },
}

/// Stored route with its aggregates, as listed on the route management page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOverview {
    pub id_rota: u32,
    pub id_caminhao: String,
    pub placa: String,
    pub motorista: String,
    pub data_rota: String,
    pub status: String,
    pub tipo: RouteKind,
    pub num_paradas: usize,
    pub peso_total_kg: f64,
}

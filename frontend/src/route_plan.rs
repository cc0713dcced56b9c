use shared::{AbsEntry, CreateRouteRequest, RouteKind, RouteStop};

use crate::error::UiError;

/// Deliveries picked for the next route, in the order they were ticked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteSelection {
    stops: Vec<RouteStop>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionSummary {
    pub count: usize,
    pub total_weight: f64,
}

impl SelectionSummary {
    pub fn weight_label(&self) -> String {
        format!("{:.2}", self.total_weight)
    }
}

impl RouteSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name and weight are captured now and never re-read.
    pub fn toggle(&mut self, id: AbsEntry, card_name: &str, weight: f64, selected: bool) {
        self.stops.retain(|stop| stop.abs_entry != id);
        if selected {
            self.stops.push(RouteStop {
                abs_entry: id,
                card_name: card_name.to_string(),
                peso: weight,
            });
        }
    }

    pub fn contains(&self, id: AbsEntry) -> bool {
        self.stops.iter().any(|stop| stop.abs_entry == id)
    }

    pub fn stops(&self) -> &[RouteStop] {
        &self.stops
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn summary(&self) -> SelectionSummary {
        SelectionSummary {
            count: self.stops.len(),
            total_weight: self.stops.iter().map(|stop| stop.peso).sum(),
        }
    }
}

/// Create-route modal fields, kept as typed text.
#[derive(Default, Clone, Debug)]
pub struct RouteForm {
    pub truck_id: String,
    pub date: String,
    pub kind: RouteKind,
    pub target_kg: String,
    pub deadline: String,
    pub notes: String,
}

impl RouteForm {
    /// The pending-route fields only apply to `Pendente` routes.
    pub fn shows_pending_fields(&self) -> bool {
        self.kind == RouteKind::Pendente
    }

    pub fn to_request(&self, selection: &RouteSelection) -> Result<CreateRouteRequest, UiError> {
        let required = |field: &str, label: &str| {
            let value = field.trim();
            if value.is_empty() {
                Err(UiError::validation(format!("Preencha o campo {label}.")))
            } else {
                Ok(value.to_string())
            }
        };
        let optional = |field: &str| {
            let value = field.trim();
            (!value.is_empty()).then(|| value.to_string())
        };

        let truck = required(&self.truck_id, "caminhão")?;
        let date = required(&self.date, "data da rota")?;
        let (target_kg, deadline) = if self.shows_pending_fields() {
            let target = optional(&self.target_kg)
                .map(|raw| {
                    raw.replace(',', ".")
                        .parse::<f64>()
                        .map_err(|_| UiError::validation("Campo meta (kg) inválido."))
                })
                .transpose()?;
            (target, optional(&self.deadline))
        } else {
            (None, None)
        };

        Ok(CreateRouteRequest {
            pedidos: selection.stops().to_vec(),
            id_caminhao: truck,
            data_rota: date,
            tipo: self.kind,
            meta_kg: target_kg,
            data_limite: deadline,
            observacoes: self.notes.trim().to_string(),
        })
    }
}

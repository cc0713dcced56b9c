use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shared::{AbsEntry, StatusReply};
use thiserror::Error;

pub const INCOMPLETE_DATA: &str = "Dados incompletos.";
pub const INVALID_VALUES: &str = "Valores inválidos.";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed data in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("delivery {0} not found")]
    UnknownDelivery(AbsEntry),
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("geocoder returned an unparsable coordinate: {0}")]
    BadCoordinate(String),
}

/// Request body problems, reported with the messages the pages display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("Dados incompletos.")]
    Incomplete,
    #[error("Valores inválidos.")]
    Invalid,
    #[error("{0}")]
    Rejected(String),
}

/// Error reply of every endpoint: a status code plus `{status: "error", message}`.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    message: String,
}

impl ApiFailure {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn unknown_delivery(id: AbsEntry) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("Pedido {id} não encontrado."))
    }

    /// Keeps the caller-facing message and logs the underlying store failure.
    pub fn persistence(message: &str, err: StoreError) -> Self {
        if let StoreError::UnknownDelivery(id) = err {
            return Self::unknown_delivery(id);
        }
        tracing::error!(error = %err, "{message}");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<PayloadError> for ApiFailure {
    fn from(err: PayloadError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<JsonRejection> for ApiFailure {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(%rejection, "rejected request body");
        let missing = matches!(&rejection, JsonRejection::JsonDataError(err)
            if err.body_text().contains("missing field"));
        if missing {
            PayloadError::Incomplete.into()
        } else {
            PayloadError::Invalid.into()
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(StatusReply::error(self.message))).into_response()
    }
}

use thiserror::Error;

/// Failures surfaced to the operator. `Display` is the text shown in the page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UiError {
    #[error("Não encontrada.")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Server(String),
    #[error("Erro de conexão.")]
    Network,
}

impl UiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

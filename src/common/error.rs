use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro central. Cada variante é um "kind" discriminado;
// a camada HTTP mapeia para status codes aqui, em um único lugar.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Entrada inválida: {0}")]
    InvalidInput(String),

    #[error("{0} não encontrado")]
    NotFound(String),

    // Reentrada de máquina de estados (aprovar um pedido já aprovado, completar
    // um evento já completado). Resultado esperado de concorrência, não um bug.
    #[error("Registro já processado: {0}")]
    AlreadyHandled(String),

    #[error("Estoque insuficiente: {0}")]
    InsufficientStock(String),

    // Item de catálogo sem a conta contábil necessária cadastrada.
    #[error("Conta contábil ausente: {0}")]
    MissingAccount(String),

    #[error("Referência de documento já utilizada: {0}")]
    DuplicateReference(String),

    #[error("Nome de item já existe: {0}")]
    ItemNameAlreadyExists(String),

    // Falha transitória do banco na hora do commit (serialização/deadlock).
    // É o único kind que os workflows reaplicam automaticamente.
    #[error("Transação abortada pelo banco, tente novamente")]
    TransactionAborted,

    // Variante para erros de banco de dados (sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// Indica se vale a pena o workflow tentar de novo dentro do mesmo request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::TransactionAborted)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} não encontrado.", what)),
            AppError::AlreadyHandled(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::InsufficientStock(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::MissingAccount(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::DuplicateReference(reference) => (
                StatusCode::CONFLICT,
                format!("Já existe um documento com a referência '{}'.", reference),
            ),
            AppError::ItemNameAlreadyExists(name) => (
                StatusCode::CONFLICT,
                format!("Já existe um item com o nome '{}'.", name),
            ),
            AppError::TransactionAborted => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Conflito de concorrência no banco de dados. Tente novamente.".to_string(),
            ),

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

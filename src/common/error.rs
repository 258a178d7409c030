use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::response::{ApiResponse, ErrorBody};
use crate::db::{procedure::BUSINESS_RULE_ERROR_CODE, DatabaseError};

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Request validation failed")]
    ValidationError(#[from] validator::ValidationErrors),

    // A procedure recusou a operação (SQLSTATE 51000). A mensagem vem do banco.
    #[error("{0}")]
    BusinessRule(String),

    #[error("Token de autenticação inválido ou ausente")]
    Unauthorized,

    #[error("Permissão '{permission}' negada em '{securable}'")]
    Forbidden {
        securable: &'static str,
        permission: &'static str,
    },

    #[error("Route {method} {path} not found")]
    RouteNotFound { method: String, path: String },

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(DatabaseError),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

// A distinção regra de negócio x infraestrutura é feita só pelo SQLSTATE.
impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Rejected {
                code: Some(code),
                message,
            } if code == BUSINESS_RULE_ERROR_CODE => AppError::BusinessRule(message),
            other => AppError::DatabaseError(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("VALIDATION_ERROR", "Request validation failed")
                    .with_details(validation_details(&errors)),
            ),
            AppError::BusinessRule(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("BUSINESS_RULE_VIOLATION", message),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("UNAUTHORIZED", "Authentication token is missing or invalid"),
            ),
            AppError::Forbidden {
                securable,
                permission,
            } => (
                StatusCode::FORBIDDEN,
                ErrorBody::new(
                    "FORBIDDEN",
                    format!("Permission {permission} on {securable} is required"),
                ),
            ),
            ref e @ AppError::RouteNotFound { .. } => {
                (StatusCode::NOT_FOUND, ErrorBody::new("NOT_FOUND", e.to_string()))
            }

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada; o cliente recebe só a genérica.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("INTERNAL_SERVER_ERROR", "An unexpected error occurred"),
                )
            }
        };

        (status, Json(ApiResponse::failure(body))).into_response()
    }
}

// [{ field, code, message }] ordenado pelo nome do campo.
fn validation_details(errors: &validator::ValidationErrors) -> Value {
    let mut details: Vec<(String, Value)> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, field_errors)| {
            let field = camel_case(&field);
            field_errors
                .iter()
                .map(|e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    (
                        field.clone(),
                        json!({ "field": field, "code": e.code, "message": message }),
                    )
                })
                .collect::<Vec<_>>()
        })
        .collect();

    details.sort_by(|a, b| a.0.cmp(&b.0));
    Value::Array(details.into_iter().map(|(_, v)| v).collect())
}

// O derive do `validator` usa o nome do campo em Rust (id_product).
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::coerce::message_error;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_list_every_field() {
        let mut errors = validator::ValidationErrors::new();
        errors.add("movement_type", message_error("invalid_enum_value", "bad".into()));
        errors.add("id_product", message_error("required", "Required".into()));

        let (status, body) = render(AppError::from(errors)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"]["message"], json!("Request validation failed"));
        let details = body["error"]["details"].as_array().unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0]["field"], json!("idProduct"));
        assert_eq!(details[1]["field"], json!("movementType"));
        assert_eq!(details[1]["code"], json!("invalid_enum_value"));
    }

    #[tokio::test]
    async fn business_rule_keeps_procedure_message() {
        let err = AppError::from(DatabaseError::Rejected {
            code: Some(BUSINESS_RULE_ERROR_CODE.into()),
            message: "Estoque insuficiente".into(),
        });
        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], json!("Estoque insuficiente"));
    }

    #[tokio::test]
    async fn other_database_errors_do_not_leak() {
        let err = AppError::from(DatabaseError::Rejected {
            code: Some("42883".into()),
            message: "function functional.spX does not exist".into(),
        });
        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], json!("An unexpected error occurred"));
        assert!(!body.to_string().contains("spX"));
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (status, body) = render(AppError::RouteNotFound {
            method: "GET".into(),
            path: "/nope".into(),
        })
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], json!("NOT_FOUND"));
        assert_eq!(body["error"]["message"], json!("Route GET /nope not found"));
    }

    #[test]
    fn snake_to_camel() {
        assert_eq!(camel_case("reference_document"), "referenceDocument");
        assert_eq!(camel_case("page"), "page");
        assert_eq!(camel_case("idProduct"), "idProduct");
    }
}

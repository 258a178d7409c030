// src/middleware/candidate.rs

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use validator::ValidationErrors;

use crate::common::{coerce::message_error, error::AppError};

/// Junta path, query string e corpo JSON num único objeto e desserializa `T`.
///
/// A precedência é path < query < body: uma chave repetida no corpo vence.
/// Nenhuma validação acontece aqui; o handler chama `validate()` no resultado.
#[derive(Debug, Clone)]
pub struct Candidate<T>(pub T);

impl<T, S> FromRequest<S> for Candidate<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();
        let mut merged = Map::new();

        if let Ok(Path(params)) =
            Path::<HashMap<String, String>>::from_request_parts(&mut parts, state).await
        {
            merged.extend(params.into_iter().map(|(k, v)| (k, Value::String(v))));
        }

        if let Ok(Query(params)) =
            Query::<HashMap<String, String>>::from_request_parts(&mut parts, state).await
        {
            merged.extend(params.into_iter().map(|(k, v)| (k, Value::String(v))));
        }

        let bytes = Bytes::from_request(Request::from_parts(parts, body), state)
            .await
            .map_err(|e| body_error(format!("Invalid request body: {e}")))?;
        merged.extend(body_object(&bytes)?);

        let candidate = serde_json::from_value(Value::Object(merged))
            .map_err(|e| body_error(e.to_string()))?;
        Ok(Candidate(candidate))
    }
}

fn body_object(bytes: &[u8]) -> Result<Map<String, Value>, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(_) => Err(body_error("Expected object".to_string())),
        Err(e) => Err(body_error(format!("Malformed JSON: {e}"))),
    }
}

fn body_error(message: String) -> AppError {
    let mut errors = ValidationErrors::new();
    errors.add("body", message_error("invalid_type", message));
    AppError::ValidationError(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::coerce::Field;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Probe {
        #[serde(default)]
        id_product: Field<i64>,
        #[serde(default)]
        page: Field<i64>,
    }

    async fn extract(uri: &str, body: &str) -> Result<Probe, AppError> {
        let req = Request::builder()
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        Candidate::<Probe>::from_request(req, &()).await.map(|c| c.0)
    }

    #[tokio::test]
    async fn body_overrides_query() {
        let probe = extract("/x?idProduct=3&page=2", r#"{"idProduct": 9}"#)
            .await
            .unwrap();
        assert_eq!(probe.id_product, Field::Value(9));
        assert_eq!(probe.page, Field::Value(2));
    }

    #[tokio::test]
    async fn empty_body_is_an_empty_object() {
        let probe = extract("/x", "").await.unwrap();
        assert_eq!(probe.id_product, Field::Missing);
    }

    #[tokio::test]
    async fn non_object_body_is_a_validation_error() {
        let err = extract("/x", "[1, 2]").await.unwrap_err();
        match err {
            AppError::ValidationError(errors) => {
                assert!(errors.field_errors().contains_key("body"));
            }
            other => panic!("erro inesperado: {other:?}"),
        }
        assert!(extract("/x", "{not json").await.is_err());
    }
}

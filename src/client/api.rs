// src/client/api.rs

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::{
    common::response::ApiResponse,
    models::stock_movement::{
        CurrentStock, CurrentStockReport, MovementCreated, MovementDraft, MovementListQuery,
        MovementPage, StockMovement,
    },
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Falha de comunicação com a API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API respondeu {status}: {message}")]
    Api {
        status: StatusCode,
        code: Option<String>,
        message: String,
        details: Option<Value>,
    },

    #[error("Resposta fora do envelope esperado: {0}")]
    MalformedEnvelope(String),
}

/// Cliente tipado das rotas internas de estoque.
#[derive(Clone)]
pub struct StockBoxClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl StockBoxClient {
    /// `origin` é o endereço do servidor (ex.: `http://localhost:3000`).
    pub fn new(origin: &str, api_version: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("stockbox-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: format!("{}/api/{}/internal", origin.trim_end_matches('/'), api_version),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn list(&self, filters: &MovementListQuery) -> Result<MovementPage, ClientError> {
        let request = self.http.get(self.endpoint("/stock-movement")).query(filters);
        required(self.send(request).await?)
    }

    /// `None` quando a movimentação não existe (`data: null`).
    pub async fn get_by_id(&self, id: i64) -> Result<Option<StockMovement>, ClientError> {
        let request = self.http.get(self.endpoint(&format!("/stock-movement/{id}")));
        self.send(request).await
    }

    pub async fn create(&self, draft: &MovementDraft) -> Result<MovementCreated, ClientError> {
        let request = self.http.post(self.endpoint("/stock-movement")).json(draft);
        required(self.send(request).await?)
    }

    pub async fn current_stock(&self, id_product: Option<i64>) -> Result<Vec<CurrentStock>, ClientError> {
        let mut request = self.http.get(self.endpoint("/stock-current"));
        if let Some(id) = id_product {
            request = request.query(&[("idProduct", id)]);
        }
        let report: CurrentStockReport = required(self.send(request).await?)?;
        Ok(report.stock)
    }

    // Envia, desembrulha o envelope e devolve o `data`.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>, ClientError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let envelope: ApiResponse<T> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(ClientError::MalformedEnvelope(e.to_string()));
            }
            Err(_) => {
                return Err(ClientError::Api {
                    status,
                    code: None,
                    message: String::from_utf8_lossy(&body).into_owned(),
                    details: None,
                });
            }
        };

        if !envelope.success || !status.is_success() {
            let error = envelope.error.ok_or_else(|| {
                ClientError::MalformedEnvelope(format!("falha {status} sem o campo `error`"))
            })?;
            return Err(ClientError::Api {
                status,
                code: error.code,
                message: error.message,
                details: error.details,
            });
        }

        Ok(envelope.data)
    }
}

fn required<T>(data: Option<T>) -> Result<T, ClientError> {
    data.ok_or_else(|| ClientError::MalformedEnvelope("resposta sem `data`".to_string()))
}

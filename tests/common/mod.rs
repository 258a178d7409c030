#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use stockbox::{
    config::{AppState, ServerConfig},
    db::{DatabaseError, ExpectedReturn, ProcedureCall, ProcedureExecutor, ProcedureOutput},
    middleware::{
        auth::{CredentialProvider, StaticCredentials},
        rbac::{AllowAll, Authorizer},
    },
    routes,
};
use tower::ServiceExt;

pub const ACCOUNT_ID: i64 = 1;
pub const USER_ID: i64 = 7;

/// O que a procedure roteirizada devolve para uma chamada.
pub enum Reply {
    Row(Option<Value>),
    Sets(Vec<Vec<Value>>),
}

type Script = dyn Fn(&ProcedureCall) -> Result<Reply, DatabaseError> + Send + Sync;

/// Banco em memória: responde a partir de um roteiro e guarda cada chamada.
pub struct ScriptedGateway {
    script: Box<Script>,
    calls: Mutex<Vec<(ProcedureCall, ExpectedReturn)>>,
}

impl ScriptedGateway {
    pub fn new<F>(script: F) -> Arc<Self>
    where
        F: Fn(&ProcedureCall) -> Result<Reply, DatabaseError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Derruba o teste se alguma procedure for chamada.
    pub fn untouchable() -> Arc<Self> {
        Self::new(|call| panic!("procedure {} should not have been called", call.name()))
    }

    pub fn calls(&self) -> Vec<(ProcedureCall, ExpectedReturn)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> ProcedureCall {
        self.calls().last().map(|(call, _)| call.clone()).expect("no procedure was called")
    }
}

#[async_trait]
impl ProcedureExecutor for ScriptedGateway {
    async fn execute(
        &self,
        call: &ProcedureCall,
        expected: ExpectedReturn,
    ) -> Result<ProcedureOutput, DatabaseError> {
        self.calls.lock().unwrap().push((call.clone(), expected));

        Ok(match (self.script)(call)? {
            Reply::Row(row) => ProcedureOutput::Single(row.map(into_row)),
            Reply::Sets(sets) => ProcedureOutput::from_result_sets(
                call,
                sets.into_iter().map(|rows| rows.into_iter().map(into_row).collect()).collect(),
            ),
        })
    }
}

fn into_row(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("scripted row must be an object, got {other}"),
    }
}

pub fn server_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        api_version: "v1".into(),
        cors_origins: vec!["*".into()],
    }
}

pub fn app(gateway: Arc<ScriptedGateway>) -> Router {
    app_with(
        gateway,
        Arc::new(StaticCredentials::new(ACCOUNT_ID, USER_ID)),
        Arc::new(AllowAll),
    )
}

pub fn app_with(
    gateway: Arc<ScriptedGateway>,
    credentials: Arc<dyn CredentialProvider>,
    authorizer: Arc<dyn Authorizer>,
) -> Router {
    let state = AppState::with_security(gateway, credentials, authorizer);
    routes::router(state, &server_config())
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

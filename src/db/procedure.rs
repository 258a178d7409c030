// src/db/procedure.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// Uma linha devolvida por uma procedure, já convertida para JSON.
pub type Row = Map<String, Value>;

/// SQLSTATE usado pelas procedures para recusar uma operação por regra de negócio
/// (`RAISE EXCEPTION ... USING ERRCODE = '51000'`).
pub const BUSINESS_RULE_ERROR_CODE: &str = "51000";

// Nomes das procedures (schema `functional`).
pub mod procedures {
    pub const STOCK_MOVEMENT_CREATE: &str = "functional.spStockMovementCreate";
    pub const STOCK_MOVEMENT_LIST: &str = "functional.spStockMovementList";
    pub const STOCK_MOVEMENT_GET: &str = "functional.spStockMovementGet";
    pub const STOCK_CURRENT_GET: &str = "functional.spStockCurrentGet";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedReturn {
    /// Descarta qualquer resultado.
    None,
    /// Primeira linha do primeiro result set (ou nada).
    Single,
    /// Todos os result sets, em ordem.
    Multi,
}

/// Valor de um parâmetro nomeado. O `Option` interno vira `NULL` tipado.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(Option<i64>),
    Decimal(Option<Decimal>),
    Text(Option<String>),
    Date(Option<NaiveDate>),
}

impl ParamValue {
    pub fn is_null(&self) -> bool {
        match self {
            ParamValue::Int(v) => v.is_none(),
            ParamValue::Decimal(v) => v.is_none(),
            ParamValue::Text(v) => v.is_none(),
            ParamValue::Date(v) => v.is_none(),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(Some(v))
    }
}

impl From<Option<i64>> for ParamValue {
    fn from(v: Option<i64>) -> Self {
        ParamValue::Int(v)
    }
}

impl From<Decimal> for ParamValue {
    fn from(v: Decimal) -> Self {
        ParamValue::Decimal(Some(v))
    }
}

impl From<Option<Decimal>> for ParamValue {
    fn from(v: Option<Decimal>) -> Self {
        ParamValue::Decimal(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(Some(v.to_string()))
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(Some(v))
    }
}

impl From<Option<String>> for ParamValue {
    fn from(v: Option<String>) -> Self {
        ParamValue::Text(v)
    }
}

impl From<Option<&str>> for ParamValue {
    fn from(v: Option<&str>) -> Self {
        ParamValue::Text(v.map(str::to_string))
    }
}

impl From<Option<NaiveDate>> for ParamValue {
    fn from(v: Option<NaiveDate>) -> Self {
        ParamValue::Date(v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureParam {
    pub name: &'static str,
    pub value: ParamValue,
}

/// Chamada a uma procedure: nome qualificado + parâmetros nomeados (em ordem).
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureCall {
    name: &'static str,
    params: Vec<ProcedureParam>,
    result_set_names: Vec<&'static str>,
}

impl ProcedureCall {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            params: Vec::new(),
            result_set_names: Vec::new(),
        }
    }

    pub fn param(mut self, name: &'static str, value: impl Into<ParamValue>) -> Self {
        self.params.push(ProcedureParam {
            name,
            value: value.into(),
        });
        self
    }

    /// Com nomes, um retorno `Multi` vira um mapa nome -> linhas.
    pub fn named_result_sets(mut self, names: &[&'static str]) -> Self {
        self.result_set_names = names.to_vec();
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn params(&self) -> &[ProcedureParam] {
        &self.params
    }

    pub fn param_value(&self, name: &str) -> Option<&ParamValue> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    pub fn result_set_names(&self) -> &[&'static str] {
        &self.result_set_names
    }
}

/// O que a procedure devolveu, de acordo com o `ExpectedReturn` pedido.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcedureOutput {
    None,
    Single(Option<Row>),
    Multi(Vec<Vec<Row>>),
    Named(BTreeMap<String, Vec<Row>>),
}

impl ProcedureOutput {
    /// Monta a saída `Multi`, remapeando para nomes quando a chamada pediu.
    pub fn from_result_sets(call: &ProcedureCall, mut sets: Vec<Vec<Row>>) -> Self {
        if call.result_set_names.is_empty() {
            return ProcedureOutput::Multi(sets);
        }
        sets.resize_with(sets.len().max(call.result_set_names.len()), Vec::new);
        let named = call
            .result_set_names
            .iter()
            .zip(sets)
            .map(|(name, rows)| (name.to_string(), rows))
            .collect();
        ProcedureOutput::Named(named)
    }

    pub fn into_single(self) -> Result<Option<Row>, DatabaseError> {
        match self {
            ProcedureOutput::Single(row) => Ok(row),
            other => Err(DatabaseError::UnexpectedShape(format!(
                "esperava uma linha, recebeu {}",
                other.kind()
            ))),
        }
    }

    pub fn into_result_sets(self) -> Result<Vec<Vec<Row>>, DatabaseError> {
        match self {
            ProcedureOutput::Multi(sets) => Ok(sets),
            other => Err(DatabaseError::UnexpectedShape(format!(
                "esperava vários result sets, recebeu {}",
                other.kind()
            ))),
        }
    }

    pub fn into_named(self) -> Result<BTreeMap<String, Vec<Row>>, DatabaseError> {
        match self {
            ProcedureOutput::Named(sets) => Ok(sets),
            other => Err(DatabaseError::UnexpectedShape(format!(
                "esperava result sets nomeados, recebeu {}",
                other.kind()
            ))),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ProcedureOutput::None => "None",
            ProcedureOutput::Single(_) => "Single",
            ProcedureOutput::Multi(_) => "Multi",
            ProcedureOutput::Named(_) => "Named",
        }
    }
}

/// Converte uma linha no registro declarado da operação.
pub fn decode_row<T: DeserializeOwned>(row: Row) -> Result<T, DatabaseError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, DatabaseError> {
    rows.into_iter().map(decode_row).collect()
}

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("não foi possível abrir o pool de conexões: {0}")]
    Connection(#[source] sqlx::Error),

    // Erro levantado pelo próprio banco (RAISE / constraint / etc.), com o SQLSTATE.
    #[error("procedure recusou a operação ({code:?}): {message}")]
    Rejected { code: Option<String>, message: String },

    #[error("erro do driver: {0}")]
    Driver(#[source] sqlx::Error),

    #[error("coluna `{column}` com tipo não suportado `{type_name}`")]
    UnsupportedColumn { column: String, type_name: String },

    #[error("formato de resultado inesperado: {0}")]
    UnexpectedShape(String),

    #[error("linha não corresponde ao registro esperado: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("transação já finalizada")]
    TransactionClosed,
}

impl DatabaseError {
    /// SQLSTATE do erro, quando veio do banco.
    pub fn code(&self) -> Option<&str> {
        match self {
            DatabaseError::Rejected { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn is_business_rule(&self) -> bool {
        self.code() == Some(BUSINESS_RULE_ERROR_CODE)
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => DatabaseError::Rejected {
                code: db_err.code().map(|c| c.into_owned()),
                message: db_err.message().to_string(),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => DatabaseError::Connection(err),
            other => DatabaseError::Driver(other),
        }
    }
}

// ---
// O contrato do gateway
// ---
/// Executa procedures nomeadas. Implementado pelo pool (`Database`) e por uma
/// transação aberta (`DbTransaction`).
#[async_trait]
pub trait ProcedureExecutor: Send + Sync {
    async fn execute(
        &self,
        call: &ProcedureCall,
        expected: ExpectedReturn,
    ) -> Result<ProcedureOutput, DatabaseError>;
}

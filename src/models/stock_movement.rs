// src/models/stock_movement.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::common::coerce::{literal_from, literal_message, Coerce, LiteralEnum};

// --- 1. Tipos de movimentação ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Entrada,
    Saida,
    Ajuste,
    Criacao,
    Exclusao,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entrada => "entrada",
            MovementType::Saida => "saida",
            MovementType::Ajuste => "ajuste",
            MovementType::Criacao => "criacao",
            MovementType::Exclusao => "exclusao",
        }
    }
}

impl LiteralEnum for MovementType {
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("entrada", MovementType::Entrada),
        ("saida", MovementType::Saida),
        ("ajuste", MovementType::Ajuste),
        ("criacao", MovementType::Criacao),
        ("exclusao", MovementType::Exclusao),
    ];
}

impl Coerce for MovementType {
    const EXPECTED: &'static str = "movement type";

    fn coerce(raw: &Value) -> Option<Self> {
        literal_from(raw)
    }

    fn invalid_message(raw: &Value) -> String {
        literal_message::<Self>(raw)
    }
}

// --- 2. Ordenação da listagem ---
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    DateAsc,
    #[default]
    DateDesc,
    ProductAsc,
    ProductDesc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::DateAsc => "date_asc",
            SortOrder::DateDesc => "date_desc",
            SortOrder::ProductAsc => "product_asc",
            SortOrder::ProductDesc => "product_desc",
        }
    }
}

impl LiteralEnum for SortOrder {
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("date_asc", SortOrder::DateAsc),
        ("date_desc", SortOrder::DateDesc),
        ("product_asc", SortOrder::ProductAsc),
        ("product_desc", SortOrder::ProductDesc),
    ];
}

impl Coerce for SortOrder {
    const EXPECTED: &'static str = "sort order";

    fn coerce(raw: &Value) -> Option<Self> {
        literal_from(raw)
    }

    fn invalid_message(raw: &Value) -> String {
        literal_message::<Self>(raw)
    }
}

// --- 3. Situação do estoque (calculada pela procedure) ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Normal,
    Baixo,
    Critico,
    Excesso,
}

// ---
// Parâmetros dos serviços (já validados, com a credencial resolvida)
// ---

#[derive(Debug, Clone, PartialEq)]
pub struct NewStockMovement {
    pub id_account: i64,
    pub id_user: i64,
    pub id_product: i64,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub reason: Option<String>,
    pub reference_document: Option<String>,
    pub batch_number: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub unit_cost: Option<Decimal>,
}

/// Filtros da listagem. `None` em ordenação/paginação usa os padrões do serviço.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovementFilter {
    pub id_account: i64,
    pub id_product: Option<i64>,
    pub movement_type: Option<MovementType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub id_user: Option<i64>,
    pub reference_document: Option<String>,
    pub order_by: Option<SortOrder>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementLookup {
    pub id_account: i64,
    pub id_stock_movement: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentStockQuery {
    pub id_account: i64,
    pub id_product: Option<i64>,
}

// ---
// Registros de resposta (o que as procedures devolvem, já tipado)
// ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovementCreated {
    pub id_stock_movement: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id_stock_movement: i64,
    pub id_product: i64,
    #[serde(default)]
    pub product_name: Option<String>,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub date_time: DateTime<Utc>,
    pub id_user: i64,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub reference_document: Option<String>,
    #[serde(default)]
    pub batch_number: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub unit_cost: Option<Decimal>,
    // Saldo acumulado após a movimentação (só na listagem)
    #[serde(default)]
    pub running_balance: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_records: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub page_size: i64,
}

impl Pagination {
    /// Usado quando a procedure não devolve a linha de paginação.
    pub fn empty(page_size: i64) -> Self {
        Self {
            total_records: 0,
            total_pages: 0,
            current_page: 1,
            page_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MovementPage {
    pub movements: Vec<StockMovement>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStock {
    pub id_product: i64,
    pub product_name: String,
    pub current_quantity: Decimal,
    #[serde(default)]
    pub minimum_quantity: Option<Decimal>,
    #[serde(default)]
    pub maximum_quantity: Option<Decimal>,
    pub status: StockStatus,
    #[serde(default)]
    pub last_movement_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CurrentStockReport {
    pub stock: Vec<CurrentStock>,
}

// ---
// DTOs do cliente HTTP
// ---

/// Filtros enviados pelo cliente na query string de `GET /stock-movement`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_product: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movement_type: Option<MovementType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_user: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_document: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,
}

/// Corpo do `POST /stock-movement` montado pelo cliente.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementDraft {
    pub id_product: i64,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_document: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn movement_rows_decode_with_optional_columns_missing() {
        let movement: StockMovement = serde_json::from_value(json!({
            "idStockMovement": 1,
            "idProduct": 5,
            "movementType": "entrada",
            "quantity": 10,
            "dateTime": "2024-05-01T10:00:00+00:00",
            "idUser": 1,
            "expirationDate": "2025-01-31"
        }))
        .unwrap();

        assert_eq!(movement.movement_type, MovementType::Entrada);
        assert_eq!(movement.quantity, Decimal::from(10));
        assert_eq!(movement.product_name, None);
        assert_eq!(
            movement.expiration_date,
            NaiveDate::from_ymd_opt(2025, 1, 31)
        );
    }

    #[test]
    fn enums_use_wire_names() {
        assert_eq!(serde_json::to_value(SortOrder::ProductDesc).unwrap(), json!("product_desc"));
        assert_eq!(serde_json::to_value(StockStatus::Critico).unwrap(), json!("critico"));
        assert_eq!(SortOrder::default(), SortOrder::DateDesc);
        for (name, value) in MovementType::VARIANTS {
            assert_eq!(value.as_str(), *name);
        }
    }

    #[test]
    fn coerce_rejects_unknown_literals() {
        assert_eq!(MovementType::coerce(&json!("saida")), Some(MovementType::Saida));
        assert_eq!(MovementType::coerce(&json!("invalidType")), None);
        assert!(MovementType::invalid_message(&json!("invalidType")).contains("'entrada'"));
    }
}

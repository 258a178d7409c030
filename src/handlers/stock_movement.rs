// src/handlers/stock_movement.rs

use axum::{extract::State, response::IntoResponse, Json};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::{
    common::{
        coerce::{at_most, check, check_literal, max_length, positive_integer, positive_number, Field, Presence},
        error::AppError,
        response::{ApiResponse, ErrorBody},
    },
    config::AppState,
    middleware::{
        auth::Credential,
        candidate::Candidate,
        rbac::{authorize, PermStockMovementCreate, PermStockMovementRead},
    },
    models::stock_movement::{
        CurrentStockQuery, CurrentStockReport, MovementCreated, MovementFilter, MovementLookup,
        MovementPage, MovementType, NewStockMovement, SortOrder, StockMovement,
    },
};

pub const MAX_PAGE_SIZE: i64 = 100;

// ---
// Regras dos campos (chamadas pelo `validator`)
// ---
fn required_id(v: &Field<i64>) -> Result<(), ValidationError> {
    check(v, Presence::Required, positive_integer)
}

fn optional_id(v: &Field<i64>) -> Result<(), ValidationError> {
    check(v, Presence::Optional, positive_integer)
}

fn required_movement_type(v: &Field<MovementType>) -> Result<(), ValidationError> {
    check_literal(v, Presence::Required)
}

fn optional_movement_type(v: &Field<MovementType>) -> Result<(), ValidationError> {
    check_literal(v, Presence::Optional)
}

fn optional_order_by(v: &Field<SortOrder>) -> Result<(), ValidationError> {
    check_literal(v, Presence::Optional)
}

fn required_quantity(v: &Field<Decimal>) -> Result<(), ValidationError> {
    check(v, Presence::Required, |_| Ok(()))
}

fn nullable_unit_cost(v: &Field<Decimal>) -> Result<(), ValidationError> {
    check(v, Presence::Nullable, positive_number)
}

fn nullable_date(v: &Field<NaiveDate>) -> Result<(), ValidationError> {
    check(v, Presence::Nullable, |_| Ok(()))
}

fn optional_date(v: &Field<NaiveDate>) -> Result<(), ValidationError> {
    check(v, Presence::Optional, |_| Ok(()))
}

fn reason_text(v: &Field<String>) -> Result<(), ValidationError> {
    check(v, Presence::Nullable, |s| max_length(s, 255))
}

fn nullable_text_50(v: &Field<String>) -> Result<(), ValidationError> {
    check(v, Presence::Nullable, |s| max_length(s, 50))
}

fn nullable_text_30(v: &Field<String>) -> Result<(), ValidationError> {
    check(v, Presence::Nullable, |s| max_length(s, 30))
}

fn optional_text_50(v: &Field<String>) -> Result<(), ValidationError> {
    check(v, Presence::Optional, |s| max_length(s, 50))
}

fn page_size(v: &Field<i64>) -> Result<(), ValidationError> {
    check(v, Presence::Optional, |n| {
        positive_integer(n)?;
        at_most(n, MAX_PAGE_SIZE)
    })
}

// ---
// Payload: CreateStockMovement
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStockMovementPayload {
    #[validate(custom(function = "required_id"))]
    #[serde(default)]
    #[schema(value_type = i64, example = 5)]
    pub id_product: Field<i64>,

    #[validate(custom(function = "required_movement_type"))]
    #[serde(default)]
    #[schema(value_type = MovementType)]
    pub movement_type: Field<MovementType>,

    // Sinal livre: o efeito de cada tipo é decidido pela procedure.
    #[validate(custom(function = "required_quantity"))]
    #[serde(default)]
    #[schema(value_type = f64, example = 10)]
    pub quantity: Field<Decimal>,

    #[validate(custom(function = "reason_text"))]
    #[serde(default)]
    #[schema(value_type = Option<String>, max_length = 255)]
    pub reason: Field<String>,

    #[validate(custom(function = "nullable_text_50"))]
    #[serde(default)]
    #[schema(value_type = Option<String>, max_length = 50)]
    pub reference_document: Field<String>,

    #[validate(custom(function = "nullable_text_30"))]
    #[serde(default)]
    #[schema(value_type = Option<String>, max_length = 30)]
    pub batch_number: Field<String>,

    #[validate(custom(function = "nullable_date"))]
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
    pub expiration_date: Field<NaiveDate>,

    #[validate(custom(function = "nullable_text_50"))]
    #[serde(default)]
    #[schema(value_type = Option<String>, max_length = 50)]
    pub location: Field<String>,

    #[validate(custom(function = "nullable_unit_cost"))]
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub unit_cost: Field<Decimal>,
}

impl CreateStockMovementPayload {
    pub fn into_params(self, credential: &Credential) -> Result<NewStockMovement, AppError> {
        Ok(NewStockMovement {
            id_account: credential.id_account,
            id_user: credential.id_user,
            id_product: self.id_product.require("id_product")?,
            movement_type: self.movement_type.require("movement_type")?,
            quantity: self.quantity.require("quantity")?,
            reason: self.reason.into_option(),
            reference_document: self.reference_document.into_option(),
            batch_number: self.batch_number.into_option(),
            expiration_date: self.expiration_date.into_option(),
            location: self.location.into_option(),
            unit_cost: self.unit_cost.into_option(),
        })
    }
}

// ---
// Query: ListStockMovements
// ---
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListStockMovementsQuery {
    #[validate(custom(function = "optional_id"))]
    #[serde(default)]
    #[param(value_type = Option<i64>)]
    pub id_product: Field<i64>,

    #[validate(custom(function = "optional_movement_type"))]
    #[serde(default)]
    #[param(value_type = Option<MovementType>)]
    pub movement_type: Field<MovementType>,

    #[validate(custom(function = "optional_date"))]
    #[serde(default)]
    #[param(value_type = Option<String>, format = Date)]
    pub start_date: Field<NaiveDate>,

    #[validate(custom(function = "optional_date"))]
    #[serde(default)]
    #[param(value_type = Option<String>, format = Date)]
    pub end_date: Field<NaiveDate>,

    #[validate(custom(function = "optional_id"))]
    #[serde(default)]
    #[param(value_type = Option<i64>)]
    pub id_user: Field<i64>,

    #[validate(custom(function = "optional_text_50"))]
    #[serde(default)]
    #[param(value_type = Option<String>, max_length = 50)]
    pub reference_document: Field<String>,

    #[validate(custom(function = "optional_order_by"))]
    #[serde(default)]
    #[param(value_type = Option<SortOrder>)]
    pub order_by: Field<SortOrder>,

    #[validate(custom(function = "optional_id"))]
    #[serde(default)]
    #[param(value_type = Option<i64>, minimum = 1)]
    pub page: Field<i64>,

    #[validate(custom(function = "page_size"))]
    #[serde(default)]
    #[param(value_type = Option<i64>, minimum = 1, maximum = 100)]
    pub page_size: Field<i64>,
}

impl ListStockMovementsQuery {
    pub fn into_params(self, credential: &Credential) -> MovementFilter {
        MovementFilter {
            id_account: credential.id_account,
            id_product: self.id_product.into_option(),
            movement_type: self.movement_type.into_option(),
            start_date: self.start_date.into_option(),
            end_date: self.end_date.into_option(),
            id_user: self.id_user.into_option(),
            reference_document: self.reference_document.into_option(),
            order_by: self.order_by.into_option(),
            page: self.page.into_option(),
            page_size: self.page_size.into_option(),
        }
    }
}

// ---
// Path: GetStockMovementById
// ---
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct StockMovementIdParams {
    /// ID da movimentação
    #[validate(custom(function = "required_id"))]
    #[serde(default)]
    #[param(value_type = i64)]
    pub id: Field<i64>,
}

impl StockMovementIdParams {
    pub fn into_params(self, credential: &Credential) -> Result<MovementLookup, AppError> {
        Ok(MovementLookup {
            id_account: credential.id_account,
            id_stock_movement: self.id.require("id")?,
        })
    }
}

// ---
// Query: GetCurrentStock
// ---
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CurrentStockParams {
    /// Sem `idProduct`, devolve todos os produtos da conta
    #[validate(custom(function = "optional_id"))]
    #[serde(default)]
    #[param(value_type = Option<i64>)]
    pub id_product: Field<i64>,
}

impl CurrentStockParams {
    pub fn into_params(self, credential: &Credential) -> CurrentStockQuery {
        CurrentStockQuery {
            id_account: credential.id_account,
            id_product: self.id_product.into_option(),
        }
    }
}

// ---
// Handlers
// ---

#[utoipa::path(
    post,
    path = "/stock-movement",
    tag = "Stock Movements",
    request_body = CreateStockMovementPayload,
    responses(
        (status = 200, description = "Movimentação registrada (envelope com `data`)", body = MovementCreated),
        (status = 400, description = "Validação ou regra de negócio", body = ErrorBody),
        (status = 401, description = "Token ausente ou inválido", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_stock_movement(
    State(app_state): State<AppState>,
    credential: Credential,
    Candidate(payload): Candidate<CreateStockMovementPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    authorize::<PermStockMovementCreate>(&app_state, &credential).await?;

    let created = app_state
        .stock_movement_service
        .create(payload.into_params(&credential)?)
        .await?;

    Ok(Json(ApiResponse::success(created)))
}

#[utoipa::path(
    get,
    path = "/stock-movement",
    tag = "Stock Movements",
    params(ListStockMovementsQuery),
    responses(
        (status = 200, description = "Página de movimentações (envelope com `data`)", body = MovementPage),
        (status = 400, description = "Filtros inválidos", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_stock_movements(
    State(app_state): State<AppState>,
    credential: Credential,
    Candidate(query): Candidate<ListStockMovementsQuery>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;
    authorize::<PermStockMovementRead>(&app_state, &credential).await?;

    let page = app_state
        .stock_movement_service
        .list(query.into_params(&credential))
        .await?;

    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    get,
    path = "/stock-movement/{id}",
    tag = "Stock Movements",
    params(StockMovementIdParams),
    responses(
        (status = 200, description = "Movimentação encontrada, ou `data: null`", body = StockMovement),
        (status = 400, description = "ID inválido", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_stock_movement(
    State(app_state): State<AppState>,
    credential: Credential,
    Candidate(params): Candidate<StockMovementIdParams>,
) -> Result<impl IntoResponse, AppError> {
    params.validate()?;
    authorize::<PermStockMovementRead>(&app_state, &credential).await?;

    let movement = app_state
        .stock_movement_service
        .get_by_id(params.into_params(&credential)?)
        .await?;

    Ok(Json(ApiResponse::success(movement)))
}

#[utoipa::path(
    get,
    path = "/stock-current",
    tag = "Stock Movements",
    params(CurrentStockParams),
    responses(
        (status = 200, description = "Estoque atual por produto", body = CurrentStockReport),
        (status = 400, description = "Filtro inválido", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_current_stock(
    State(app_state): State<AppState>,
    credential: Credential,
    Candidate(params): Candidate<CurrentStockParams>,
) -> Result<impl IntoResponse, AppError> {
    params.validate()?;
    authorize::<PermStockMovementRead>(&app_state, &credential).await?;

    let report = app_state
        .stock_movement_service
        .get_current_stock(params.into_params(&credential))
        .await?;

    Ok(Json(ApiResponse::success(report)))
}

// src/services/stock_movement_service.rs

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::{
        procedure::{decode_row, decode_rows},
        procedures, DatabaseError, ExpectedReturn, ProcedureCall, ProcedureExecutor,
    },
    models::stock_movement::{
        CurrentStock, CurrentStockQuery, CurrentStockReport, MovementCreated, MovementFilter,
        MovementLookup, MovementPage, NewStockMovement, Pagination, StockMovement,
    },
};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Repassa as chamadas para as procedures de movimentação de estoque.
///
/// Não existe regra de negócio aqui: saldo, efeito de cada tipo de
/// movimentação e situação do estoque são calculados pelas procedures.
/// Cada operação tem uma variante `*_with` que recebe outro executor
/// (por exemplo uma `DbTransaction` aberta por quem chamou).
#[derive(Clone)]
pub struct StockMovementService {
    gateway: Arc<dyn ProcedureExecutor>,
}

impl StockMovementService {
    pub fn new(gateway: Arc<dyn ProcedureExecutor>) -> Self {
        Self { gateway }
    }

    // --- CREATE ---
    pub async fn create(&self, params: NewStockMovement) -> Result<MovementCreated, AppError> {
        Self::create_with(self.gateway.as_ref(), params).await
    }

    pub async fn create_with(
        executor: &dyn ProcedureExecutor,
        params: NewStockMovement,
    ) -> Result<MovementCreated, AppError> {
        let call = ProcedureCall::new(procedures::STOCK_MOVEMENT_CREATE)
            .param("idAccount", params.id_account)
            .param("idUser", params.id_user)
            .param("idProduct", params.id_product)
            .param("movementType", params.movement_type.as_str())
            .param("quantity", params.quantity)
            .param("reason", non_empty(params.reason))
            .param("referenceDocument", non_empty(params.reference_document))
            .param("batchNumber", non_empty(params.batch_number))
            .param("expirationDate", params.expiration_date)
            .param("location", non_empty(params.location))
            .param("unitCost", params.unit_cost);

        let row = executor
            .execute(&call, ExpectedReturn::Single)
            .await?
            .into_single()?
            .ok_or_else(|| {
                DatabaseError::UnexpectedShape(format!(
                    "{} não devolveu o id criado",
                    procedures::STOCK_MOVEMENT_CREATE
                ))
            })?;

        let created: MovementCreated = decode_row(row)?;
        tracing::info!(
            account = params.id_account,
            product = params.id_product,
            movement = created.id_stock_movement,
            "Movimentação de estoque registrada ({})",
            params.movement_type.as_str()
        );
        Ok(created)
    }

    // --- LIST ---
    pub async fn list(&self, filter: MovementFilter) -> Result<MovementPage, AppError> {
        Self::list_with(self.gateway.as_ref(), filter).await
    }

    pub async fn list_with(
        executor: &dyn ProcedureExecutor,
        filter: MovementFilter,
    ) -> Result<MovementPage, AppError> {
        let page_size = filter.page_size.unwrap_or(DEFAULT_PAGE_SIZE);

        let call = ProcedureCall::new(procedures::STOCK_MOVEMENT_LIST)
            .param("idAccount", filter.id_account)
            .param("idProduct", filter.id_product)
            .param("movementType", filter.movement_type.map(|t| t.as_str()))
            .param("startDate", filter.start_date)
            .param("endDate", filter.end_date)
            .param("idUser", filter.id_user)
            .param("referenceDocument", non_empty(filter.reference_document))
            .param("orderBy", filter.order_by.unwrap_or_default().as_str())
            .param("page", filter.page.unwrap_or(DEFAULT_PAGE))
            .param("pageSize", page_size);

        let mut sets = executor
            .execute(&call, ExpectedReturn::Multi)
            .await?
            .into_result_sets()?
            .into_iter();

        let movements: Vec<StockMovement> = decode_rows(sets.next().unwrap_or_default())?;
        let pagination = match sets.next().and_then(|rows| rows.into_iter().next()) {
            Some(row) => decode_row(row)?,
            None => Pagination::empty(page_size),
        };

        Ok(MovementPage {
            movements,
            pagination,
        })
    }

    // --- GET BY ID ---
    pub async fn get_by_id(&self, lookup: MovementLookup) -> Result<Option<StockMovement>, AppError> {
        Self::get_by_id_with(self.gateway.as_ref(), lookup).await
    }

    pub async fn get_by_id_with(
        executor: &dyn ProcedureExecutor,
        lookup: MovementLookup,
    ) -> Result<Option<StockMovement>, AppError> {
        let call = ProcedureCall::new(procedures::STOCK_MOVEMENT_GET)
            .param("idAccount", lookup.id_account)
            .param("idStockMovement", lookup.id_stock_movement);

        let row = executor
            .execute(&call, ExpectedReturn::Single)
            .await?
            .into_single()?;

        Ok(row.map(decode_row).transpose()?)
    }

    // --- CURRENT STOCK ---
    pub async fn get_current_stock(
        &self,
        query: CurrentStockQuery,
    ) -> Result<CurrentStockReport, AppError> {
        Self::get_current_stock_with(self.gateway.as_ref(), query).await
    }

    pub async fn get_current_stock_with(
        executor: &dyn ProcedureExecutor,
        query: CurrentStockQuery,
    ) -> Result<CurrentStockReport, AppError> {
        let call = ProcedureCall::new(procedures::STOCK_CURRENT_GET)
            .param("idAccount", query.id_account)
            .param("idProduct", query.id_product);

        let sets = executor
            .execute(&call, ExpectedReturn::Multi)
            .await?
            .into_result_sets()?;

        // A procedure pode devolver o estoque em mais de um cursor; todos entram.
        let stock: Vec<CurrentStock> = decode_rows(sets.into_iter().flatten().collect())?;
        Ok(CurrentStockReport { stock })
    }
}

// String vazia vai como NULL para a procedure.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

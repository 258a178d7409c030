// src/presentation.rs

use chrono::{DateTime, Utc};
use comfy_table::{presets::UTF8_FULL_CONDENSED, CellAlignment, Table};
use rust_decimal::Decimal;
use validator::ValidationErrors;

use crate::{
    common::coerce::{max_length, message_error, positive_number},
    models::stock_movement::{
        CurrentStock, MovementDraft, MovementType, Pagination, StockMovement, StockStatus,
    },
};

pub const EMPTY_MOVEMENTS: &str = "Nenhuma movimentação encontrada";
pub const EMPTY_STOCK: &str = "Nenhum produto em estoque";

// ---
// Rótulos
// ---
pub fn movement_type_label(movement_type: MovementType) -> &'static str {
    match movement_type {
        MovementType::Entrada => "Entrada",
        MovementType::Saida => "Saída",
        MovementType::Ajuste => "Ajuste",
        MovementType::Criacao => "Criação",
        MovementType::Exclusao => "Exclusão",
    }
}

pub fn status_label(status: StockStatus) -> &'static str {
    match status {
        StockStatus::Normal => "Normal",
        StockStatus::Baixo => "Baixo",
        StockStatus::Critico => "Crítico",
        StockStatus::Excesso => "Excesso",
    }
}

/// Quantidades positivas ganham o prefixo `+`.
pub fn format_quantity(quantity: Decimal) -> String {
    let normalized = quantity.normalize();
    if normalized > Decimal::ZERO {
        format!("+{normalized}")
    } else {
        normalized.to_string()
    }
}

pub fn format_date_time(date_time: DateTime<Utc>) -> String {
    date_time.format("%d/%m/%Y %H:%M").to_string()
}

fn optional_decimal(value: Option<Decimal>) -> String {
    value
        .map(|v| v.normalize().to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn product_label(id_product: i64, product_name: Option<&str>) -> String {
    match product_name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("Produto #{id_product}"),
    }
}

fn user_label(id_user: i64, user_name: Option<&str>) -> String {
    match user_name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("Usuário #{id_user}"),
    }
}

// ---
// Tabelas
// ---
pub fn movements_table(movements: &[StockMovement]) -> String {
    if movements.is_empty() {
        return EMPTY_MOVEMENTS.to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_header(["ID", "Data/Hora", "Produto", "Tipo", "Quantidade", "Saldo", "Usuário"]);

    for movement in movements {
        table.add_row([
            movement.id_stock_movement.to_string(),
            format_date_time(movement.date_time),
            product_label(movement.id_product, movement.product_name.as_deref()),
            movement_type_label(movement.movement_type).to_string(),
            format_quantity(movement.quantity),
            optional_decimal(movement.running_balance),
            user_label(movement.id_user, movement.user_name.as_deref()),
        ]);
    }

    for col in [4, 5] {
        if let Some(column) = table.column_mut(col) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }

    table.to_string()
}

pub fn current_stock_table(stock: &[CurrentStock]) -> String {
    if stock.is_empty() {
        return EMPTY_STOCK.to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_header(["Produto", "Quantidade Atual", "Mínimo", "Máximo", "Status"]);

    for item in stock {
        table.add_row([
            item.product_name.clone(),
            item.current_quantity.normalize().to_string(),
            optional_decimal(item.minimum_quantity),
            optional_decimal(item.maximum_quantity),
            status_label(item.status).to_string(),
        ]);
    }

    for col in 1..=3 {
        if let Some(column) = table.column_mut(col) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }

    table.to_string()
}

pub fn pagination_line(pagination: &Pagination) -> String {
    format!(
        "Página {} de {} ({} registros)",
        pagination.current_page,
        pagination.total_pages.max(1),
        pagination.total_records
    )
}

/// Ficha de uma movimentação (todos os campos, um por linha).
pub fn movement_details(movement: &StockMovement) -> String {
    let text = |value: Option<&str>| value.unwrap_or("-").to_string();

    let rows = [
        ("ID", movement.id_stock_movement.to_string()),
        ("Data/Hora", format_date_time(movement.date_time)),
        ("Produto", product_label(movement.id_product, movement.product_name.as_deref())),
        ("Tipo", movement_type_label(movement.movement_type).to_string()),
        ("Quantidade", format_quantity(movement.quantity)),
        ("Usuário", user_label(movement.id_user, movement.user_name.as_deref())),
        ("Motivo", text(movement.reason.as_deref())),
        ("Documento de Referência", text(movement.reference_document.as_deref())),
        ("Número do Lote", text(movement.batch_number.as_deref())),
        (
            "Data de Validade",
            movement
                .expiration_date
                .map(|d| d.format("%d/%m/%Y").to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        ("Localização", text(movement.location.as_deref())),
        ("Custo Unitário", optional_decimal(movement.unit_cost)),
    ];

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    for (label, value) in rows {
        table.add_row([label.to_string(), value]);
    }

    table.to_string()
}

// ---
// Regras do formulário (antes de enviar)
// ---
pub fn validate_draft(draft: &MovementDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if draft.id_product <= 0 {
        errors.add("id_product", message_error("too_small", "Produto é obrigatório".into()));
    }
    if draft.quantity.is_zero() {
        errors.add("quantity", message_error("custom", "Quantidade não pode ser zero".into()));
    }

    let limits: [(&'static str, Option<&str>, usize); 4] = [
        ("reason", draft.reason.as_deref(), 255),
        ("reference_document", draft.reference_document.as_deref(), 50),
        ("batch_number", draft.batch_number.as_deref(), 30),
        ("location", draft.location.as_deref(), 50),
    ];
    for (field, value, max) in limits {
        if let Some(Err(e)) = value.map(|v| max_length(v, max)) {
            errors.add(field, e);
        }
    }

    if let Some(Err(e)) = draft.unit_cost.as_ref().map(positive_number) {
        errors.add("unit_cost", e);
    }

    if errors.errors().is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Avisos que não impedem o envio: o formulário só marca o motivo com `*`
/// para ajuste e exclusão, quem decide é a procedure.
pub fn draft_warnings(draft: &MovementDraft) -> Vec<&'static str> {
    let mut warnings = Vec::new();

    let reason_expected = matches!(draft.movement_type, MovementType::Ajuste | MovementType::Exclusao);
    let reason_missing = draft.reason.as_deref().is_none_or(|r| r.trim().is_empty());
    if reason_expected && reason_missing {
        warnings.push("Motivo recomendado para ajuste e exclusão");
    }

    warnings
}

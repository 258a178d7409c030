// src/db/row.rs

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde_json::{Map, Value};
use sqlx::{postgres::PgRow, Column, Row as _, TypeInfo, ValueRef};

use super::procedure::{DatabaseError, Row};

// As procedures devolvem colunas com tipos variados e nós não conhecemos o
// formato em tempo de compilação. Convertemos coluna a coluna para JSON e
// deixamos o serde montar o registro declarado depois.
pub(crate) fn row_to_json(row: &PgRow) -> Result<Row, DatabaseError> {
    let mut map = Map::with_capacity(row.columns().len());

    for column in row.columns() {
        let idx = column.ordinal();
        let name = column.name().to_string();

        if row.try_get_raw(idx)?.is_null() {
            map.insert(name, Value::Null);
            continue;
        }

        let value = match column.type_info().name() {
            "BOOL" => Value::from(row.try_get::<bool, _>(idx)?),
            "INT2" => Value::from(row.try_get::<i16, _>(idx)?),
            "INT4" => Value::from(row.try_get::<i32, _>(idx)?),
            "INT8" => Value::from(row.try_get::<i64, _>(idx)?),
            "FLOAT4" => Value::from(f64::from(row.try_get::<f32, _>(idx)?)),
            "FLOAT8" => Value::from(row.try_get::<f64, _>(idx)?),
            "NUMERIC" => numeric_to_json(row.try_get::<Decimal, _>(idx)?)?,
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CITEXT" => {
                Value::from(row.try_get::<String, _>(idx)?)
            }
            "DATE" => Value::from(row.try_get::<NaiveDate, _>(idx)?.to_string()),
            // Timestamps sem fuso são tratados como UTC.
            "TIMESTAMP" => Value::from(row.try_get::<NaiveDateTime, _>(idx)?.and_utc().to_rfc3339()),
            "TIMESTAMPTZ" => Value::from(row.try_get::<DateTime<Utc>, _>(idx)?.to_rfc3339()),
            "JSON" | "JSONB" => row.try_get::<sqlx::types::Json<Value>, _>(idx)?.0,
            other => {
                return Err(DatabaseError::UnsupportedColumn {
                    column: name,
                    type_name: other.to_string(),
                });
            }
        };
        map.insert(name, value);
    }

    Ok(map)
}

// NUMERIC inteiro (ex.: `CEIL(count::numeric / size)`) vira inteiro no JSON,
// senão o serde não monta campos `i64` como `totalPages`.
fn numeric_to_json(value: Decimal) -> Result<Value, serde_json::Error> {
    let normalized = value.normalize();
    if normalized.scale() == 0 {
        if let Some(n) = normalized.to_i64() {
            return Ok(Value::from(n));
        }
    }
    serde_json::to_value(value)
}

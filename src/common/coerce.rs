// src/common/coerce.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::{ValidationError, ValidationErrors};

// ---
// Campo "tolerante" das requisições
// ---
/// Valor de entrada que nunca falha na desserialização.
///
/// Query string, path e body chegam misturados (e muitas vezes como texto).
/// Em vez de abortar no primeiro tipo errado, guardamos o valor bruto em
/// `Invalid` e deixamos o `validator` listar todos os campos com problema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Field<T> {
    Missing,
    Null,
    Value(T),
    Invalid(Value),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Missing
    }
}

impl<T> Field<T> {
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Ausente, nulo ou inválido viram `None`.
    pub fn into_option(self) -> Option<T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Extrai um campo obrigatório. Só falha se `validate()` não foi chamado antes.
    pub fn require(self, field: &'static str) -> Result<T, ValidationErrors> {
        match self {
            Field::Value(v) => Ok(v),
            _ => {
                let mut errors = ValidationErrors::new();
                errors.add(field, message_error("required", "Required".to_string()));
                Err(errors)
            }
        }
    }
}

impl<'de, T: Coerce> Deserialize<'de> for Field<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(match raw {
            Value::Null => Field::Null,
            other => match T::coerce(&other) {
                Some(v) => Field::Value(v),
                None => Field::Invalid(other),
            },
        })
    }
}

/// Conversão de um valor JSON "cru" para o tipo do campo.
pub trait Coerce: Sized {
    /// Nome usado nas mensagens ("number", "string", "date").
    const EXPECTED: &'static str;

    fn coerce(raw: &Value) -> Option<Self>;

    /// Mensagem para um valor que não pôde ser convertido.
    fn invalid_message(raw: &Value) -> String {
        format!("Expected {}, received {}", Self::EXPECTED, kind_of(raw))
    }
}

impl Coerce for i64 {
    const EXPECTED: &'static str = "integer";

    fn coerce(raw: &Value) -> Option<Self> {
        match raw {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15).map(|f| f as i64)),
            Value::String(s) => {
                let trimmed = s.trim();
                trimmed.parse::<i64>().ok().or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                        .map(|f| f as i64)
                })
            }
            _ => None,
        }
    }
}

impl Coerce for Decimal {
    const EXPECTED: &'static str = "number";

    fn coerce(raw: &Value) -> Option<Self> {
        let text = match raw {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.trim().to_string(),
            _ => return None,
        };
        if text.is_empty() {
            return None;
        }
        text.parse::<Decimal>()
            .ok()
            .or_else(|| Decimal::from_scientific(&text).ok())
    }
}

impl Coerce for String {
    const EXPECTED: &'static str = "string";

    fn coerce(raw: &Value) -> Option<Self> {
        raw.as_str().map(str::to_string)
    }
}

impl Coerce for NaiveDate {
    const EXPECTED: &'static str = "date";

    fn coerce(raw: &Value) -> Option<Self> {
        raw.as_str()
            .filter(|s| is_iso_date_shape(s))
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    }

    fn invalid_message(raw: &Value) -> String {
        match raw {
            Value::String(_) => "Invalid date".to_string(),
            other => format!("Expected string, received {}", kind_of(other)),
        }
    }
}

// Exatamente `AAAA-MM-DD`, com zeros à esquerda.
fn is_iso_date_shape(s: &str) -> bool {
    s.len() == 10
        && s.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Enums com valores literais fixos (tipo de movimentação, ordenação...).
pub trait LiteralEnum: Sized + 'static {
    const VARIANTS: &'static [(&'static str, Self)];
}

pub(crate) fn literal_from<T: LiteralEnum + Copy>(raw: &Value) -> Option<T> {
    let text = raw.as_str()?;
    T::VARIANTS
        .iter()
        .find(|(name, _)| *name == text)
        .map(|(_, v)| *v)
}

pub(crate) fn literal_message<T: LiteralEnum>(raw: &Value) -> String {
    let expected = T::VARIANTS
        .iter()
        .map(|(name, _)| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(" | ");
    match raw {
        Value::String(s) => format!("Invalid enum value. Expected {expected}, received '{s}'"),
        other => format!("Expected {expected}, received {}", kind_of(other)),
    }
}

fn kind_of(raw: &Value) -> &'static str {
    match raw {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn message_error(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

// ---
// Regras reutilizáveis (chamadas pelas funções `custom` dos schemas)
// ---

/// Se o campo pode faltar e/ou vir `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    Nullable,
}

/// Verifica presença e tipo, e aplica `rule` sobre o valor convertido.
pub fn check<T, F>(field: &Field<T>, presence: Presence, rule: F) -> Result<(), ValidationError>
where
    T: Coerce,
    F: FnOnce(&T) -> Result<(), ValidationError>,
{
    match (field, presence) {
        (Field::Missing, Presence::Required) => Err(message_error("required", "Required".into())),
        (Field::Null, Presence::Required) => Err(message_error(
            "invalid_type",
            format!("Expected {}, received null", T::EXPECTED),
        )),
        (Field::Null, Presence::Optional) => Err(message_error(
            "invalid_type",
            format!("Expected {}, received null", T::EXPECTED),
        )),
        (Field::Missing, _) | (Field::Null, Presence::Nullable) => Ok(()),
        (Field::Invalid(raw), _) => Err(message_error("invalid_type", T::invalid_message(raw))),
        (Field::Value(v), _) => rule(v),
    }
}

/// Mesma lógica de `check`, para os enums literais.
pub fn check_literal<T: LiteralEnum>(field: &Field<T>, presence: Presence) -> Result<(), ValidationError> {
    match (field, presence) {
        (Field::Missing, Presence::Required) => Err(message_error("required", "Required".into())),
        (Field::Null, Presence::Required | Presence::Optional) => Err(message_error(
            "invalid_type",
            literal_message::<T>(&Value::Null),
        )),
        (Field::Invalid(raw), _) => Err(message_error("invalid_enum_value", literal_message::<T>(raw))),
        _ => Ok(()),
    }
}

pub fn positive_integer(value: &i64) -> Result<(), ValidationError> {
    if *value <= 0 {
        let mut err = message_error("too_small", "Number must be greater than 0".into());
        err.add_param("min".into(), &1);
        return Err(err);
    }
    Ok(())
}

pub fn positive_number(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        let mut err = message_error("too_small", "Number must be greater than 0".into());
        err.add_param("min".into(), &0);
        return Err(err);
    }
    Ok(())
}

pub fn max_length(value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        let mut err = message_error(
            "too_big",
            format!("String must contain at most {max} character(s)"),
        );
        err.add_param("max".into(), &max);
        return Err(err);
    }
    Ok(())
}

pub fn at_most(value: &i64, max: i64) -> Result<(), ValidationError> {
    if *value > max {
        let mut err = message_error("too_big", format!("Number must be less than or equal to {max}"));
        err.add_param("max".into(), &max);
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::str::FromStr;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default)]
        id: Field<i64>,
        #[serde(default)]
        amount: Field<Decimal>,
        #[serde(default)]
        day: Field<NaiveDate>,
    }

    fn probe(value: Value) -> Probe {
        serde_json::from_value(value).expect("Field nunca deve falhar")
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let p = probe(json!({ "id": "42", "amount": "10.5" }));
        assert_eq!(p.id, Field::Value(42));
        assert_eq!(p.amount, Field::Value(Decimal::from_str("10.5").unwrap()));
        assert_eq!(p.day, Field::Missing);
    }

    #[test]
    fn integral_floats_count_as_integers() {
        assert_eq!(probe(json!({ "id": 7.0 })).id, Field::Value(7));
        assert!(matches!(probe(json!({ "id": 7.5 })).id, Field::Invalid(_)));
    }

    #[test]
    fn bad_values_are_kept_instead_of_failing() {
        let p = probe(json!({ "id": "abc", "amount": true, "day": "2024-13-40" }));
        assert!(matches!(p.id, Field::Invalid(_)));
        assert!(matches!(p.amount, Field::Invalid(_)));
        assert!(matches!(p.day, Field::Invalid(_)));
    }

    #[test]
    fn dates_need_zero_padding() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(probe(json!({ "day": "2024-01-05" })).day, Field::Value(day));
        for bad in ["2024-1-5", "2024-01-5", "2024-1-05", "24-01-05", "2024/01/05", "2024-01-05T00:00"] {
            assert!(matches!(probe(json!({ "day": bad })).day, Field::Invalid(_)), "{bad}");
        }
    }

    #[test]
    fn null_is_distinct_from_missing() {
        let p = probe(json!({ "id": null }));
        assert_eq!(p.id, Field::Null);
        assert!(check(&p.id, Presence::Nullable, positive_integer).is_ok());
        assert!(check(&p.id, Presence::Optional, positive_integer).is_err());
        assert!(check(&Field::<i64>::Missing, Presence::Optional, positive_integer).is_ok());
    }

    #[test]
    fn required_reports_zod_like_message() {
        let err = check(&Field::<i64>::Missing, Presence::Required, positive_integer).unwrap_err();
        assert_eq!(err.code, "required");
        assert_eq!(err.message.as_deref(), Some("Required"));
    }

    #[test]
    fn ranges_and_lengths() {
        assert!(positive_integer(&0).is_err());
        assert!(positive_integer(&-3).is_err());
        assert!(positive_integer(&1).is_ok());
        assert!(positive_number(&Decimal::ZERO).is_err());
        assert!(max_length("abcd", 3).is_err());
        assert!(max_length("ção", 3).is_ok());
        assert!(at_most(&101, 100).is_err());
        assert!(at_most(&100, 100).is_ok());
    }

    #[test]
    fn require_extracts_or_fails() {
        assert_eq!(Field::Value(3_i64).require("id").unwrap(), 3);
        let errors = Field::<i64>::Null.require("id").unwrap_err();
        assert!(errors.field_errors().contains_key("id"));
    }
}

//! Declarative request validation.
//!
//! Each endpoint owns a rule set: an ordered list of named checks per field,
//! expressed as data so the tables can be inspected and tested on their own.
//! Evaluation visits every field and collects every violation into a
//! field-keyed error map; within a single field, checks stop at the first
//! violation. Reference and uniqueness checks round-trip to the database.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use sqlx::SqlitePool;

use super::error::{ApiError, FieldErrors};
use super::phone;

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
}

/// A single named check. `Exists` and `Unique` reference only fixed table
/// and column names declared in the rule tables, never request data.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    Required,
    TypeString,
    TypeInteger,
    TypeBoolean,
    Email,
    MaxLen(usize),
    MinLen(usize),
    /// Field must equal another field of the same payload.
    Same { other: &'static str },
    /// Referenced id must exist in a lookup table.
    Exists {
        table: &'static str,
        message: &'static str,
    },
    /// Value must not already be present in `table.column`. On updates the
    /// row identified by `exclude_by` = the target id is ignored.
    Unique {
        table: &'static str,
        column: &'static str,
        exclude_by: &'static str,
        message: &'static str,
    },
    Phone,
}

/// Rules for one payload field, with the Spanish display label used in the
/// violation messages.
#[derive(Debug, Clone, Copy)]
pub struct FieldRules {
    pub field: &'static str,
    pub label: &'static str,
    pub rules: &'static [Rule],
}

pub type RuleSet = &'static [FieldRules];

/// Evaluate a rule set against a flat payload map.
///
/// Returns the full error map as a 400 `ApiError` when any field fails; the
/// caller must not have mutated anything yet. `exclude_id` is the target's
/// owning account id, honored by `Unique` rules on partial updates.
pub async fn validate(
    pool: &SqlitePool,
    payload: &Map<String, Value>,
    rules: RuleSet,
    exclude_id: Option<&str>,
) -> Result<(), ApiError> {
    let mut errors: FieldErrors = FieldErrors::new();

    for field_rules in rules {
        let value = payload.get(field_rules.field);
        for rule in field_rules.rules {
            if let Some(message) = check(pool, payload, field_rules, rule, value, exclude_id).await? {
                errors
                    .entry(field_rules.field.to_string())
                    .or_default()
                    .push(message);
                // Later checks on this field assume the earlier ones held.
                break;
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(errors))
    }
}

/// Evaluate one rule. `Ok(Some(message))` is a violation.
async fn check(
    pool: &SqlitePool,
    payload: &Map<String, Value>,
    field_rules: &FieldRules,
    rule: &Rule,
    value: Option<&Value>,
    exclude_id: Option<&str>,
) -> Result<Option<String>, ApiError> {
    let label = field_rules.label;

    // Optional fields skip every check except Required when absent.
    let value = match value {
        Some(v) if !v.is_null() => v,
        _ => {
            return match rule {
                Rule::Required => Ok(Some(format!("El campo {} es obligatorio", label))),
                _ => Ok(None),
            }
        }
    };

    let violation = match rule {
        Rule::Required => {
            if value.as_str().is_some_and(str::is_empty) {
                Some(format!("El campo {} es obligatorio", label))
            } else {
                None
            }
        }
        Rule::TypeString => {
            if value.is_string() {
                None
            } else {
                Some(format!("El campo {} debe ser una cadena de texto", label))
            }
        }
        Rule::TypeInteger => {
            if as_integer(value).is_some() {
                None
            } else {
                Some(format!("El campo {} debe ser un número entero", label))
            }
        }
        Rule::TypeBoolean => {
            if as_boolean(value).is_some() {
                None
            } else {
                Some(format!("El campo {} debe ser un valor booleano", label))
            }
        }
        Rule::Email => match value.as_str() {
            Some(s) if EMAIL_REGEX.is_match(s) => None,
            _ => Some(format!(
                "El campo {} debe ser una dirección de correo válida",
                label
            )),
        },
        Rule::MaxLen(max) => match value.as_str() {
            Some(s) if s.chars().count() > *max => Some(format!(
                "El campo {} debe tener un máximo de {} caracteres",
                label, max
            )),
            _ => None,
        },
        Rule::MinLen(min) => match value.as_str() {
            Some(s) if s.chars().count() < *min => Some(format!(
                "El campo {} debe tener al menos {} caracteres",
                label, min
            )),
            _ => None,
        },
        Rule::Same { other } => {
            if payload.get(*other) == Some(value) {
                None
            } else {
                Some("Las contraseñas no coinciden".to_string())
            }
        }
        Rule::Exists { table, message } => {
            let Some(id) = as_integer(value) else {
                return Ok(Some(message.to_string()));
            };
            let count: i64 =
                sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {} WHERE id = ?", table))
                    .bind(id)
                    .fetch_one(pool)
                    .await?;
            if count == 0 {
                Some(message.to_string())
            } else {
                None
            }
        }
        Rule::Unique {
            table,
            column,
            exclude_by,
            message,
        } => {
            let submitted = match value.as_str() {
                Some(s) => s.to_string(),
                None => value.to_string(),
            };
            let count: i64 = match exclude_id {
                Some(id) => {
                    sqlx::query_scalar(&format!(
                        "SELECT COUNT(*) FROM {} WHERE {} = ? AND {} != ?",
                        table, column, exclude_by
                    ))
                    .bind(&submitted)
                    .bind(id)
                    .fetch_one(pool)
                    .await?
                }
                None => {
                    sqlx::query_scalar(&format!(
                        "SELECT COUNT(*) FROM {} WHERE {} = ?",
                        table, column
                    ))
                    .bind(&submitted)
                    .fetch_one(pool)
                    .await?
                }
            };
            if count > 0 {
                Some(message.to_string())
            } else {
                None
            }
        }
        Rule::Phone => match value.as_str() {
            Some(s) if phone::is_valid_shape(s) => None,
            _ => Some(format!(
                "El campo {} no es un número de teléfono válido",
                label
            )),
        },
    };

    Ok(violation)
}

/// Integer coercion: JSON numbers and integer-shaped strings both count.
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Boolean coercion: JSON booleans plus the 0/1 forms the SPA submits.
fn as_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RULES: RuleSet = &[
        FieldRules {
            field: "nombres",
            label: "nombres",
            rules: &[Rule::Required, Rule::TypeString, Rule::MaxLen(100)],
        },
        FieldRules {
            field: "email",
            label: "correo electrónico",
            rules: &[
                Rule::Required,
                Rule::Email,
                Rule::Unique {
                    table: "usuarios",
                    column: "email",
                    exclude_by: "id",
                    message: "El correo electrónico ingresado ya está registrado",
                },
            ],
        },
        FieldRules {
            field: "id_carrera",
            label: "carrera",
            rules: &[
                Rule::Required,
                Rule::TypeInteger,
                Rule::Exists {
                    table: "carreras",
                    message: "La carrera seleccionada no existe",
                },
            ],
        },
        FieldRules {
            field: "telefono",
            label: "teléfono",
            rules: &[Rule::TypeString, Rule::MaxLen(20), Rule::Phone],
        },
        FieldRules {
            field: "password",
            label: "contraseña",
            rules: &[Rule::Required, Rule::TypeString, Rule::MinLen(8)],
        },
        FieldRules {
            field: "password_confirmation",
            label: "confirmación de contraseña",
            rules: &[Rule::Required, Rule::Same { other: "password" }],
        },
    ];

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn valid_payload() -> Map<String, Value> {
        payload(json!({
            "nombres": "Ana María",
            "email": "ana@uni.edu.sv",
            "id_carrera": 1,
            "telefono": "71234567",
            "password": "secreta123",
            "password_confirmation": "secreta123",
        }))
    }

    #[tokio::test]
    async fn test_valid_payload_passes() {
        let pool = crate::db::test_pool().await;
        let result = validate(&pool, &valid_payload(), RULES, None).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_missing_required_field_is_reported() {
        let pool = crate::db::test_pool().await;
        let mut body = valid_payload();
        body.remove("nombres");

        let err = validate(&pool, &body, RULES, None).await.unwrap_err();
        let errors = err.errors().unwrap();
        assert_eq!(errors["nombres"][0], "El campo nombres es obligatorio");
    }

    #[tokio::test]
    async fn test_violations_collected_across_fields() {
        let pool = crate::db::test_pool().await;
        let body = payload(json!({
            "nombres": 42,
            "email": "not-an-email",
            "id_carrera": 1,
            "password": "corta",
            "password_confirmation": "otra",
        }));

        let err = validate(&pool, &body, RULES, None).await.unwrap_err();
        let errors = err.errors().unwrap();
        assert!(errors.contains_key("nombres"));
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("password"));
        assert!(errors.contains_key("password_confirmation"));
    }

    #[tokio::test]
    async fn test_checks_short_circuit_within_a_field() {
        let pool = crate::db::test_pool().await;
        let mut body = valid_payload();
        body.insert("nombres".to_string(), json!(42));

        let err = validate(&pool, &body, RULES, None).await.unwrap_err();
        // Only the type violation; MaxLen never ran against a non-string.
        assert_eq!(err.errors().unwrap()["nombres"].len(), 1);
    }

    #[tokio::test]
    async fn test_optional_field_skips_checks_when_absent() {
        let pool = crate::db::test_pool().await;
        let mut body = valid_payload();
        body.remove("telefono");

        assert!(validate(&pool, &body, RULES, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_exists_rule_rejects_unknown_reference() {
        let pool = crate::db::test_pool().await;
        let mut body = valid_payload();
        body.insert("id_carrera".to_string(), json!(9999));

        let err = validate(&pool, &body, RULES, None).await.unwrap_err();
        assert_eq!(
            err.errors().unwrap()["id_carrera"][0],
            "La carrera seleccionada no existe"
        );
    }

    #[tokio::test]
    async fn test_unique_rule_rejects_taken_email_and_honors_exclusion() {
        let pool = crate::db::test_pool().await;
        sqlx::query(
            "INSERT INTO usuarios (id, email, password, id_tipo_usuario, estado_usuario, fecha_registro) \
             VALUES ('u-1', 'ana@uni.edu.sv', 'x', 2, 1, '2026-01-01T00:00:00+00:00')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let err = validate(&pool, &valid_payload(), RULES, None).await.unwrap_err();
        assert_eq!(
            err.errors().unwrap()["email"][0],
            "El correo electrónico ingresado ya está registrado"
        );

        // The same email passes when the taken row is the one being updated.
        assert!(validate(&pool, &valid_payload(), RULES, Some("u-1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_validation_does_not_mutate_payload() {
        let pool = crate::db::test_pool().await;
        let body = valid_payload();
        let before = body.clone();
        let _ = validate(&pool, &body, RULES, None).await;
        assert_eq!(body, before);
    }

    #[tokio::test]
    async fn test_phone_rule_rejects_malformed_number() {
        let pool = crate::db::test_pool().await;
        let mut body = valid_payload();
        body.insert("telefono".to_string(), json!("12"));

        let err = validate(&pool, &body, RULES, None).await.unwrap_err();
        assert_eq!(
            err.errors().unwrap()["telefono"][0],
            "El campo teléfono no es un número de teléfono válido"
        );
    }
}

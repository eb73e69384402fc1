//! Shared request flow for the entity endpoints.
//!
//! Both entity kinds run the same ordered steps: authorize, validate the raw
//! payload, canonicalize the phone, re-check the canonical phone against the
//! kind's own table, persist, respond. The kind-specific pieces (rule sets,
//! access table, phone scope) are collected in an [`EntityKind`] descriptor;
//! the controllers own persistence and response assembly.

use serde_json::{Map, Value};
use sqlx::SqlitePool;

use super::auth::Actor;
use super::authz::Action;
use super::error::ApiError;
use super::phone;
use super::validation::{self, RuleSet};

/// Per-kind descriptor: everything the shared steps need to know about a
/// concrete entity table.
pub struct EntityKind {
    /// Entity table; also the uniqueness scope for phone numbers.
    pub table: &'static str,
    pub not_found_message: &'static str,
    pub create_rules: RuleSet,
    pub update_rules: RuleSet,
    pub access: fn(Option<&Actor>, Option<&str>, Action) -> bool,
}

impl EntityKind {
    /// Step 1: classify and turn a denial into the obfuscated response.
    pub fn authorize(
        &self,
        actor: Option<&Actor>,
        target: Option<&str>,
        action: Action,
    ) -> Result<(), ApiError> {
        if (self.access)(actor, target, action) {
            Ok(())
        } else {
            Err(ApiError::denied())
        }
    }

    /// Step 2 for creations: full rule set against the raw payload.
    pub async fn validate_create(
        &self,
        pool: &SqlitePool,
        payload: &Map<String, Value>,
    ) -> Result<(), ApiError> {
        validation::validate(pool, payload, self.create_rules, None).await
    }

    /// Step 2 for updates: partial rule set, uniqueness scoped away from the
    /// record being updated.
    pub async fn validate_update(
        &self,
        pool: &SqlitePool,
        payload: &Map<String, Value>,
        target: &str,
    ) -> Result<(), ApiError> {
        validation::validate(pool, payload, self.update_rules, Some(target)).await
    }

    /// Steps 3 and 4: canonicalize the submitted phone, then re-check the
    /// canonical value for collisions in this kind's own table.
    ///
    /// The rule-set uniqueness check in step 2 ran against the raw value;
    /// this one runs after normalization and is the one that matters, since
    /// two raw spellings can collapse into the same canonical number.
    /// Returns `None` when the payload carries no phone.
    pub async fn canonical_phone(
        &self,
        pool: &SqlitePool,
        payload: &Map<String, Value>,
        exclude_user: Option<&str>,
    ) -> Result<Option<String>, ApiError> {
        let Some(raw) = payload.get("telefono").and_then(Value::as_str) else {
            return Ok(None);
        };

        let telefono = phone::normalize(raw);

        let count: i64 = match exclude_user {
            Some(id) => {
                sqlx::query_scalar(&format!(
                    "SELECT COUNT(*) FROM {} WHERE telefono = ? AND id_usuario != ?",
                    self.table
                ))
                .bind(&telefono)
                .bind(id)
                .fetch_one(pool)
                .await?
            }
            None => {
                sqlx::query_scalar(&format!(
                    "SELECT COUNT(*) FROM {} WHERE telefono = ?",
                    self.table
                ))
                .bind(&telefono)
                .fetch_one(pool)
                .await?
            }
        };

        if count > 0 {
            return Err(ApiError::conflict_field(
                "telefono",
                "El teléfono ingresado ya está en uso",
            ));
        }

        Ok(Some(telefono))
    }

    pub fn not_found(&self) -> ApiError {
        ApiError::not_found(self.not_found_message)
    }
}

/// String field accessor for partial payloads.
pub fn get_str<'a>(payload: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    payload.get(field).and_then(Value::as_str)
}

/// Integer field accessor; accepts integer-shaped strings like the validator.
pub fn get_i64(payload: &Map<String, Value>, field: &str) -> Option<i64> {
    match payload.get(field)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Boolean field accessor; accepts the 0/1 forms the SPA submits.
pub fn get_bool(payload: &Map<String, Value>, field: &str) -> Option<bool> {
    match payload.get(field)? {
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

    fn kind() -> EntityKind {
        EntityKind {
            table: "coordinadores",
            not_found_message: "Coordinador no encontrado",
            create_rules: &[],
            update_rules: &[],
            access: |_, _, _| true,
        }
    }

    #[tokio::test]
    async fn test_canonical_phone_absent_field() {
        let pool = crate::db::test_pool().await;
        let payload = json!({}).as_object().cloned().unwrap();
        let result = kind().canonical_phone(&pool, &payload, None).await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_canonical_phone_detects_normalized_collision() {
        let pool = crate::db::test_pool().await;
        sqlx::query(
            "INSERT INTO usuarios (id, email, password, id_tipo_usuario, estado_usuario, fecha_registro) \
             VALUES ('u-1', 'c@uni.edu.sv', 'x', 2, 1, '2026-01-01T00:00:00+00:00')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO coordinadores (id, id_usuario, nombres, apellidos, id_carrera, telefono) \
             VALUES ('c-1', 'u-1', 'Ana', 'Pérez', 1, '+503 7123-4567')",
        )
        .execute(&pool)
        .await
        .unwrap();

        // A different raw spelling of the same number collides after
        // normalization even though the raw strings differ.
        let payload = json!({"telefono": "71234567"}).as_object().cloned().unwrap();
        let err = kind().canonical_phone(&pool, &payload, None).await.unwrap_err();
        assert_eq!(err.message(), "El teléfono ingresado ya está en uso");

        // The owning record itself is excluded on update.
        let ok = kind()
            .canonical_phone(&pool, &payload, Some("u-1"))
            .await
            .unwrap();
        assert_eq!(ok, Some("+503 7123-4567".to_string()));
    }
}

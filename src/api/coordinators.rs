//! Coordinator CRUD endpoints.
//!
//! Records are addressed by their owning account id throughout; the account
//! row owns the profile row, so deletion goes through `usuarios` and cascades.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use super::auth::{hash_password, Actor};
use super::authz::{self, Action};
use super::error::{ApiError, Envelope};
use super::pipeline::{get_i64, get_str, EntityKind};
use super::validation::{FieldRules, Rule};
use crate::db::{Coordinador, CoordinadorInfo, Role, Usuario};
use crate::AppState;

const CREATE_RULES: &[FieldRules] = &[
    FieldRules {
        field: "nombres",
        label: "nombres",
        rules: &[Rule::Required, Rule::TypeString, Rule::MaxLen(100)],
    },
    FieldRules {
        field: "apellidos",
        label: "apellidos",
        rules: &[Rule::Required, Rule::TypeString, Rule::MaxLen(100)],
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
        rules: &[
            Rule::TypeString,
            Rule::MaxLen(20),
            Rule::Unique {
                table: "coordinadores",
                column: "telefono",
                exclude_by: "id_usuario",
                message: "El teléfono ingresado ya está registrado",
            },
            Rule::Phone,
        ],
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

const UPDATE_RULES: &[FieldRules] = &[
    FieldRules {
        field: "nombres",
        label: "nombres",
        rules: &[Rule::TypeString, Rule::MaxLen(100)],
    },
    FieldRules {
        field: "apellidos",
        label: "apellidos",
        rules: &[Rule::TypeString, Rule::MaxLen(100)],
    },
    FieldRules {
        field: "id_carrera",
        label: "carrera",
        rules: &[
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
        rules: &[Rule::TypeString, Rule::MinLen(8)],
    },
];

static KIND: EntityKind = EntityKind {
    table: "coordinadores",
    not_found_message: "Coordinador no encontrado",
    create_rules: CREATE_RULES,
    update_rules: UPDATE_RULES,
    access: authz::coordinators,
};

const INFO_QUERY: &str = "\
    SELECT c.id, c.id_usuario, c.nombres, c.apellidos, c.id_carrera, \
           ca.nombre AS carrera, c.telefono, u.email, u.estado_usuario, u.fecha_registro \
    FROM coordinadores c \
    INNER JOIN usuarios u ON u.id = c.id_usuario \
    INNER JOIN carreras ca ON ca.id = c.id_carrera";

/// List all coordinators
pub async fn index(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Envelope<Vec<CoordinadorInfo>>>, ApiError> {
    KIND.authorize(Some(&actor), None, Action::List)?;

    let coordinadores = sqlx::query_as::<_, CoordinadorInfo>(&format!(
        "{} ORDER BY c.apellidos, c.nombres",
        INFO_QUERY
    ))
    .fetch_all(&state.db)
    .await?;

    Ok(Json(Envelope::ok(
        "Coordinadores recuperados correctamente",
        coordinadores,
    )))
}

/// Create a coordinator together with its account
pub async fn store(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Envelope<Coordinador>>), ApiError> {
    KIND.authorize(Some(&actor), None, Action::Create)?;

    let payload = body.as_object().cloned().unwrap_or_default();
    KIND.validate_create(&state.db, &payload).await?;

    let telefono = KIND.canonical_phone(&state.db, &payload, None).await?;

    let password_hash = hash_password(get_str(&payload, "password").unwrap_or_default())
        .map_err(|e| {
            tracing::error!("Failed to hash password: {}", e);
            ApiError::internal()
        })?;

    let user_id = Uuid::new_v4().to_string();
    let coordinador_id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    // Account and profile are one logical unit: the account insert must not
    // survive a failed profile insert.
    let mut tx = state.db.begin().await?;

    sqlx::query(
        "INSERT INTO usuarios (id, email, password, id_tipo_usuario, estado_usuario, fecha_registro) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&user_id)
    .bind(get_str(&payload, "email").unwrap_or_default())
    .bind(&password_hash)
    .bind(Role::Coordinator.as_tag())
    .bind(true)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO coordinadores (id, id_usuario, nombres, apellidos, id_carrera, telefono) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&coordinador_id)
    .bind(&user_id)
    .bind(get_str(&payload, "nombres").unwrap_or_default())
    .bind(get_str(&payload, "apellidos").unwrap_or_default())
    .bind(get_i64(&payload, "id_carrera").unwrap_or_default())
    .bind(&telefono)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let coordinador = sqlx::query_as::<_, Coordinador>("SELECT * FROM coordinadores WHERE id = ?")
        .bind(&coordinador_id)
        .fetch_one(&state.db)
        .await?;

    tracing::info!(id_usuario = %user_id, "Created coordinator");

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok("Coordinador creado correctamente", coordinador)),
    ))
}

/// Get a single coordinator by its owning account id
pub async fn show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    actor: Actor,
) -> Result<Json<Envelope<CoordinadorInfo>>, ApiError> {
    KIND.authorize(Some(&actor), Some(&id), Action::Show)?;

    let coordinador = sqlx::query_as::<_, CoordinadorInfo>(&format!(
        "{} WHERE c.id_usuario = ?",
        INFO_QUERY
    ))
    .bind(&id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| KIND.not_found())?;

    Ok(Json(Envelope::ok(
        "Coordinador recuperado correctamente",
        coordinador,
    )))
}

/// Partially update a coordinator; absent fields stay untouched
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    actor: Actor,
    Json(body): Json<Value>,
) -> Result<Json<Envelope<Coordinador>>, ApiError> {
    KIND.authorize(Some(&actor), Some(&id), Action::Update)?;

    let _existing = sqlx::query_as::<_, Coordinador>(
        "SELECT * FROM coordinadores WHERE id_usuario = ?",
    )
    .bind(&id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| KIND.not_found())?;

    let payload = body.as_object().cloned().unwrap_or_default();
    KIND.validate_update(&state.db, &payload, &id).await?;

    let telefono = KIND.canonical_phone(&state.db, &payload, Some(&id)).await?;

    sqlx::query(
        "UPDATE coordinadores SET \
            nombres = COALESCE(?, nombres), \
            apellidos = COALESCE(?, apellidos), \
            id_carrera = COALESCE(?, id_carrera), \
            telefono = COALESCE(?, telefono) \
         WHERE id_usuario = ?",
    )
    .bind(get_str(&payload, "nombres"))
    .bind(get_str(&payload, "apellidos"))
    .bind(get_i64(&payload, "id_carrera"))
    .bind(&telefono)
    .bind(&id)
    .execute(&state.db)
    .await?;

    if let Some(password) = get_str(&payload, "password") {
        let password_hash = hash_password(password).map_err(|e| {
            tracing::error!("Failed to hash password: {}", e);
            ApiError::internal()
        })?;
        sqlx::query("UPDATE usuarios SET password = ? WHERE id = ?")
            .bind(&password_hash)
            .bind(&id)
            .execute(&state.db)
            .await?;
    }

    let coordinador = sqlx::query_as::<_, Coordinador>(
        "SELECT * FROM coordinadores WHERE id_usuario = ?",
    )
    .bind(&id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(Envelope::ok(
        "Coordinador actualizado correctamente",
        coordinador,
    )))
}

/// Delete a coordinator's account; the profile row goes with it
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    actor: Actor,
) -> Result<Json<Envelope<Value>>, ApiError> {
    KIND.authorize(Some(&actor), Some(&id), Action::Delete)?;

    let user = sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| KIND.not_found())?;

    sqlx::query("DELETE FROM usuarios WHERE id = ?")
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    tracing::info!(id_usuario = %user.id, "Deleted coordinator account");

    Ok(Json(Envelope::message("Coordinador eliminado correctamente")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;

    async fn test_state() -> (Arc<AppState>, tempfile::TempDir) {
        let pool = crate::db::test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.images_dir = dir.path().to_path_buf();
        (Arc::new(AppState::new(config, pool)), dir)
    }

    fn admin() -> Actor {
        Actor {
            id: "admin-1".to_string(),
            role: Role::Admin,
        }
    }

    fn create_body() -> Value {
        json!({
            "nombres": "Ana María",
            "apellidos": "Pérez",
            "id_carrera": 1,
            "telefono": "71234567",
            "email": "ana.perez@uni.edu.sv",
            "password": "secreta123",
            "password_confirmation": "secreta123",
        })
    }

    #[tokio::test]
    async fn test_store_normalizes_phone_and_returns_201() {
        let (state, _dir) = test_state().await;

        let (status, Json(envelope)) =
            store(State(state), admin(), Json(create_body())).await.unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert!(envelope.status);
        let coordinador = envelope.data.unwrap();
        assert_eq!(coordinador.telefono.as_deref(), Some("+503 7123-4567"));
    }

    #[tokio::test]
    async fn test_store_rejects_duplicate_email_without_creating_account() {
        let (state, _dir) = test_state().await;
        store(State(state.clone()), admin(), Json(create_body())).await.unwrap();

        let mut body = create_body();
        body["telefono"] = json!("79998888");
        let err = store(State(state.clone()), admin(), Json(body)).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.errors().unwrap().contains_key("email"));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM usuarios")
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_store_requires_admin() {
        let (state, _dir) = test_state().await;
        let outsider = Actor {
            id: "c-9".to_string(),
            role: Role::Coordinator,
        };

        let err = store(State(state), outsider, Json(create_body())).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::OK);
        assert_eq!(err.message(), "Ruta no encontrada en este servidor");
    }

    #[tokio::test]
    async fn test_update_applies_only_present_fields() {
        let (state, _dir) = test_state().await;
        let (_, Json(envelope)) =
            store(State(state.clone()), admin(), Json(create_body())).await.unwrap();
        let created = envelope.data.unwrap();

        let Json(updated) = update(
            State(state),
            Path(created.id_usuario.clone()),
            admin(),
            Json(json!({"nombres": "Ana Cecilia"})),
        )
        .await
        .unwrap();

        let coordinador = updated.data.unwrap();
        assert_eq!(coordinador.nombres, "Ana Cecilia");
        // Untouched fields keep their stored values.
        assert_eq!(coordinador.apellidos, created.apellidos);
        assert_eq!(coordinador.telefono, created.telefono);
    }

    #[tokio::test]
    async fn test_owner_can_update_own_record() {
        let (state, _dir) = test_state().await;
        let (_, Json(envelope)) =
            store(State(state.clone()), admin(), Json(create_body())).await.unwrap();
        let created = envelope.data.unwrap();

        let owner = Actor {
            id: created.id_usuario.clone(),
            role: Role::Coordinator,
        };
        let result = update(
            State(state),
            Path(created.id_usuario),
            owner,
            Json(json!({"apellidos": "Pérez de López"})),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_destroy_cascades_to_profile_and_show_returns_404() {
        let (state, _dir) = test_state().await;
        let (_, Json(envelope)) =
            store(State(state.clone()), admin(), Json(create_body())).await.unwrap();
        let id_usuario = envelope.data.unwrap().id_usuario;

        destroy(State(state.clone()), Path(id_usuario.clone()), admin())
            .await
            .unwrap();

        let usuarios: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM usuarios")
            .fetch_one(&state.db)
            .await
            .unwrap();
        let coordinadores: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coordinadores")
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(usuarios, 0);
        assert_eq!(coordinadores, 0);

        let err = show(State(state), Path(id_usuario), admin()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_show_missing_record_is_404() {
        let (state, _dir) = test_state().await;
        let err = show(State(state), Path("missing".to_string()), admin())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "Coordinador no encontrado");
    }
}

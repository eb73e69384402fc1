//! Company CRUD endpoints.
//!
//! Creation is open self-registration: the public register page drives it,
//! so no actor is required and the response carries a fresh session token.
//! Companies own an optional logo stored through the image pipeline.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use super::auth::{create_session, hash_password, Actor};
use super::authz::{self, Action};
use super::error::{ApiError, Envelope};
use super::images;
use super::pipeline::{get_bool, get_i64, get_str, EntityKind};
use super::validation::{FieldRules, Rule};
use crate::db::{Empresa, EmpresaInfo, Role, SessionData, Usuario, UsuarioResponse};
use crate::AppState;

/// Namespace of the content store that holds company logos.
const LOGO_NAMESPACE: &str = "imagen-empresa";

const CREATE_RULES: &[FieldRules] = &[
    FieldRules {
        field: "id_sector",
        label: "sector",
        rules: &[
            Rule::Required,
            Rule::TypeInteger,
            Rule::Exists {
                table: "sectores_industria",
                message: "El sector seleccionado no existe",
            },
        ],
    },
    FieldRules {
        field: "nombre",
        label: "nombre",
        rules: &[Rule::Required, Rule::TypeString, Rule::MaxLen(200)],
    },
    FieldRules {
        field: "direccion",
        label: "dirección",
        rules: &[Rule::TypeString],
    },
    FieldRules {
        field: "telefono",
        label: "teléfono",
        rules: &[
            Rule::TypeString,
            Rule::MaxLen(20),
            Rule::Unique {
                table: "empresas",
                column: "telefono",
                exclude_by: "id_usuario",
                message: "El teléfono ingresado ya está en uso",
            },
        ],
    },
    FieldRules {
        field: "sitio_web",
        label: "sitio web",
        rules: &[Rule::TypeString, Rule::MaxLen(255)],
    },
    FieldRules {
        field: "descripcion",
        label: "descripción",
        rules: &[Rule::TypeString],
    },
    FieldRules {
        field: "logo_url",
        label: "logo",
        rules: &[Rule::Required, Rule::TypeString],
    },
    FieldRules {
        field: "verificada",
        label: "verificada",
        rules: &[Rule::TypeBoolean],
    },
    FieldRules {
        field: "email",
        label: "correo electrónico",
        rules: &[
            Rule::Required,
            Rule::TypeString,
            Rule::Email,
            Rule::MaxLen(255),
            Rule::Unique {
                table: "usuarios",
                column: "email",
                exclude_by: "id",
                message: "El correo electrónico ingresado ya está en uso",
            },
        ],
    },
    FieldRules {
        field: "password",
        label: "contraseña",
        rules: &[Rule::Required, Rule::TypeString, Rule::MinLen(8), Rule::MaxLen(255)],
    },
    FieldRules {
        field: "password_confirmation",
        label: "confirmación de contraseña",
        rules: &[
            Rule::Required,
            Rule::TypeString,
            Rule::MinLen(8),
            Rule::MaxLen(255),
            Rule::Same { other: "password" },
        ],
    },
];

const UPDATE_RULES: &[FieldRules] = &[
    FieldRules {
        field: "id_sector",
        label: "sector",
        rules: &[
            Rule::TypeInteger,
            Rule::Exists {
                table: "sectores_industria",
                message: "El sector seleccionado no existe",
            },
        ],
    },
    FieldRules {
        field: "nombre",
        label: "nombre",
        rules: &[Rule::TypeString, Rule::MaxLen(200)],
    },
    FieldRules {
        field: "direccion",
        label: "dirección",
        rules: &[Rule::TypeString],
    },
    FieldRules {
        field: "telefono",
        label: "teléfono",
        rules: &[
            Rule::TypeString,
            Rule::MaxLen(20),
            Rule::Unique {
                table: "empresas",
                column: "telefono",
                exclude_by: "id_usuario",
                message: "El teléfono ingresado ya está en uso",
            },
        ],
    },
    FieldRules {
        field: "sitio_web",
        label: "sitio web",
        rules: &[Rule::TypeString, Rule::MaxLen(255)],
    },
    FieldRules {
        field: "descripcion",
        label: "descripción",
        rules: &[Rule::TypeString],
    },
    FieldRules {
        field: "logo_url",
        label: "logo",
        rules: &[Rule::TypeString],
    },
    FieldRules {
        field: "verificada",
        label: "verificada",
        rules: &[Rule::TypeBoolean],
    },
];

static KIND: EntityKind = EntityKind {
    table: "empresas",
    not_found_message: "Empresa no encontrada",
    create_rules: CREATE_RULES,
    update_rules: UPDATE_RULES,
    access: authz::companies,
};

const INFO_QUERY: &str = "\
    SELECT e.id, e.id_usuario, e.id_sector, s.nombre AS sector, e.nombre, \
           e.direccion, e.telefono, e.sitio_web, e.descripcion, e.logo_url, \
           e.verificada, u.email, u.estado_usuario, u.fecha_registro \
    FROM empresas e \
    INNER JOIN usuarios u ON u.id = e.id_usuario \
    INNER JOIN sectores_industria s ON s.id = e.id_sector";

/// List all companies
pub async fn index(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Envelope<Vec<EmpresaInfo>>>, ApiError> {
    KIND.authorize(Some(&actor), None, Action::List)?;

    let empresas = sqlx::query_as::<_, EmpresaInfo>(&format!("{} ORDER BY e.nombre", INFO_QUERY))
        .fetch_all(&state.db)
        .await?;

    Ok(Json(Envelope::ok(
        "Empresas recuperadas correctamente",
        empresas,
    )))
}

/// Open self-registration: create a company together with its account and
/// hand back a session token
pub async fn store(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Envelope<SessionData>>), ApiError> {
    KIND.authorize(None, None, Action::Create)?;

    let payload = body.as_object().cloned().unwrap_or_default();
    KIND.validate_create(&state.db, &payload).await?;

    let telefono = KIND.canonical_phone(&state.db, &payload, None).await?;

    let password_hash = hash_password(get_str(&payload, "password").unwrap_or_default())
        .map_err(|e| {
            tracing::error!("Failed to hash password: {}", e);
            ApiError::internal()
        })?;

    let logo_url = match get_str(&payload, "logo_url") {
        Some(data_url) => Some(images::ingest(&state.images, LOGO_NAMESPACE, data_url).await?),
        None => None,
    };

    let user_id = Uuid::new_v4().to_string();
    let empresa_id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let mut tx = state.db.begin().await?;

    sqlx::query(
        "INSERT INTO usuarios (id, email, password, id_tipo_usuario, estado_usuario, fecha_registro) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&user_id)
    .bind(get_str(&payload, "email").unwrap_or_default())
    .bind(&password_hash)
    .bind(Role::Company.as_tag())
    .bind(true)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO empresas (id, id_usuario, id_sector, nombre, direccion, telefono, \
                               sitio_web, descripcion, logo_url, verificada) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&empresa_id)
    .bind(&user_id)
    .bind(get_i64(&payload, "id_sector").unwrap_or_default())
    .bind(get_str(&payload, "nombre").unwrap_or_default())
    .bind(get_str(&payload, "direccion"))
    .bind(&telefono)
    .bind(get_str(&payload, "sitio_web"))
    .bind(get_str(&payload, "descripcion"))
    .bind(&logo_url)
    .bind(get_bool(&payload, "verificada").unwrap_or(false))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let user = sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios WHERE id = ?")
        .bind(&user_id)
        .fetch_one(&state.db)
        .await?;

    let (token, expires_at) =
        create_session(&state.db, &user_id, state.config.auth.session_ttl_days).await?;

    tracing::info!(id_usuario = %user_id, "Registered company");

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(
            "Empresa registrada correctamente",
            SessionData {
                empresa_id: Some(empresa_id),
                user: UsuarioResponse::from(user),
                token,
                token_type: "Bearer".to_string(),
                expires_at,
            },
        )),
    ))
}

/// Get a single company by its owning account id
pub async fn show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    actor: Actor,
) -> Result<Json<Envelope<EmpresaInfo>>, ApiError> {
    KIND.authorize(Some(&actor), Some(&id), Action::Show)?;

    let empresa = sqlx::query_as::<_, EmpresaInfo>(&format!("{} WHERE e.id_usuario = ?", INFO_QUERY))
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| KIND.not_found())?;

    Ok(Json(Envelope::ok(
        "Empresa recuperada correctamente",
        empresa,
    )))
}

/// Partially update a company; a new inline logo replaces the stored one
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    actor: Actor,
    Json(body): Json<Value>,
) -> Result<Json<Envelope<Empresa>>, ApiError> {
    KIND.authorize(Some(&actor), Some(&id), Action::Update)?;

    let existing = sqlx::query_as::<_, Empresa>("SELECT * FROM empresas WHERE id_usuario = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| KIND.not_found())?;

    let payload = body.as_object().cloned().unwrap_or_default();
    KIND.validate_update(&state.db, &payload, &id).await?;

    let telefono = KIND.canonical_phone(&state.db, &payload, Some(&id)).await?;

    let logo_url = match get_str(&payload, "logo_url") {
        Some(data_url) => {
            if let Some(old) = &existing.logo_url {
                state.images.delete_by_url(LOGO_NAMESPACE, old).await;
            }
            Some(images::ingest(&state.images, LOGO_NAMESPACE, data_url).await?)
        }
        None => None,
    };

    sqlx::query(
        "UPDATE empresas SET \
            id_sector = COALESCE(?, id_sector), \
            nombre = COALESCE(?, nombre), \
            direccion = COALESCE(?, direccion), \
            telefono = COALESCE(?, telefono), \
            sitio_web = COALESCE(?, sitio_web), \
            descripcion = COALESCE(?, descripcion), \
            logo_url = COALESCE(?, logo_url), \
            verificada = COALESCE(?, verificada) \
         WHERE id_usuario = ?",
    )
    .bind(get_i64(&payload, "id_sector"))
    .bind(get_str(&payload, "nombre"))
    .bind(get_str(&payload, "direccion"))
    .bind(&telefono)
    .bind(get_str(&payload, "sitio_web"))
    .bind(get_str(&payload, "descripcion"))
    .bind(&logo_url)
    .bind(get_bool(&payload, "verificada"))
    .bind(&id)
    .execute(&state.db)
    .await?;

    let empresa = sqlx::query_as::<_, Empresa>("SELECT * FROM empresas WHERE id_usuario = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(Envelope::ok(
        "Empresa actualizada correctamente",
        empresa,
    )))
}

/// Delete a company's account; removes the stored logo first
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

    let empresa = sqlx::query_as::<_, Empresa>("SELECT * FROM empresas WHERE id_usuario = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?;

    if let Some(logo_url) = empresa.as_ref().and_then(|e| e.logo_url.as_deref()) {
        state.images.delete_by_url(LOGO_NAMESPACE, logo_url).await;
    }

    sqlx::query("DELETE FROM usuarios WHERE id = ?")
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    tracing::info!(id_usuario = %user.id, "Deleted company account");

    Ok(Json(Envelope::message("Empresa eliminada correctamente")))
}

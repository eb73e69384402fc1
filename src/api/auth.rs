//! Authentication: password hashing, opaque session tokens, and the
//! per-request [`Actor`] extractor.
//!
//! Tokens are random 32-byte values handed to the client in hex; only their
//! SHA-256 hash is stored. The actor established here is passed explicitly
//! into every authorization decision.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::request::Parts,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use super::error::{ApiError, Envelope};
use crate::db::{LoginRequest, Role, Sesion, SessionData, Usuario, UsuarioResponse};
use crate::AppState;

/// The authenticated caller of the current request.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Create a session row for an account and return (token, expires_at).
pub async fn create_session(
    pool: &sqlx::SqlitePool,
    user_id: &str,
    ttl_days: i64,
) -> Result<(String, String), ApiError> {
    let token = generate_token();
    let token_hash = hash_token(&token);
    let now = Utc::now();
    let expires_at = (now + Duration::days(ttl_days)).to_rfc3339();

    sqlx::query(
        "INSERT INTO sesiones (id, id_usuario, token_hash, expires_at, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(&token_hash)
    .bind(&expires_at)
    .bind(now.to_rfc3339())
    .execute(pool)
    .await?;

    Ok((token, expires_at))
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Envelope<SessionData>>, ApiError> {
    let user: Option<Usuario> = sqlx::query_as("SELECT * FROM usuarios WHERE email = ?")
        .bind(&request.email)
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or_else(invalid_credentials)?;

    if !verify_password(&request.password, &user.password) {
        return Err(invalid_credentials());
    }

    if !user.estado_usuario {
        return Err(ApiError::bad_request("El usuario se encuentra inactivo"));
    }

    let (token, expires_at) =
        create_session(&state.db, &user.id, state.config.auth.session_ttl_days).await?;

    tracing::info!(email = %user.email, "User logged in");

    Ok(Json(Envelope::ok(
        "Inicio de sesión exitoso",
        SessionData {
            empresa_id: None,
            user: UsuarioResponse::from(user),
            token,
            token_type: "Bearer".to_string(),
            expires_at,
        },
    )))
}

fn invalid_credentials() -> ApiError {
    ApiError::bad_request("Credenciales inválidas")
}

fn extract_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Resolve a bearer token into the account it belongs to.
pub async fn get_current_user(pool: &sqlx::SqlitePool, token: &str) -> Result<Usuario, ApiError> {
    let token_hash = hash_token(token);
    let session: Option<Sesion> = sqlx::query_as("SELECT * FROM sesiones WHERE token_hash = ?")
        .bind(&token_hash)
        .fetch_optional(pool)
        .await?;

    let session = session.ok_or_else(ApiError::unauthenticated)?;

    let expires_at = DateTime::parse_from_rfc3339(&session.expires_at)
        .map_err(|_| ApiError::unauthenticated())?;
    if expires_at.with_timezone(&Utc) < Utc::now() {
        return Err(ApiError::unauthenticated());
    }

    let user: Option<Usuario> = sqlx::query_as("SELECT * FROM usuarios WHERE id = ?")
        .bind(&session.id_usuario)
        .fetch_optional(pool)
        .await?;

    let user = user.ok_or_else(ApiError::unauthenticated)?;
    if !user.estado_usuario {
        return Err(ApiError::unauthenticated());
    }
    Ok(user)
}

/// Extractor for the authenticated actor of the current request.
#[async_trait]
impl FromRequestParts<Arc<AppState>> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers).ok_or_else(ApiError::unauthenticated)?;
        let user = get_current_user(&state.db, token).await?;
        let role = user.role().ok_or_else(ApiError::unauthenticated)?;
        Ok(Actor { id: user.id, role })
    }
}

/// Create the bootstrap administrator account if no administrator exists.
pub async fn ensure_admin_user(
    pool: &sqlx::SqlitePool,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM usuarios WHERE id_tipo_usuario = ?")
        .bind(Role::Admin.as_tag())
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Ok(());
    }

    let password_hash =
        hash_password(password).map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;

    sqlx::query(
        "INSERT INTO usuarios (id, email, password, id_tipo_usuario, estado_usuario, fecha_registro) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(email)
    .bind(&password_hash)
    .bind(Role::Admin.as_tag())
    .bind(true)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    tracing::info!(email = %email, "Created bootstrap administrator account");
    Ok(())
}

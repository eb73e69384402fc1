//! Account and session models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Platform role. Persisted as an integer tag in `usuarios.id_tipo_usuario`
/// (1 = admin, 2 = coordinator, 3 = student, 4 = company).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Coordinator,
    Student,
    Company,
}

impl Role {
    pub fn as_tag(self) -> i64 {
        match self {
            Role::Admin => 1,
            Role::Coordinator => 2,
            Role::Student => 3,
            Role::Company => 4,
        }
    }
}

impl TryFrom<i64> for Role {
    type Error = String;

    fn try_from(tag: i64) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(Role::Admin),
            2 => Ok(Role::Coordinator),
            3 => Ok(Role::Student),
            4 => Ok(Role::Company),
            other => Err(format!("Unknown role tag: {}", other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Coordinator => write!(f, "coordinator"),
            Role::Student => write!(f, "student"),
            Role::Company => write!(f, "company"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Usuario {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub id_tipo_usuario: i64,
    pub estado_usuario: bool,
    pub fecha_registro: String,
}

impl Usuario {
    pub fn role(&self) -> Option<Role> {
        Role::try_from(self.id_tipo_usuario).ok()
    }
}

/// Public representation of an account (no password hash).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsuarioResponse {
    pub id: String,
    pub email: String,
    pub id_tipo_usuario: i64,
    pub estado_usuario: bool,
    pub fecha_registro: String,
}

impl From<Usuario> for UsuarioResponse {
    fn from(user: Usuario) -> Self {
        Self {
            id: user.id,
            email: user.email,
            id_tipo_usuario: user.id_tipo_usuario,
            estado_usuario: user.estado_usuario,
            fecha_registro: user.fecha_registro,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Sesion {
    pub id: String,
    pub id_usuario: String,
    pub token_hash: String,
    pub expires_at: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Payload returned on successful login and on company self-registration.
#[derive(Debug, Serialize)]
pub struct SessionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empresa_id: Option<String>,
    pub user: UsuarioResponse,
    pub token: String,
    pub token_type: String,
    pub expires_at: String,
}

//! Response envelope and unified error handling.
//!
//! Every endpoint answers with the same JSON envelope: successes carry
//! `{ message, status: true, data? }` and failures carry
//! `{ message, status: false, errors? }`. Handlers return
//! `Result<Json<Envelope<T>>, ApiError>` so the failure envelope is produced
//! in exactly one place.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;

/// Field name -> ordered violation messages.
pub type FieldErrors = HashMap<String, Vec<String>>;

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub message: String,
    pub status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            status: true,
            data: Some(data),
        }
    }
}

impl Envelope<serde_json::Value> {
    /// Success envelope with no `data` key.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: true,
            data: None,
        }
    }
}

/// Failure envelope body.
#[derive(Debug, Serialize)]
struct FailureBody {
    message: String,
    status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
}

/// Unified API error. Carries the HTTP status and the failure envelope.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    errors: Option<FieldErrors>,
}

impl ApiError {
    /// Authorization denial. Answers HTTP 200 with the router's not-found
    /// message so unauthorized callers cannot probe which routes exist; an
    /// earlier revision answered "No tienes permisos para realizar esta
    /// acción" before the message was unified with the 404 handler.
    pub fn denied() -> Self {
        Self {
            status: StatusCode::OK,
            message: "Ruta no encontrada en este servidor".to_string(),
            errors: None,
        }
    }

    /// Missing or invalid credentials (401).
    pub fn unauthenticated() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "No autenticado".to_string(),
            errors: None,
        }
    }

    /// Validation failure (400) with the full field error map.
    pub fn validation(errors: FieldErrors) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "Error de validación".to_string(),
            errors: Some(errors),
        }
    }

    /// Single-field failure (400), used for the post-normalization
    /// uniqueness re-check and for malformed image payloads.
    pub fn conflict_field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), vec![message.clone()]);
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
            errors: Some(errors),
        }
    }

    /// Not found (404).
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            errors: None,
        }
    }

    /// Referenced row does not exist (400).
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            errors: None,
        }
    }

    /// Unexpected infrastructure failure (500).
    pub fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Ha ocurrido un error interno".to_string(),
            errors: None,
        }
    }

    /// Database failure (500).
    pub fn database() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Ha ocurrido un error en la base de datos".to_string(),
            errors: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn errors(&self) -> Option<&FieldErrors> {
        self.errors.as_ref()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = FailureBody {
            message: self.message,
            status: false,
            errors: self.errors,
        };
        (self.status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::not_found("Recurso no encontrado"),
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                // The application-level uniqueness pre-checks are advisory;
                // under concurrent requests the UNIQUE constraints are the
                // source of truth and must map to the same 400 responses.
                if msg.contains("UNIQUE constraint failed") && msg.contains("usuarios.email") {
                    ApiError::conflict_field("email", "El correo electrónico ingresado ya está en uso")
                } else if msg.contains("UNIQUE constraint failed") && msg.contains(".telefono") {
                    ApiError::conflict_field("telefono", "El teléfono ingresado ya está en uso")
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    ApiError::bad_request("El registro referenciado no existe")
                } else {
                    tracing::error!("Database error: {}", err);
                    ApiError::database()
                }
            }
            _ => {
                tracing::error!("Database error: {}", err);
                ApiError::database()
            }
        }
    }
}

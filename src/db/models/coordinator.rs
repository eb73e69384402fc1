//! Coordinator profile models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Coordinador {
    pub id: String,
    pub id_usuario: String,
    pub nombres: String,
    pub apellidos: String,
    pub id_carrera: i64,
    pub telefono: Option<String>,
}

/// Coordinator joined with its account and career for the public view.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CoordinadorInfo {
    pub id: String,
    pub id_usuario: String,
    pub nombres: String,
    pub apellidos: String,
    pub id_carrera: i64,
    pub carrera: String,
    pub telefono: Option<String>,
    pub email: String,
    pub estado_usuario: bool,
    pub fecha_registro: String,
}

//! Company profile models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Empresa {
    pub id: String,
    pub id_usuario: String,
    pub id_sector: i64,
    pub nombre: String,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub sitio_web: Option<String>,
    pub descripcion: Option<String>,
    pub logo_url: Option<String>,
    pub verificada: bool,
}

/// Company joined with its account and industry sector for the public view.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmpresaInfo {
    pub id: String,
    pub id_usuario: String,
    pub id_sector: i64,
    pub sector: String,
    pub nombre: String,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub sitio_web: Option<String>,
    pub descripcion: Option<String>,
    pub logo_url: Option<String>,
    pub verificada: bool,
    pub email: String,
    pub estado_usuario: bool,
    pub fecha_registro: String,
}

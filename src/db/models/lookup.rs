//! Lookup tables referenced by the entity profiles.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Carrera {
    pub id: i64,
    pub nombre: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SectorIndustria {
    pub id: i64,
    pub nombre: String,
}

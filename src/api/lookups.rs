//! Read-only lookup endpoints feeding the SPA's dropdowns.

use axum::{extract::State, Json};
use std::sync::Arc;

use super::error::{ApiError, Envelope};
use crate::db::{Carrera, SectorIndustria};
use crate::AppState;

pub async fn list_carreras(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Envelope<Vec<Carrera>>>, ApiError> {
    let carreras = sqlx::query_as::<_, Carrera>("SELECT * FROM carreras ORDER BY nombre")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(Envelope::ok(
        "Carreras recuperadas correctamente",
        carreras,
    )))
}

pub async fn list_sectores(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Envelope<Vec<SectorIndustria>>>, ApiError> {
    let sectores =
        sqlx::query_as::<_, SectorIndustria>("SELECT * FROM sectores_industria ORDER BY nombre")
            .fetch_all(&state.db)
            .await?;

    Ok(Json(Envelope::ok(
        "Sectores recuperados correctamente",
        sectores,
    )))
}

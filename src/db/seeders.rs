//! Seeders for the career and industry-sector lookup tables.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

const CARRERAS: &[&str] = &[
    "Ingeniería en Sistemas Informáticos",
    "Ingeniería Industrial",
    "Ingeniería Civil",
    "Ingeniería Eléctrica",
    "Arquitectura",
    "Licenciatura en Administración de Empresas",
    "Licenciatura en Contaduría Pública",
    "Licenciatura en Mercadeo",
    "Licenciatura en Idioma Inglés",
    "Licenciatura en Psicología",
];

const SECTORES_INDUSTRIA: &[&str] = &[
    "Tecnología de la información",
    "Manufactura",
    "Construcción",
    "Comercio",
    "Servicios financieros",
    "Salud",
    "Educación",
    "Agroindustria",
    "Turismo y hostelería",
    "Telecomunicaciones",
];

/// Insert the built-in careers and industry sectors (idempotent).
pub async fn seed_lookup_tables(pool: &SqlitePool) -> Result<()> {
    info!("Seeding lookup tables...");

    for nombre in CARRERAS {
        sqlx::query("INSERT OR IGNORE INTO carreras (nombre) VALUES (?)")
            .bind(nombre)
            .execute(pool)
            .await?;
    }

    for nombre in SECTORES_INDUSTRIA {
        sqlx::query("INSERT OR IGNORE INTO sectores_industria (nombre) VALUES (?)")
            .bind(nombre)
            .execute(pool)
            .await?;
    }

    Ok(())
}

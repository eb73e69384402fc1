pub mod auth;
mod authz;
mod companies;
mod coordinators;
pub mod error;
mod images;
mod lookups;
mod phone;
mod pipeline;
mod validation;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Handlers enforce authentication through the Actor extractor; the only
    // bodies reachable without a token are login, company self-registration
    // and the lookup lists the register page needs.
    let api_routes = Router::new()
        .route("/auth/login", post(auth::login))
        // Coordinators
        .route("/coordinadores", get(coordinators::index))
        .route("/coordinadores", post(coordinators::store))
        .route("/coordinadores/:id", get(coordinators::show))
        .route("/coordinadores/:id", put(coordinators::update))
        .route("/coordinadores/:id", patch(coordinators::update))
        .route("/coordinadores/:id", delete(coordinators::destroy))
        // Companies
        .route("/empresas", get(companies::index))
        .route("/empresas", post(companies::store))
        .route("/empresas/:id", get(companies::show))
        .route("/empresas/:id", put(companies::update))
        .route("/empresas/:id", patch(companies::update))
        .route("/empresas/:id", delete(companies::destroy))
        // Lookups
        .route("/carreras", get(lookups::list_carreras))
        .route("/sectores-industria", get(lookups::list_sectores));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        // Issued image URLs resolve against this mount.
        .nest_service("/img", ServeDir::new(state.images.root()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

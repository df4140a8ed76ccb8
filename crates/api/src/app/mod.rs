//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and the sync orchestrator
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use usersync_access::OriginGate;
use usersync_infra::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let services = services::build_services(&config.stores).await?;
    let gate = OriginGate::new(config.allowed_origins.clone());
    Ok(router(gate, services))
}

/// Assemble the router from already-built parts (tests inject their own stores).
pub fn router(gate: OriginGate, services: Arc<services::AppServices>) -> Router {
    let gate_state = middleware::GateState::new(gate);

    // Gated routes: origin must pass before any data operation.
    let gated = routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(gate_state, middleware::origin_gate))
            .layer(Extension(services)),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(gated)
}

//! slipway-api — REST surface of the release engine.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/services` | List services |
//! | GET | `/api/v1/services/{id}` | Get a service |
//! | GET | `/api/v1/services/{id}/versions` | List its versions |
//! | GET | `/api/v1/services/{id}/versions/current` | Active-or-latest version |
//! | POST | `/api/v1/services/{id}/publish` | Publish a new version |
//! | POST | `/api/v1/services/{id}/rollback` | Roll back to a prior version |
//! | GET | `/api/v1/operations/{id}` | Get an operation record |
//! | GET | `/api/v1/services/{id}/operations` | List a service's operations |
//! | GET | `/api/v1/deployments/{id}/events` | Live progress (SSE) |

pub mod events;
pub mod handlers;

use axum::Router;
use axum::routing::{get, post};

use slipway_release::Orchestrator;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Orchestrator,
}

/// Build the complete API router.
pub fn build_router(orchestrator: Orchestrator) -> Router {
    let state = ApiState { orchestrator };
    Router::new()
        .route("/api/v1/services", get(handlers::list_services))
        .route("/api/v1/services/{id}", get(handlers::get_service))
        .route(
            "/api/v1/services/{id}/versions",
            get(handlers::list_versions),
        )
        .route(
            "/api/v1/services/{id}/versions/current",
            get(handlers::current_version),
        )
        .route(
            "/api/v1/services/{id}/publish",
            post(handlers::publish_version),
        )
        .route(
            "/api/v1/services/{id}/rollback",
            post(handlers::rollback_service),
        )
        .route(
            "/api/v1/services/{id}/operations",
            get(handlers::list_operations),
        )
        .route("/api/v1/operations/{id}", get(handlers::get_operation))
        .route(
            "/api/v1/deployments/{id}/events",
            get(events::deployment_events),
        )
        .with_state(state)
}

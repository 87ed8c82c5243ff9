//! REST API handlers.
//!
//! Each handler drives the orchestrator or reads the registry and returns
//! JSON responses.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use slipway_core::{AuthConfig, ServiceConfig};
use slipway_release::{PublishRequest, ReleaseError};

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> axum::response::Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
        .into_response()
}

/// Map a release error onto the HTTP status it deserves.
fn release_error_response(err: &ReleaseError) -> axum::response::Response {
    let status = match err {
        ReleaseError::VersionConflict { .. } | ReleaseError::NoOp(_) => StatusCode::CONFLICT,
        ReleaseError::NotFound(_) | ReleaseError::BundleNotFound(_) => StatusCode::NOT_FOUND,
        ReleaseError::InvalidVersion { .. } | ReleaseError::Config(_) => StatusCode::BAD_REQUEST,
        ReleaseError::Deploy(_)
        | ReleaseError::RegistryWrite(_)
        | ReleaseError::Bundle(_)
        | ReleaseError::Timeout { .. }
        | ReleaseError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(&err.to_string(), status)
}

// ── Services ───────────────────────────────────────────────────

/// GET /api/v1/services
pub async fn list_services(State(state): State<ApiState>) -> impl IntoResponse {
    match state.orchestrator.registry().list_services() {
        Ok(services) => ApiResponse::ok(services).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// GET /api/v1/services/{id}
pub async fn get_service(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.orchestrator.registry().get_service(&id) {
        Ok(Some(service)) => ApiResponse::ok(service).into_response(),
        Ok(None) => error_response("service not found", StatusCode::NOT_FOUND),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// GET /api/v1/services/{id}/versions
pub async fn list_versions(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.orchestrator.registry().list_versions(&id) {
        Ok(versions) => ApiResponse::ok(versions).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// GET /api/v1/services/{id}/versions/current
///
/// The active version, falling back to the most recently created one when
/// nothing has been activated yet.
pub async fn current_version(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.orchestrator.registry().active_or_latest(&id) {
        Ok(Some(version)) => ApiResponse::ok(version).into_response(),
        Ok(None) => error_response("service has no versions", StatusCode::NOT_FOUND),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR),
    }
}

// ── Publish / rollback ─────────────────────────────────────────

/// Publish request body.
#[derive(serde::Deserialize)]
pub struct PublishBody {
    pub version: String,
    pub config: ServiceConfig,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

/// POST /api/v1/services/{id}/publish
///
/// Accepted publishes return 202 with the operation id; the pipeline runs
/// in the background and streams progress on the deployment channel.
pub async fn publish_version(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(body): Json<PublishBody>,
) -> impl IntoResponse {
    let request = PublishRequest {
        service_id: id,
        version: body.version,
        config: body.config,
        auth: body.auth,
    };
    match state.orchestrator.publish(request).await {
        Ok(operation_id) => (
            StatusCode::ACCEPTED,
            ApiResponse::ok(serde_json::json!({
                "operation_id": operation_id.clone(),
                // The operation id doubles as the deployment id for the
                // live progress channel.
                "deployment_id": operation_id,
            })),
        )
            .into_response(),
        Err(e) => release_error_response(&e),
    }
}

/// Rollback request body.
#[derive(serde::Deserialize)]
pub struct RollbackBody {
    pub target_version: String,
}

/// POST /api/v1/services/{id}/rollback
///
/// Runs to completion before responding.
pub async fn rollback_service(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(body): Json<RollbackBody>,
) -> impl IntoResponse {
    match state.orchestrator.rollback(&id, &body.target_version).await {
        Ok(operation_id) => ApiResponse::ok(serde_json::json!({
            "operation_id": operation_id,
        }))
        .into_response(),
        Err(e) => release_error_response(&e),
    }
}

// ── Operations ─────────────────────────────────────────────────

/// GET /api/v1/operations/{id}
pub async fn get_operation(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.orchestrator.registry().get_operation(&id) {
        Ok(Some(record)) => ApiResponse::ok(record).into_response(),
        Ok(None) => error_response("operation not found", StatusCode::NOT_FOUND),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// GET /api/v1/services/{id}/operations
pub async fn list_operations(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.orchestrator.registry().list_operations(&id) {
        Ok(records) => ApiResponse::ok(records).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR),
    }
}

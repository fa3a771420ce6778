//! REST API handlers.
//!
//! Each handler reads through the [`Fleet`](crate::Fleet) handle and returns
//! JSON in the `{success, data, error}` envelope.

use std::collections::{BTreeMap, BTreeSet};

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use tracing::info;

use warden_core::{HealthRecord, ServiceDefinition};
use warden_deps::DependencyReport;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// A service definition with its latest health record.
#[derive(Debug, Serialize)]
pub struct ServiceView {
    #[serde(flatten)]
    pub definition: ServiceDefinition,
    pub health: Option<HealthRecord>,
}

#[derive(Debug, Serialize)]
pub struct DependencyView {
    pub graph: BTreeMap<String, BTreeSet<String>>,
    pub report: DependencyReport,
}

#[derive(Debug, Serialize)]
pub struct HealOutcome {
    pub service: String,
    pub healed: bool,
}

// ── Services ───────────────────────────────────────────────────

/// GET /api/v1/services
pub async fn list_services(State(state): State<ApiState>) -> impl IntoResponse {
    let services = state.fleet.services().await;
    let mut health = state.fleet.health().await;
    let views: Vec<ServiceView> = services
        .into_values()
        .map(|definition| {
            let health = health.remove(&definition.name);
            ServiceView { definition, health }
        })
        .collect();
    ApiResponse::ok(views)
}

/// GET /api/v1/services/{name}
pub async fn get_service(State(state): State<ApiState>, Path(name): Path<String>) -> impl IntoResponse {
    let Some(definition) = state.fleet.services().await.remove(&name) else {
        return error_response("service not found", StatusCode::NOT_FOUND).into_response();
    };
    let health = state.fleet.health().await.remove(&name);
    ApiResponse::ok(ServiceView { definition, health }).into_response()
}

/// POST /api/v1/services/{name}/heal
pub async fn heal_service(State(state): State<ApiState>, Path(name): Path<String>) -> impl IntoResponse {
    info!(service = %name, "healing requested via API");
    match state.fleet.heal(&name).await {
        Some(true) => ApiResponse::ok(HealOutcome {
            service: name,
            healed: true,
        })
        .into_response(),
        Some(false) => error_response(
            &format!("all healing strategies failed for {name}"),
            StatusCode::BAD_GATEWAY,
        )
        .into_response(),
        None => error_response("service not found", StatusCode::NOT_FOUND).into_response(),
    }
}

// ── Fleet views ────────────────────────────────────────────────

/// GET /api/v1/dependencies
pub async fn get_dependencies(State(state): State<ApiState>) -> impl IntoResponse {
    let (graph, report) = state.fleet.dependencies().await;
    ApiResponse::ok(DependencyView { graph, report })
}

/// GET /api/v1/alerts
pub async fn list_alerts(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.fleet.active_alerts())
}

/// GET /api/v1/readiness
pub async fn get_readiness(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.fleet.readiness().await)
}

// ── Prometheus ─────────────────────────────────────────────────

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let health = state.fleet.health().await;
    let alerts = state.fleet.active_alerts();
    let body = crate::metrics::render_prometheus(&health, &state.fleet.healing_stats(), alerts.len());
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

//! warden-api: HTTP query surface for the monitor.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/services` | Every service with its latest health record |
//! | GET | `/api/v1/services/{name}` | One service |
//! | POST | `/api/v1/services/{name}/heal` | Run the healing chain for a service |
//! | GET | `/api/v1/dependencies` | Dependency graph and validation report |
//! | GET | `/api/v1/alerts` | Active alerts |
//! | GET | `/api/v1/readiness` | Fresh readiness assessment |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;
pub mod metrics;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::routing::{get, post};

use warden_alert::AlertEvent;
use warden_core::{HealthRecord, ServiceDefinition};
use warden_deps::DependencyReport;
use warden_heal::HealingStats;
use warden_readiness::ReadinessAssessment;

pub use metrics::render_prometheus;

/// Read and control access to a running monitor.
#[async_trait]
pub trait Fleet: Send + Sync {
    async fn services(&self) -> BTreeMap<String, ServiceDefinition>;

    async fn health(&self) -> BTreeMap<String, HealthRecord>;

    /// Adjacency list and the latest validation report.
    async fn dependencies(&self) -> (BTreeMap<String, BTreeSet<String>>, DependencyReport);

    fn active_alerts(&self) -> Vec<AlertEvent>;

    async fn readiness(&self) -> ReadinessAssessment;

    /// `None` when the service is not registered.
    async fn heal(&self, service: &str) -> Option<bool>;

    fn healing_stats(&self) -> HealingStats;
}

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub fleet: Arc<dyn Fleet>,
}

/// Build the complete API router (REST + metrics).
pub fn build_router(fleet: Arc<dyn Fleet>) -> Router {
    let state = ApiState { fleet };

    let api_routes = Router::new()
        .route("/services", get(handlers::list_services))
        .route("/services/{name}", get(handlers::get_service))
        .route("/services/{name}/heal", post(handlers::heal_service))
        .route("/dependencies", get(handlers::get_dependencies))
        .route("/alerts", get(handlers::list_alerts))
        .route("/readiness", get(handlers::get_readiness))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::prometheus_metrics).with_state(state))
}

//! Router tests against an in-memory fleet.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use warden_alert::{AlertEvent, AlertStatus, Severity};
use warden_api::{Fleet, build_router};
use warden_core::{HealthRecord, HealthStatus, ServiceCategory, ServiceDefinition};
use warden_deps::{DependencyGraph, DependencyReport};
use warden_heal::HealingStats;
use warden_readiness::{CheckCategory, CheckResult, CheckSeverity, ReadinessAssessment};

struct StaticFleet {
    services: BTreeMap<String, ServiceDefinition>,
    health: BTreeMap<String, HealthRecord>,
    heals: AtomicU64,
}

impl StaticFleet {
    fn new() -> Arc<Self> {
        let services: BTreeMap<String, ServiceDefinition> = [
            ServiceDefinition::new("postgres", ServiceCategory::Datastore, "db.internal", 5432),
            ServiceDefinition::new("api", ServiceCategory::ApiService, "api.internal", 8000)
                .with_dependencies(["postgres", "redis"]),
        ]
        .into_iter()
        .map(|s| (s.name.clone(), s))
        .collect();

        let mut api = HealthRecord::unknown("api");
        api.status = HealthStatus::Healthy;
        api.response_time = Some(0.02);
        let mut postgres = HealthRecord::unknown("postgres");
        postgres.status = HealthStatus::Unhealthy;
        postgres.error = Some("Timeout".to_string());
        postgres.consecutive_failures = 3;

        Arc::new(Self {
            services,
            health: BTreeMap::from([("api".to_string(), api), ("postgres".to_string(), postgres)]),
            heals: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl Fleet for StaticFleet {
    async fn services(&self) -> BTreeMap<String, ServiceDefinition> {
        self.services.clone()
    }

    async fn health(&self) -> BTreeMap<String, HealthRecord> {
        self.health.clone()
    }

    async fn dependencies(&self) -> (BTreeMap<String, BTreeSet<String>>, DependencyReport) {
        let graph = DependencyGraph::build(&self.services);
        let report = graph.validate(&self.health);
        (graph.edges().clone(), report)
    }

    fn active_alerts(&self) -> Vec<AlertEvent> {
        vec![AlertEvent {
            rule: "service_down".to_string(),
            service: "postgres".to_string(),
            severity: Severity::Critical,
            message: "Service postgres is down: Timeout".to_string(),
            triggered_at: 1_700_000_000,
            resolved_at: None,
            status: AlertStatus::Active,
        }]
    }

    async fn readiness(&self) -> ReadinessAssessment {
        let results = vec![CheckResult {
            name: "datastores_healthy".to_string(),
            category: CheckCategory::Infrastructure,
            severity: CheckSeverity::High,
            required: true,
            passed: false,
            details: "datastore services down: postgres (unhealthy)".to_string(),
        }];
        ReadinessAssessment::from_results(results, 1_700_000_000)
    }

    async fn heal(&self, service: &str) -> Option<bool> {
        if !self.services.contains_key(service) {
            return None;
        }
        self.heals.fetch_add(1, Ordering::SeqCst);
        Some(service == "postgres")
    }

    fn healing_stats(&self) -> HealingStats {
        HealingStats {
            attempts: self.heals.load(Ordering::SeqCst),
            ..Default::default()
        }
    }
}

async fn call(fleet: Arc<StaticFleet>, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
    let router = build_router(fleet);
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, body)
}

async fn call_json(fleet: Arc<StaticFleet>, method: &str, uri: &str) -> (StatusCode, Value) {
    let (status, body) = call(fleet, method, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn list_services_joins_health() {
    let (status, json) = call_json(StaticFleet::new(), "GET", "/api/v1/services").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    let services = json["data"].as_array().unwrap();
    assert_eq!(services.len(), 2);
    assert_eq!(services[0]["name"], "api");
    assert_eq!(services[0]["category"], "API_SERVICE");
    assert_eq!(services[0]["health"]["status"], "healthy");
    assert_eq!(services[1]["health"]["consecutive_failures"], 3);
}

#[tokio::test]
async fn get_service_and_not_found() {
    let fleet = StaticFleet::new();
    let (status, json) = call_json(fleet.clone(), "GET", "/api/v1/services/postgres").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["port"], 5432);
    assert_eq!(json["data"]["health"]["error"], "Timeout");

    let (status, json) = call_json(fleet, "GET", "/api/v1/services/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "service not found");
}

#[tokio::test]
async fn dependencies_report_missing_and_unhealthy() {
    let (status, json) = call_json(StaticFleet::new(), "GET", "/api/v1/dependencies").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["graph"]["api"], serde_json::json!(["postgres", "redis"]));
    assert_eq!(json["data"]["report"]["missing"], serde_json::json!(["api -> redis (not found)"]));
    assert_eq!(json["data"]["report"]["unhealthy"], serde_json::json!(["api -> postgres (unhealthy)"]));
}

#[tokio::test]
async fn alerts_and_readiness() {
    let fleet = StaticFleet::new();
    let (_, json) = call_json(fleet.clone(), "GET", "/api/v1/alerts").await;
    assert_eq!(json["data"][0]["rule"], "service_down");
    assert_eq!(json["data"][0]["severity"], "critical");

    let (status, json) = call_json(fleet, "GET", "/api/v1/readiness").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["readiness_level"], "TESTING_READY");
    assert_eq!(json["data"]["score"], 0.0);
}

#[tokio::test]
async fn heal_outcomes() {
    let fleet = StaticFleet::new();
    let (status, json) = call_json(fleet.clone(), "POST", "/api/v1/services/postgres/heal").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["healed"], true);

    let (status, json) = call_json(fleet.clone(), "POST", "/api/v1/services/api/heal").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"], "all healing strategies failed for api");

    let (status, _) = call_json(fleet.clone(), "POST", "/api/v1/services/ghost/heal").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(fleet.heals.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn metrics_are_prometheus_text() {
    let router = build_router(StaticFleet::new());
    let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.contains("text/plain"));

    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("warden_service_up{service=\"postgres\"} 0"));
    assert!(text.contains("warden_active_alerts 1"));
}

//! End-to-end: real HTTP probes against in-process services, then the
//! REST API on top of the resulting monitor state.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;

use warden_core::WardenConfig;
use wardend::Monitor;

/// Answer every connection with the same JSON health body.
async fn serve_forever(status_line: &'static str, body: &'static str) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = sock.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = sock.write_all(response.as_bytes()).await;
                let _ = sock.shutdown().await;
            });
        }
    });
    port
}

/// A port nothing listens on.
async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn fleet() -> (tempfile::TempDir, Arc<Monitor>) {
    let api = serve_forever("200 OK", r#"{"status":"healthy"}"#).await;
    let cache = serve_forever("200 OK", r#"{"status":"degraded"}"#).await;
    let postgres = closed_port().await;

    let manifest = format!(
        "
services:
  postgres:
    ports: ['{postgres}:5432']
  redis-cache:
    ports: ['{cache}:6379']
    labels:
      warden.health_path: /ping
  api:
    ports: ['{api}:8000']
    depends_on: [postgres, redis-cache]
"
    );

    let dir = tempfile::tempdir().unwrap();
    let manifest_path = dir.path().join("docker-compose.yml");
    std::fs::write(&manifest_path, manifest).unwrap();

    let config = WardenConfig::from_toml_str(&format!(
        r#"
[monitor]
timeout_seconds = 2

[discovery]
manifests = ["{}"]
default_host = "127.0.0.1"

[[alerts.sinks]]
kind = "log"

[healing]
strategies = ["process"]
"#,
        manifest_path.display()
    ))
    .unwrap();

    let monitor = Monitor::from_config(config, dir.path().to_path_buf()).unwrap();
    (dir, Arc::new(monitor))
}

async fn get_json(monitor: &Arc<Monitor>, uri: &str) -> (StatusCode, Value) {
    let router = warden_api::build_router(Arc::<Monitor>::clone(monitor));
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn cycle_classifies_real_services() {
    let (_dir, monitor) = fleet().await;
    let summary = monitor.run_cycle().await;
    assert_eq!(summary.services, 3);
    assert_eq!(summary.unhealthy, 1);
    assert!(summary.alerts.iter().any(|a| a.rule == "service_down" && a.service == "postgres"));
    assert_eq!(summary.dependencies.unhealthy, vec!["api -> postgres (unhealthy)"]);
    assert_eq!(summary.dispatch.delivered, summary.alerts.len());

    let (status, json) = get_json(&monitor, "/api/v1/services").await;
    assert_eq!(status, StatusCode::OK);
    let by_name = |name: &str| {
        json["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["name"] == name)
            .cloned()
            .unwrap()
    };
    assert_eq!(by_name("api")["health"]["status"], "healthy");
    assert_eq!(by_name("redis-cache")["health"]["status"], "degraded");
    assert_eq!(by_name("postgres")["health"]["status"], "unhealthy");
    assert_eq!(by_name("postgres")["health"]["error"], "Service not reachable");
}

#[tokio::test]
async fn readiness_and_metrics_follow_the_cycle() {
    let (_dir, monitor) = fleet().await;
    monitor.run_cycle().await;

    let (_, json) = get_json(&monitor, "/api/v1/readiness").await;
    assert_eq!(json["data"]["readiness_level"], "NOT_READY");
    assert!(
        json["data"]["critical_issues"]
            .as_array()
            .unwrap()
            .iter()
            .any(|i| i.as_str().unwrap().contains("postgres"))
    );

    let router = warden_api::build_router(Arc::<Monitor>::clone(&monitor));
    let resp = router
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("warden_service_up{service=\"api\"} 1"));
    assert!(text.contains("warden_service_up{service=\"postgres\"} 0"));
    assert!(text.contains("warden_service_status{service=\"redis-cache\",status=\"degraded\"} 1"));
}

#[tokio::test]
async fn heal_without_configured_backend_fails_over_api() {
    let (_dir, monitor) = fleet().await;
    monitor.run_cycle().await;

    let router = warden_api::build_router(Arc::<Monitor>::clone(&monitor));
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/services/postgres/heal")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let stats = monitor.healing_stats();
    assert_eq!(stats.attempts, 1);
    assert_eq!(stats.failures, 1);
}

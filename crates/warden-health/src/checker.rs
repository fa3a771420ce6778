//! Health probe logic.
//!
//! The production probe first checks raw TCP reachability, then issues an
//! HTTP/1.1 GET against the service's health path and classifies the reply.

use std::time::Duration;

use async_trait::async_trait;
use http_body_util::BodyExt;
use serde::Deserialize;
use tracing::debug;

use warden_core::{HealthStatus, ServiceDefinition};

use crate::error::ProbeError;

/// Result of a single health probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 2xx with `status: healthy`, or with no usable body.
    Healthy,
    /// 2xx with `status: degraded`.
    Degraded,
    /// The service is not healthy.
    Failed(ProbeError),
}

impl ProbeOutcome {
    /// Classify a 2xx body's `status` field.
    ///
    /// An absent or unparseable body still counts as healthy: the service
    /// answered, which is all the confidence we can get.
    pub fn from_reported(reported: Option<&str>) -> Self {
        match reported.map(|s| s.trim().to_ascii_lowercase()) {
            None => Self::Healthy,
            Some(s) if s == "healthy" => Self::Healthy,
            Some(s) if s == "degraded" => Self::Degraded,
            Some(other) => Self::Failed(ProbeError::Reported(other)),
        }
    }

    pub fn status(&self) -> HealthStatus {
        match self {
            Self::Healthy => HealthStatus::Healthy,
            Self::Degraded => HealthStatus::Degraded,
            Self::Failed(_) => HealthStatus::Unhealthy,
        }
    }
}

/// A way of asking a service how it is doing.
///
/// Returning `Err` means the probe itself malfunctioned; the engine records
/// the service as UNKNOWN rather than UNHEALTHY.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, service: &ServiceDefinition, timeout: Duration) -> anyhow::Result<ProbeOutcome>;
}

#[derive(Debug, Deserialize)]
struct ProbeBody {
    status: Option<String>,
}

/// HTTP health probe over a plain TCP connection.
#[derive(Debug, Clone, Default)]
pub struct HttpProbe;

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, service: &ServiceDefinition, timeout: Duration) -> anyhow::Result<ProbeOutcome> {
        let address = service.address();

        // Connectivity pre-check.
        let stream = match tokio::time::timeout(timeout, tokio::net::TcpStream::connect(&address)).await {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => {
                debug!(error = %e, %address, "health probe connection failed");
                return Ok(ProbeOutcome::Failed(ProbeError::Unreachable));
            }
            Err(_) => {
                debug!(%address, "health probe connection timed out");
                return Ok(ProbeOutcome::Failed(ProbeError::Unreachable));
            }
        };

        match tokio::time::timeout(timeout, http_get(stream, &address, &service.health_path)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(%address, path = %service.health_path, "health probe timed out");
                Ok(ProbeOutcome::Failed(ProbeError::Timeout))
            }
        }
    }
}

async fn http_get(
    stream: tokio::net::TcpStream,
    address: &str,
    path: &str,
) -> anyhow::Result<ProbeOutcome> {
    let uri = format!("http://{address}{path}");

    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = match hyper::client::conn::http1::handshake(io).await {
        Ok(pair) => pair,
        Err(e) => {
            debug!(error = %e, %uri, "health probe handshake failed");
            return Ok(ProbeOutcome::Failed(ProbeError::Transport(e.to_string())));
        }
    };

    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let req = http::Request::builder()
        .method("GET")
        .uri(&uri)
        .header("host", address)
        .header("user-agent", "warden-health/0.1")
        .header("accept", "application/json")
        .body(http_body_util::Empty::<bytes::Bytes>::new())?;

    let resp = match sender.send_request(req).await {
        Ok(resp) => resp,
        Err(e) => {
            debug!(error = %e, %uri, "health probe request failed");
            return Ok(ProbeOutcome::Failed(ProbeError::Transport(e.to_string())));
        }
    };

    let status = resp.status();
    if !status.is_success() {
        debug!(%status, %uri, "health probe non-2xx");
        return Ok(ProbeOutcome::Failed(ProbeError::BadStatus(status.as_u16())));
    }

    let reported = match resp.into_body().collect().await {
        Ok(body) => serde_json::from_slice::<ProbeBody>(&body.to_bytes())
            .ok()
            .and_then(|b| b.status),
        Err(e) => {
            debug!(error = %e, %uri, "health probe body unreadable");
            None
        }
    };

    Ok(ProbeOutcome::from_reported(reported.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use warden_core::ServiceCategory;

    /// Serve a single canned HTTP response and return the bound port.
    async fn serve_once(response: String) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut sock, _)) = listener.accept().await {
                let mut buf = [0u8; 2048];
                let _ = sock.read(&mut buf).await;
                let _ = sock.write_all(response.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });
        port
    }

    fn response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn service(port: u16) -> ServiceDefinition {
        ServiceDefinition::new("svc", ServiceCategory::ApiService, "127.0.0.1", port)
    }

    async fn probe_port(port: u16) -> ProbeOutcome {
        HttpProbe
            .probe(&service(port), Duration::from_millis(500))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn healthy_body() {
        let port = serve_once(response("200 OK", r#"{"status":"healthy"}"#)).await;
        assert_eq!(probe_port(port).await, ProbeOutcome::Healthy);
    }

    #[tokio::test]
    async fn degraded_body() {
        let port = serve_once(response("200 OK", r#"{"status":"degraded","db":"slow"}"#)).await;
        assert_eq!(probe_port(port).await, ProbeOutcome::Degraded);
    }

    #[tokio::test]
    async fn unparseable_body_is_healthy() {
        let port = serve_once(response("200 OK", "pong")).await;
        assert_eq!(probe_port(port).await, ProbeOutcome::Healthy);
    }

    #[tokio::test]
    async fn empty_body_is_healthy() {
        let port = serve_once(response("204 No Content", "")).await;
        assert_eq!(probe_port(port).await, ProbeOutcome::Healthy);
    }

    #[tokio::test]
    async fn non_2xx_is_bad_status() {
        let port = serve_once(response("503 Service Unavailable", "")).await;
        let outcome = probe_port(port).await;
        assert_eq!(outcome, ProbeOutcome::Failed(ProbeError::BadStatus(503)));
        assert_eq!(outcome.status(), HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        assert_eq!(
            probe_port(port).await,
            ProbeOutcome::Failed(ProbeError::Unreachable)
        );
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((sock, _)) = listener.accept().await {
                tokio::time::sleep(Duration::from_secs(5)).await;
                drop(sock);
            }
        });
        let outcome = HttpProbe
            .probe(&service(port), Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(outcome, ProbeOutcome::Failed(ProbeError::Timeout));
    }

    #[test]
    fn reported_status_classification() {
        assert_eq!(ProbeOutcome::from_reported(None), ProbeOutcome::Healthy);
        assert_eq!(ProbeOutcome::from_reported(Some("HEALTHY")), ProbeOutcome::Healthy);
        assert_eq!(ProbeOutcome::from_reported(Some("degraded")), ProbeOutcome::Degraded);
        assert_eq!(
            ProbeOutcome::from_reported(Some("down")),
            ProbeOutcome::Failed(ProbeError::Reported("down".to_string()))
        );
    }

    #[test]
    fn probe_error_text() {
        assert_eq!(ProbeError::Unreachable.to_string(), "Service not reachable");
        assert_eq!(ProbeError::Timeout.to_string(), "Timeout");
        assert_eq!(ProbeError::BadStatus(500).to_string(), "HTTP 500");
    }
}

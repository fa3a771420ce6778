//! Remediation strategies.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use warden_core::ServiceDefinition;
use warden_core::config::{HealingConfig, StrategyKind};

/// One way of bringing a service back.
#[async_trait]
pub trait HealStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok` means the restart was issued successfully.
    async fn restart(&self, service: &ServiceDefinition) -> anyhow::Result<()>;
}

/// Run a command to completion, failing on timeout or non-zero exit.
async fn run_command(mut cmd: Command, timeout: Duration) -> anyhow::Result<()> {
    cmd.kill_on_drop(true);
    debug!(command = ?cmd, "running healing command");

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| anyhow::anyhow!("command timed out after {}s", timeout.as_secs()))?
        .context("failed to spawn command")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("command exited with {}: {}", output.status, stderr.trim());
    }
    Ok(())
}

/// `docker restart <container_ref>`.
///
/// The binary can be swapped for any docker-compatible CLI (e.g. podman).
#[derive(Debug, Clone)]
pub struct ContainerRestart {
    binary: String,
    timeout: Duration,
}

impl ContainerRestart {
    pub fn new(timeout: Duration) -> Self {
        Self {
            binary: "docker".to_string(),
            timeout,
        }
    }

    pub fn with_binary(mut self, binary: &str) -> Self {
        self.binary = binary.to_string();
        self
    }
}

#[async_trait]
impl HealStrategy for ContainerRestart {
    fn name(&self) -> &str {
        "container"
    }

    async fn restart(&self, service: &ServiceDefinition) -> anyhow::Result<()> {
        let target = service.container_ref.as_deref().unwrap_or(service.name.as_str());
        let mut cmd = Command::new(&self.binary);
        cmd.arg("restart").arg(target);
        run_command(cmd, self.timeout).await
    }
}

/// `kubectl rollout restart deployment/<name> -n <namespace>`.
#[derive(Debug, Clone)]
pub struct OrchestratorRestart {
    binary: String,
    namespace: String,
    timeout: Duration,
}

impl OrchestratorRestart {
    pub fn new(namespace: &str, timeout: Duration) -> Self {
        Self {
            binary: "kubectl".to_string(),
            namespace: namespace.to_string(),
            timeout,
        }
    }

    pub fn with_binary(mut self, binary: &str) -> Self {
        self.binary = binary.to_string();
        self
    }
}

#[async_trait]
impl HealStrategy for OrchestratorRestart {
    fn name(&self) -> &str {
        "orchestrator"
    }

    async fn restart(&self, service: &ServiceDefinition) -> anyhow::Result<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["rollout", "restart"])
            .arg(format!("deployment/{}", service.name))
            .arg("-n")
            .arg(&self.namespace);
        run_command(cmd, self.timeout).await
    }
}

/// Runs a shell command template through `sh -c`.
///
/// `{name}` becomes a quoted reference to the first positional parameter,
/// which carries the service name, so the name is never parsed as shell.
#[derive(Debug, Clone)]
pub struct ProcessRestart {
    template: String,
    timeout: Duration,
}

impl ProcessRestart {
    pub fn new(template: &str, timeout: Duration) -> Self {
        Self {
            template: template.to_string(),
            timeout,
        }
    }

    /// The script handed to `sh -c`.
    pub fn script(&self) -> String {
        self.template.replace("{name}", "\"$1\"")
    }
}

#[async_trait]
impl HealStrategy for ProcessRestart {
    fn name(&self) -> &str {
        "process"
    }

    async fn restart(&self, service: &ServiceDefinition) -> anyhow::Result<()> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(self.script()).arg("sh").arg(&service.name);
        run_command(cmd, self.timeout).await
    }
}

/// Stand-in for a backend that is not configured. Always fails.
#[derive(Debug, Clone)]
pub struct Unavailable {
    name: String,
}

impl Unavailable {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string() }
    }
}

#[async_trait]
impl HealStrategy for Unavailable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn restart(&self, _service: &ServiceDefinition) -> anyhow::Result<()> {
        bail!("{} capability not configured", self.name)
    }
}

/// Instantiate the strategy for `kind` from configuration.
pub fn build_strategy(kind: StrategyKind, config: &HealingConfig) -> Arc<dyn HealStrategy> {
    let timeout = config.command_timeout();
    match kind {
        StrategyKind::Container => Arc::new(ContainerRestart::new(timeout)),
        StrategyKind::Orchestrator => match &config.orchestrator_namespace {
            Some(ns) => Arc::new(OrchestratorRestart::new(ns, timeout)),
            None => Arc::new(Unavailable::new("orchestrator")),
        },
        StrategyKind::Process => match &config.process_restart_command {
            Some(template) => Arc::new(ProcessRestart::new(template, timeout)),
            None => Arc::new(Unavailable::new("process")),
        },
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use warden_core::ServiceCategory;

    fn service() -> ServiceDefinition {
        let mut s = ServiceDefinition::new("worker", ServiceCategory::BackgroundWorker, "localhost", 9000);
        s.container_ref = Some("docs-worker".to_string());
        s
    }

    #[tokio::test]
    async fn process_restart_success_and_failure() {
        let ok = ProcessRestart::new("test {name} = worker", Duration::from_secs(5));
        assert_eq!(ok.script(), "test \"$1\" = worker");
        ok.restart(&service()).await.unwrap();

        let failing = ProcessRestart::new("echo boom >&2; exit 3", Duration::from_secs(5));
        let err = failing.restart(&service()).await.unwrap_err().to_string();
        assert!(err.contains("boom"), "{err}");
    }

    #[tokio::test]
    async fn service_name_is_not_shell_code() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("injected");
        let name = format!("x; touch {}", marker.display());
        let svc = ServiceDefinition::new(&name, ServiceCategory::BackgroundWorker, "localhost", 9000);

        let strategy = ProcessRestart::new("true {name}", Duration::from_secs(5));
        strategy.restart(&svc).await.unwrap();
        assert!(!marker.exists());

        // The whole name arrives as one argument.
        let verbatim = ProcessRestart::new(&format!("test {{name}} = '{name}'"), Duration::from_secs(5));
        verbatim.restart(&svc).await.unwrap();
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn commands_time_out() {
        let slow = ProcessRestart::new("sleep 5", Duration::from_millis(100));
        let err = slow.restart(&service()).await.unwrap_err().to_string();
        assert!(err.contains("timed out"), "{err}");
    }

    #[tokio::test]
    async fn container_restart_targets_container_ref() {
        // `echo` exits 0 whatever its arguments.
        let strategy = ContainerRestart::new(Duration::from_secs(5)).with_binary("echo");
        strategy.restart(&service()).await.unwrap();

        let missing = ContainerRestart::new(Duration::from_secs(5)).with_binary("/nonexistent/docker");
        assert!(missing.restart(&service()).await.is_err());
    }

    #[tokio::test]
    async fn unconfigured_backends_are_stubbed() {
        let config = HealingConfig::default();
        let orchestrator = build_strategy(StrategyKind::Orchestrator, &config);
        assert_eq!(orchestrator.name(), "orchestrator");
        let err = orchestrator.restart(&service()).await.unwrap_err();
        assert_eq!(err.to_string(), "orchestrator capability not configured");

        let process = build_strategy(StrategyKind::Process, &config);
        assert!(process.restart(&service()).await.is_err());
    }

    #[tokio::test]
    async fn configured_orchestrator_runs_binary() {
        let strategy = OrchestratorRestart::new("docs", Duration::from_secs(5)).with_binary("true");
        strategy.restart(&service()).await.unwrap();
    }
}

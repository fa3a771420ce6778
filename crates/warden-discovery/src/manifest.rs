//! Compose-style manifest parsing.
//!
//! Only the fields the engine needs are read; everything else in an entry
//! (image, environment, volumes, ...) is ignored. Engine-specific settings
//! ride along as `warden.*` labels.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use warden_core::config::DiscoveryConfig;
use warden_core::{ResourceLimits, ServiceDefinition};

use crate::category::infer_category;
use crate::error::DiscoveryError;

const LABEL_PREFIX: &str = "warden.";

/// Values applied when an entry does not say otherwise.
#[derive(Debug, Clone)]
pub struct ManifestDefaults {
    pub host: String,
    pub health_path: String,
}

impl Default for ManifestDefaults {
    fn default() -> Self {
        Self::from_config(&DiscoveryConfig::default())
    }
}

impl ManifestDefaults {
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self {
            host: config.default_host.clone(),
            health_path: config.default_health_path.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServiceEntry {
    container_name: Option<String>,
    #[serde(default)]
    ports: Vec<Value>,
    depends_on: Option<DependsOn>,
    labels: Option<Value>,
    deploy: Option<Deploy>,
}

/// `depends_on` is either a list of names or a map keyed by name.
/// Both forms keep declaration order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DependsOn {
    List(Vec<String>),
    Map(Mapping),
}

impl DependsOn {
    fn into_names(self) -> Vec<String> {
        match self {
            Self::List(names) => names,
            Self::Map(map) => map.keys().filter_map(scalar_string).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Deploy {
    resources: Option<Resources>,
}

#[derive(Debug, Deserialize)]
struct Resources {
    limits: Option<Limits>,
}

#[derive(Debug, Deserialize)]
struct Limits {
    cpus: Option<Value>,
    memory: Option<Value>,
}

/// Parse one manifest into service definitions.
///
/// Returns every definition that could be built plus one error per skipped
/// entry. A manifest that is not YAML or lacks a `services` mapping yields
/// no definitions and a single error.
pub fn parse_manifest(
    source_name: &str,
    content: &str,
    defaults: &ManifestDefaults,
) -> (Vec<ServiceDefinition>, Vec<DiscoveryError>) {
    let root: Value = match serde_yaml::from_str(content) {
        Ok(v) => v,
        Err(e) => {
            return (
                Vec::new(),
                vec![DiscoveryError::Manifest {
                    source_name: source_name.to_string(),
                    reason: e.to_string(),
                }],
            );
        }
    };

    let services = match root.get("services") {
        Some(Value::Mapping(services)) => services,
        _ => {
            return (
                Vec::new(),
                vec![DiscoveryError::Manifest {
                    source_name: source_name.to_string(),
                    reason: "missing `services` mapping".to_string(),
                }],
            );
        }
    };

    let mut definitions = Vec::new();
    let mut errors = Vec::new();

    for (key, value) in services {
        let Some(name) = key.as_str() else {
            errors.push(DiscoveryError::Entry {
                service: format!("{key:?}"),
                reason: "service name is not a string".to_string(),
            });
            continue;
        };

        let built = serde_yaml::from_value::<ServiceEntry>(value.clone())
            .map_err(|e| e.to_string())
            .and_then(|entry| build_definition(name, entry, defaults));

        match built {
            Ok(def) => {
                debug!(service = %def.name, category = %def.category, "parsed manifest entry");
                definitions.push(def);
            }
            Err(reason) => errors.push(DiscoveryError::Entry {
                service: name.to_string(),
                reason,
            }),
        }
    }

    (definitions, errors)
}

fn build_definition(
    name: &str,
    entry: ServiceEntry,
    defaults: &ManifestDefaults,
) -> Result<ServiceDefinition, String> {
    let labels = match &entry.labels {
        Some(raw) => parse_labels(raw)?,
        None => BTreeMap::new(),
    };
    let label = |key: &str| labels.get(&format!("{LABEL_PREFIX}{key}")).map(String::as_str);

    let port = match label("port") {
        Some(raw) => raw
            .parse::<u16>()
            .map_err(|_| format!("invalid warden.port label {raw:?}"))?,
        None => match entry.ports.first() {
            Some(spec) => published_port(spec)?,
            None => return Err("no published port".to_string()),
        },
    };

    let category = infer_category(name);
    let host = label("host").unwrap_or(defaults.host.as_str());
    let mut def = ServiceDefinition::new(name, category, host, port);
    def.health_path = label("health_path")
        .unwrap_or(defaults.health_path.as_str())
        .to_string();
    def.dependencies = entry.depends_on.map(DependsOn::into_names).unwrap_or_default();
    def.container_ref = Some(entry.container_name.unwrap_or_else(|| name.to_string()));

    if let Some(raw) = label("critical") {
        def.critical = parse_bool(raw).ok_or_else(|| format!("invalid warden.critical label {raw:?}"))?;
    }
    if let Some(raw) = label("startup_timeout") {
        def.startup_timeout_secs = parse_number(raw, "startup_timeout")?;
    }
    if let Some(raw) = label("check_interval") {
        def.check_interval_secs = parse_number(raw, "check_interval")?;
    }
    if let Some(raw) = label("max_restart_attempts") {
        def.max_restart_attempts = parse_number(raw, "max_restart_attempts")?;
    }

    if let Some(limits) = entry.deploy.and_then(|d| d.resources).and_then(|r| r.limits) {
        let cpus = match limits.cpus.as_ref().and_then(scalar_string) {
            Some(raw) => Some(
                raw.parse::<f64>()
                    .map_err(|_| format!("invalid cpu limit {raw:?}"))?,
            ),
            None => None,
        };
        let resources = ResourceLimits {
            cpus,
            memory: limits.memory.as_ref().and_then(scalar_string),
        };
        if !resources.is_empty() {
            def.resources = Some(resources);
        }
    }

    Ok(def)
}

/// Host-side port of a `ports` entry.
fn published_port(spec: &Value) -> Result<u16, String> {
    match spec {
        Value::Mapping(map) => {
            let raw = map
                .get("published")
                .or_else(|| map.get("target"))
                .and_then(scalar_string)
                .ok_or_else(|| "port mapping has no published or target port".to_string())?;
            parse_short_port(&raw)
        }
        other => match scalar_string(other) {
            Some(raw) => parse_short_port(&raw),
            None => Err(format!("unrecognized port entry {other:?}")),
        },
    }
}

/// Parse the short port syntax: `8000`, `8000:80`, `127.0.0.1:8000:80`,
/// `8000-8002:8000-8002`, `8000/tcp`.
fn parse_short_port(raw: &str) -> Result<u16, String> {
    let without_proto = raw.split('/').next().unwrap_or(raw);
    let parts: Vec<&str> = without_proto.split(':').collect();
    let host_side = match parts.as_slice() {
        [single] => *single,
        [published, _target] => *published,
        [_ip, published, _target] => *published,
        _ => return Err(format!("unrecognized port mapping {raw:?}")),
    };
    let first = host_side.split('-').next().unwrap_or(host_side);
    first
        .trim()
        .parse::<u16>()
        .map_err(|_| format!("invalid port {raw:?}"))
}

/// Labels are either a map or a list of `key=value` strings.
fn parse_labels(raw: &Value) -> Result<BTreeMap<String, String>, String> {
    let mut labels = BTreeMap::new();
    match raw {
        Value::Mapping(map) => {
            for (k, v) in map {
                let (Some(k), Some(v)) = (k.as_str(), scalar_string(v)) else {
                    return Err(format!("invalid label {k:?}"));
                };
                labels.insert(k.to_string(), v);
            }
        }
        Value::Sequence(items) => {
            for item in items {
                let pair = item.as_str().ok_or_else(|| format!("invalid label {item:?}"))?;
                let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                labels.insert(k.to_string(), v.to_string());
            }
        }
        Value::Null => {}
        other => return Err(format!("labels must be a map or list, got {other:?}")),
    }
    Ok(labels)
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str, label: &str) -> Result<T, String> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| format!("invalid warden.{label} label {raw:?}"))
}

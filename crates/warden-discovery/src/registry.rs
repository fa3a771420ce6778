//! Service registry: TTL-cached view of the discovered fleet.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use warden_core::config::{DiscoveryConfig, MonitorConfig};
use warden_core::ServiceDefinition;

use crate::error::DiscoveryError;
use crate::manifest::{ManifestDefaults, parse_manifest};

/// Immutable map of service name → definition, shared with readers.
pub type ServiceMap = Arc<BTreeMap<String, ServiceDefinition>>;

/// Where a manifest comes from.
#[derive(Debug, Clone)]
pub enum ManifestSource {
    /// A YAML file read on every refresh.
    File(PathBuf),
    /// Manifest content held in memory.
    Inline { name: String, content: String },
}

impl ManifestSource {
    fn name(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Inline { name, .. } => name.clone(),
        }
    }

    async fn read(&self) -> Result<String, DiscoveryError> {
        match self {
            Self::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                DiscoveryError::Read {
                    source_name: self.name(),
                    reason: e.to_string(),
                }
            }),
            Self::Inline { content, .. } => Ok(content.clone()),
        }
    }
}

struct CachedServices {
    services: ServiceMap,
    refreshed_at: Instant,
}

/// Discovers services from manifest sources and caches the result.
pub struct ServiceRegistry {
    sources: Vec<ManifestSource>,
    defaults: ManifestDefaults,
    /// Cache lifetime.
    interval: Duration,
    cache: RwLock<Option<CachedServices>>,
}

impl ServiceRegistry {
    pub fn new(sources: Vec<ManifestSource>, defaults: ManifestDefaults, interval: Duration) -> Self {
        Self {
            sources,
            defaults,
            interval,
            cache: RwLock::new(None),
        }
    }

    /// Build a registry over the manifest files named in the configuration.
    pub fn from_config(discovery: &DiscoveryConfig, monitor: &MonitorConfig) -> Self {
        let sources = discovery
            .manifests
            .iter()
            .cloned()
            .map(ManifestSource::File)
            .collect();
        Self::new(
            sources,
            ManifestDefaults::from_config(discovery),
            monitor.discovery_interval(),
        )
    }

    /// Return the service map, refreshing it when stale or when forced.
    pub async fn discover(&self, force: bool) -> ServiceMap {
        if !force {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref()
                && cached.refreshed_at.elapsed() < self.interval
            {
                debug!(services = cached.services.len(), "using cached service map");
                return Arc::clone(&cached.services);
            }
        }

        let (services, errors) = self.load().await;
        for e in &errors {
            warn!(error = %e, "discovery problem");
        }
        info!(
            services = services.len(),
            skipped = errors.len(),
            "service discovery complete"
        );

        let services: ServiceMap = Arc::new(services);
        let mut cache = self.cache.write().await;
        *cache = Some(CachedServices {
            services: Arc::clone(&services),
            refreshed_at: Instant::now(),
        });
        services
    }

    /// The last discovered map without triggering a refresh.
    pub async fn current(&self) -> ServiceMap {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .map(|c| Arc::clone(&c.services))
            .unwrap_or_default()
    }

    /// Look up one service in the last discovered map.
    pub async fn get(&self, name: &str) -> Option<ServiceDefinition> {
        self.current().await.get(name).cloned()
    }

    /// Read every source and merge the definitions. Later sources win.
    pub async fn load(&self) -> (BTreeMap<String, ServiceDefinition>, Vec<DiscoveryError>) {
        let mut services = BTreeMap::new();
        let mut errors = Vec::new();

        for source in &self.sources {
            let content = match source.read().await {
                Ok(c) => c,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };
            let (defs, mut source_errors) = parse_manifest(&source.name(), &content, &self.defaults);
            errors.append(&mut source_errors);
            for def in defs {
                services.insert(def.name.clone(), def);
            }
        }

        (services, errors)
    }
}

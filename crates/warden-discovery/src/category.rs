//! Service category inference from service names.

use warden_core::ServiceCategory;

const DATASTORE_KEYWORDS: &[&str] = &[
    "postgres",
    "mysql",
    "mariadb",
    "mongo",
    "redis",
    "elasticsearch",
    "opensearch",
    "minio",
    "database",
    "storage",
];

const QUEUE_KEYWORDS: &[&str] = &["rabbitmq", "kafka", "nats", "queue", "broker", "mq"];

const PROXY_KEYWORDS: &[&str] = &["nginx", "traefik", "haproxy", "envoy", "proxy", "balancer"];

const MONITOR_KEYWORDS: &[&str] = &[
    "prometheus",
    "grafana",
    "alertmanager",
    "jaeger",
    "loki",
    "monitor",
    "metrics",
];

const WORKER_KEYWORDS: &[&str] = &["worker", "celery", "consumer", "scheduler", "cron"];

/// Infer a category by matching the lowercased name against keyword sets.
///
/// Sets are tried in a fixed order (datastore, queue, proxy, monitor,
/// worker); the first hit wins and anything else is an API service.
pub fn infer_category(name: &str) -> ServiceCategory {
    let name = name.to_ascii_lowercase();
    let table: [(&[&str], ServiceCategory); 5] = [
        (DATASTORE_KEYWORDS, ServiceCategory::Datastore),
        (QUEUE_KEYWORDS, ServiceCategory::MessageQueue),
        (PROXY_KEYWORDS, ServiceCategory::LoadBalancer),
        (MONITOR_KEYWORDS, ServiceCategory::Monitoring),
        (WORKER_KEYWORDS, ServiceCategory::BackgroundWorker),
    ];

    table
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| name.contains(k)))
        .map(|(_, category)| *category)
        .unwrap_or(ServiceCategory::ApiService)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_infrastructure_names() {
        assert_eq!(infer_category("postgres"), ServiceCategory::Datastore);
        assert_eq!(infer_category("Redis-Cache"), ServiceCategory::Datastore);
        assert_eq!(infer_category("rabbitmq"), ServiceCategory::MessageQueue);
        assert_eq!(infer_category("nginx"), ServiceCategory::LoadBalancer);
        assert_eq!(infer_category("grafana"), ServiceCategory::Monitoring);
        assert_eq!(infer_category("pdf-worker"), ServiceCategory::BackgroundWorker);
    }

    #[test]
    fn unmatched_names_are_api_services() {
        assert_eq!(infer_category("doc-renderer"), ServiceCategory::ApiService);
        assert_eq!(infer_category("gateway"), ServiceCategory::ApiService);
    }

    #[test]
    fn datastore_wins_over_later_sets() {
        // "redis-queue" hits both sets; datastore is checked first.
        assert_eq!(infer_category("redis-queue"), ServiceCategory::Datastore);
    }
}

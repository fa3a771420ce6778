//! Directed "depends on" graph over service names.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use warden_core::{HealthRecord, HealthStatus, ServiceDefinition};

/// Problems found by [`DependencyGraph::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyReport {
    /// Each cycle as the path from the repeated node back to itself.
    pub circular: Vec<Vec<String>>,
    /// `"A -> Z (not found)"` for dependencies on unregistered services.
    pub missing: Vec<String>,
    /// `"A -> B (status)"` for dependencies on unhealthy or unknown services.
    pub unhealthy: Vec<String>,
}

impl DependencyReport {
    pub fn is_clean(&self) -> bool {
        self.circular.is_empty() && self.missing.is_empty() && self.unhealthy.is_empty()
    }
}

/// Adjacency list: service → services it depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Build the graph from the registry. Every registered service is a node,
    /// even without dependencies.
    pub fn build(services: &BTreeMap<String, ServiceDefinition>) -> Self {
        let edges = services
            .values()
            .map(|s| (s.name.clone(), s.dependencies.iter().cloned().collect()))
            .collect();
        Self { edges }
    }

    pub fn edges(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.edges
    }

    fn neighbors(&self, node: &str) -> Vec<&str> {
        self.edges
            .get(node)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Find cycles with a depth-first search from every unvisited node.
    ///
    /// Each back edge into a node still on the traversal path yields one
    /// cycle, e.g. `[A, B, C, A]`.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut cycles = Vec::new();

        for root in self.edges.keys().map(String::as_str) {
            if visited.contains(root) {
                continue;
            }

            // Explicit recursion stack: (node, its neighbors, next neighbor index).
            let mut stack: Vec<(&str, Vec<&str>, usize)> = Vec::new();
            let mut path: Vec<&str> = Vec::new();
            let mut on_path: HashSet<&str> = HashSet::new();

            visited.insert(root);
            path.push(root);
            on_path.insert(root);
            stack.push((root, self.neighbors(root), 0));

            while let Some((node, neighbors, next)) = stack.last_mut() {
                let Some(&neighbor) = neighbors.get(*next) else {
                    on_path.remove(*node);
                    path.pop();
                    stack.pop();
                    continue;
                };
                *next += 1;

                if on_path.contains(neighbor) {
                    if let Some(start) = path.iter().position(|n| *n == neighbor) {
                        let mut cycle: Vec<String> =
                            path[start..].iter().map(|n| n.to_string()).collect();
                        cycle.push(neighbor.to_string());
                        cycles.push(cycle);
                    }
                } else if visited.insert(neighbor) {
                    path.push(neighbor);
                    on_path.insert(neighbor);
                    let next_neighbors = self.neighbors(neighbor);
                    stack.push((neighbor, next_neighbors, 0));
                }
            }
        }

        cycles
    }

    /// Cross-check the graph against the registry and the latest health.
    pub fn validate(&self, health: &BTreeMap<String, HealthRecord>) -> DependencyReport {
        let mut report = DependencyReport {
            circular: self.detect_cycles(),
            ..Default::default()
        };

        for (service, deps) in &self.edges {
            for dep in deps {
                if !self.edges.contains_key(dep) {
                    report.missing.push(format!("{service} -> {dep} (not found)"));
                    continue;
                }
                let status = health
                    .get(dep)
                    .map(|r| r.status)
                    .unwrap_or(HealthStatus::Unknown);
                if matches!(status, HealthStatus::Unhealthy | HealthStatus::Unknown) {
                    report.unhealthy.push(format!("{service} -> {dep} ({status})"));
                }
            }
        }

        for cycle in &report.circular {
            warn!(cycle = %cycle.join(" -> "), "dependency cycle detected");
        }
        report
    }
}

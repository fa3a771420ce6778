//! warden-deps: dependency graph analysis for the monitored fleet.
//!
//! The graph is rebuilt from service definitions on every cycle. Cycles,
//! dependencies on unknown services and dependencies on failing services
//! are all reported as data; none of them stop the engine.

pub mod graph;

pub use graph::{DependencyGraph, DependencyReport};

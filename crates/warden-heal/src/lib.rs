//! warden-heal: on-demand remediation of unhealthy services.
//!
//! A [`HealingController`] holds an ordered chain of [`HealStrategy`]
//! implementations per service. `heal` walks the chain and stops at the
//! first strategy that succeeds. There is no retry inside one invocation;
//! deciding when to heal is the caller's business.
//!
//! Backends that are not configured (no orchestrator namespace, no process
//! restart command) are replaced by [`Unavailable`], which always fails.

pub mod controller;
pub mod error;
pub mod strategy;

pub use controller::{HealingController, HealingStats};
pub use error::{HealingError, HealingResult};
pub use strategy::{
    ContainerRestart, HealStrategy, OrchestratorRestart, ProcessRestart, Unavailable, build_strategy,
};

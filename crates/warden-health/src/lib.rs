//! warden-health: health checking for the monitored fleet.
//!
//! Provides a reusable circuit breaker, an HTTP health probe, and the
//! concurrent check engine that turns probe results into per-service
//! health records.
//!
//! # Architecture
//!
//! ```text
//! HealthEngine::check_all(services)
//!   ├── one task per service, gated by a Semaphore(max_concurrent_checks)
//!   │   └── CircuitBreaker::call (keyed by service name)
//!   │       └── timeout(Probe::probe) → ProbeOutcome
//!   └── commit: consecutive failures vs. previous record, rolling uptime
//! ```
//!
//! A probe that fails, hangs, errors or panics only affects its own
//! service's record; every service in the batch yields a record.

pub mod breaker;
pub mod checker;
pub mod engine;
pub mod error;
pub mod uptime;

pub use breaker::{BreakerRegistry, CircuitBreaker};
pub use checker::{HttpProbe, Probe, ProbeOutcome};
pub use engine::{EngineOptions, HealthEngine};
pub use error::{BreakerError, CheckError, ProbeError};
pub use uptime::UptimeWindow;

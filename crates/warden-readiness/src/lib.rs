//! warden-readiness: turns fleet state into a deployment verdict.
//!
//! The [`ReadinessAggregator`] runs a fixed battery of [`ReadinessCheck`]s
//! against a [`ReadinessContext`] snapshot and classifies the results:
//!
//! ```text
//! any critical failure, or > 2 required failures   → NOT_READY
//! 1-2 required failures                            → TESTING_READY
//! only non-required high-severity failures         → DEVELOPMENT_READY
//! otherwise                                        → PRODUCTION_READY
//! ```
//!
//! An evaluator that errors or panics counts as a failed check; it never
//! aborts the run.

pub mod aggregator;
pub mod assessment;
pub mod battery;
pub mod check;

pub use aggregator::ReadinessAggregator;
pub use assessment::{CategorySummary, ReadinessAssessment, ReadinessLevel, classify};
pub use battery::standard_checks;
pub use check::{CheckCategory, CheckOutcome, CheckResult, CheckSeverity, ReadinessCheck, ReadinessContext};

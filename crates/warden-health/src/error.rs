//! Health checking error types.

use thiserror::Error;

/// Why a probe judged a service unhealthy. The display text is what ends
/// up in the health record's `error` field.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Service not reachable")]
    Unreachable,

    #[error("Timeout")]
    Timeout,

    #[error("HTTP {0}")]
    BadStatus(u16),

    #[error("reported status \"{0}\"")]
    Reported(String),

    #[error("{0}")]
    Transport(String),
}

/// Error returned by [`CircuitBreaker::call`](crate::CircuitBreaker::call).
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The breaker is open; the operation was not attempted.
    #[error("circuit breaker open for {operation}")]
    Open { operation: String },

    #[error("{0}")]
    Operation(E),
}

/// Failure of one guarded health check.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// The probe implementation itself failed, as opposed to the service.
    #[error("probe error: {0}")]
    Internal(anyhow::Error),
}

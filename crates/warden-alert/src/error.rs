//! Alert dispatch error types.

use serde::Serialize;
use thiserror::Error;

/// One sink failed to deliver one alert.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[error("sink {sink} failed to deliver {rule}/{service}: {reason}")]
pub struct AlertDispatchError {
    pub sink: String,
    pub rule: String,
    pub service: String,
    pub reason: String,
}

//! Discovery error types.

use thiserror::Error;

/// A problem found while reading manifests. Never fatal to a discovery cycle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("failed to read manifest {source_name}: {reason}")]
    Read { source_name: String, reason: String },

    #[error("invalid manifest {source_name}: {reason}")]
    Manifest { source_name: String, reason: String },

    #[error("skipping service {service}: {reason}")]
    Entry { service: String, reason: String },
}

//! warden-core: shared types and configuration for the Warden health engine.
//!
//! Every other crate in the workspace speaks in terms of the types defined
//! here: service definitions produced by discovery, health records produced
//! by the check engine, and the parsed `warden.toml` configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::WardenConfig;
pub use error::{ConfigError, ConfigResult};
pub use types::*;

/// Current unix time in seconds.
pub fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

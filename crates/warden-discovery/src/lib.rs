//! warden-discovery: builds the canonical set of monitored services.
//!
//! Manifests are compose-style YAML files. Each `services` entry becomes a
//! [`ServiceDefinition`](warden_core::ServiceDefinition); malformed entries
//! are logged and skipped so that one bad entry never empties the registry.
//!
//! # Caching
//!
//! ```text
//! discover(force)
//!   ├── cache age < discovery_interval && !force → cached Arc<map>
//!   └── otherwise
//!       ├── read every manifest source
//!       ├── parse entries (skip + warn on DiscoveryError)
//!       └── swap in the fully built map
//! ```
//!
//! Readers always hold an `Arc` to a complete map; a refresh never mutates
//! a map that has already been handed out.

pub mod category;
pub mod error;
pub mod manifest;
pub mod registry;

pub use category::infer_category;
pub use error::DiscoveryError;
pub use manifest::{ManifestDefaults, parse_manifest};
pub use registry::{ManifestSource, ServiceMap, ServiceRegistry};

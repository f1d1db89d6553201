//! logplane-config — engine configuration synthesis.
//!
//! Builds the complete, internally-consistent configuration document for
//! the distributed log engine from the aggregated topology, the optional
//! object-storage backend, TLS state, and operator settings. The builder
//! is a pure function of its inputs: identical inputs render to
//! byte-identical YAML, every tick.
//!
//! The document is a typed struct tree ([`model`]) serialized at the
//! boundary; absent optional sections are omitted entirely, never
//! emitted as nulls or empty maps.

pub mod builder;
pub mod model;
pub mod paths;

pub use builder::{ConfigBuilder, ConfigError};
pub use model::EngineConfig;

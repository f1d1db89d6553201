//! logplane-core — shared domain types for the logplane coordinator.
//!
//! This crate holds the pieces every other logplane crate agrees on:
//! the closed worker-role model and its meta-role expansion, the
//! per-tick aggregated topology snapshot, the deployment coherency
//! predicates, operator-supplied settings (validated, never trusted),
//! and the object-storage credential type.
//!
//! Everything here is pure data plus small total functions; no I/O.

pub mod coherence;
pub mod roles;
pub mod settings;
pub mod storage;
pub mod topology;

pub use coherence::DeploymentHealth;
pub use roles::{DEFAULT_REPLICATION, MINIMAL_DEPLOYMENT, REPLICATION_MIN_WORKERS, Role, expand_roles};
pub use settings::{OperatorSettings, SettingsError};
pub use storage::S3Config;
pub use topology::TopologySnapshot;

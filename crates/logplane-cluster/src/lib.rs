//! logplane-cluster — aggregation of the worker fleet's advertisements.
//!
//! Workers advertise their roles (application-scoped) and addresses
//! (unit-scoped) over the relation transport as key → JSON-string maps.
//! This crate decodes those databags and folds them into the per-tick
//! [`TopologySnapshot`](logplane_core::TopologySnapshot) every synthesis
//! step consumes.
//!
//! Malformed payloads are isolated per record: a bad unit databag skips
//! that unit, a bad application databag skips that relation's
//! contribution, and neither ever aborts the read.

pub mod advertisement;
pub mod aggregate;
pub mod databag;

pub use advertisement::{
    CoordinatorAppData, RelationSnapshot, UnitSnapshot, WorkerAppData, WorkerUnitData,
};
pub use aggregate::{ClusterState, UnitTopology};
pub use databag::{DatabagError, decode_databag, encode_databag};

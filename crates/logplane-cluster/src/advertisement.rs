//! Advertisement payload types.
//!
//! `RelationSnapshot`/`UnitSnapshot` are the raw, untrusted view the
//! transport hands us; `WorkerAppData`/`WorkerUnitData` are the typed
//! payloads recovered from them via the databag codec. The coordinator
//! only ever reads worker payloads; `CoordinatorAppData` is the single
//! payload it writes back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use logplane_core::Role;

/// One worker application's relation: its app-scoped databag plus one
/// record per live unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSnapshot {
    pub app_data: BTreeMap<String, String>,
    pub units: Vec<UnitSnapshot>,
}

/// One live worker unit's databag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub unit: String,
    pub application: String,
    pub data: BTreeMap<String, String>,
}

/// Application-scoped worker advertisement: the roles this application
/// has taken on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerAppData {
    pub roles: Vec<Role>,
}

/// Unit-scoped worker advertisement: the unit's reachable address plus
/// free-form topology labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerUnitData {
    pub address: String,
    #[serde(default)]
    pub topology: BTreeMap<String, String>,
}

/// Coordinator-published payload: the rendered worker configuration and
/// optionally the endpoints workers should advertise onward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorAppData {
    pub worker_config: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loki_endpoints: Option<BTreeMap<String, String>>,
}

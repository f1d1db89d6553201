//! Aggregated topology snapshot — the per-tick view of the worker fleet.
//!
//! Derived from peer advertisements at the start of every reconciliation
//! and never persisted. All synthesis consumes this read-only value.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::roles::Role;

/// Role → unit-count and role → address-set view of the fleet.
///
/// Invariants (maintained by the aggregator that builds this):
/// - keys are atomic roles only; `all` declarations are expanded before
///   counts and addresses are recorded,
/// - every address in a role's set comes from a live worker unit whose
///   application declares that role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub counts: BTreeMap<Role, usize>,
    pub addresses_by_role: BTreeMap<Role, BTreeSet<String>>,
}

impl TopologySnapshot {
    /// The union of every role's address set.
    pub fn all_addresses(&self) -> BTreeSet<String> {
        self.addresses_by_role
            .values()
            .flat_map(|set| set.iter().cloned())
            .collect()
    }

    /// Number of addresses serving `role`.
    pub fn role_scale(&self, role: Role) -> usize {
        self.addresses_by_role
            .get(&role)
            .map(BTreeSet::len)
            .unwrap_or(0)
    }
}

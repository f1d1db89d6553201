//! Fleet aggregation — fold peer advertisements into the topology view.
//!
//! Every gather walks the relation snapshots fresh; nothing is cached
//! between calls. Aggregation accumulates the records that validate and
//! logs the ones that do not, one diagnostic per bad record.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use logplane_core::{Role, TopologySnapshot, expand_roles};

use crate::advertisement::{
    CoordinatorAppData, RelationSnapshot, WorkerAppData, WorkerUnitData,
};
use crate::databag::{decode_databag, encode_databag};

/// Flat per-unit listing for observability; not used in config synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTopology {
    pub unit: String,
    pub application: String,
    pub address: String,
}

/// The read-only view of all worker relations for one reconciliation tick.
#[derive(Debug, Clone, Default)]
pub struct ClusterState {
    relations: Vec<RelationSnapshot>,
}

impl ClusterState {
    pub fn new(relations: Vec<RelationSnapshot>) -> Self {
        Self { relations }
    }

    pub fn relations(&self) -> &[RelationSnapshot] {
        &self.relations
    }

    /// Sum the unit count behind each advertised role, meta-roles expanded.
    ///
    /// An advertisement represents a scaled application: each of its
    /// expanded roles gains that application's live-unit count, not 1.
    pub fn gather_role_counts(&self) -> BTreeMap<Role, usize> {
        let mut counts = BTreeMap::new();
        for relation in &self.relations {
            let roles = match decode_databag::<WorkerAppData>(&relation.app_data) {
                Ok(data) => data.roles,
                Err(err) => {
                    info!(error = %err, "skipping relation with invalid app databag");
                    continue;
                }
            };

            let unit_count = relation.units.len();
            for role in expand_roles(roles) {
                *counts.entry(role).or_insert(0) += unit_count;
            }
        }
        counts
    }

    /// Collect each live unit's address under every atomic role its
    /// application declares.
    ///
    /// One bad unit databag skips that unit only; the rest of the
    /// relation still contributes.
    pub fn gather_addresses_by_role(&self) -> BTreeMap<Role, BTreeSet<String>> {
        let mut data: BTreeMap<Role, BTreeSet<String>> = BTreeMap::new();
        for relation in &self.relations {
            let roles = match decode_databag::<WorkerAppData>(&relation.app_data) {
                Ok(app_data) => expand_roles(app_data.roles),
                Err(err) => {
                    info!(error = %err, "skipping relation with invalid app databag");
                    continue;
                }
            };

            for unit in &relation.units {
                let unit_data = match decode_databag::<WorkerUnitData>(&unit.data) {
                    Ok(unit_data) => unit_data,
                    Err(err) => {
                        info!(unit = %unit.unit, error = %err, "skipping unit with invalid databag");
                        continue;
                    }
                };
                for role in &roles {
                    data.entry(*role)
                        .or_default()
                        .insert(unit_data.address.clone());
                }
            }
        }
        data
    }

    /// The union of every role's address set.
    pub fn gather_addresses(&self) -> BTreeSet<String> {
        self.gather_addresses_by_role()
            .into_values()
            .flatten()
            .collect()
    }

    /// Flat unit/application/address listing for diagnostics.
    pub fn gather_topology(&self) -> Vec<UnitTopology> {
        let mut topology = Vec::new();
        for relation in &self.relations {
            for unit in &relation.units {
                let unit_data = match decode_databag::<WorkerUnitData>(&unit.data) {
                    Ok(unit_data) => unit_data,
                    Err(err) => {
                        info!(unit = %unit.unit, error = %err, "skipping unit with invalid databag");
                        continue;
                    }
                };
                topology.push(UnitTopology {
                    unit: unit.unit.clone(),
                    application: unit.application.clone(),
                    address: unit_data.address,
                });
            }
        }
        topology
    }

    /// Build the complete per-tick topology snapshot.
    pub fn snapshot(&self) -> TopologySnapshot {
        let snapshot = TopologySnapshot {
            counts: self.gather_role_counts(),
            addresses_by_role: self.gather_addresses_by_role(),
        };
        debug!(
            roles = snapshot.counts.len(),
            addresses = snapshot.all_addresses().len(),
            "aggregated fleet topology"
        );
        snapshot
    }

    /// Encode the outbound coordinator payload, one databag per relation.
    pub fn publish_payloads(
        &self,
        worker_config: &str,
        loki_endpoints: Option<&BTreeMap<String, String>>,
    ) -> Vec<BTreeMap<String, String>> {
        let payload = CoordinatorAppData {
            worker_config: worker_config.to_string(),
            loki_endpoints: loki_endpoints.cloned(),
        };

        self.relations
            .iter()
            .map(|_| {
                // Encoding a plain struct with string fields cannot fail.
                encode_databag(&payload).unwrap_or_default()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advertisement::UnitSnapshot;
    use proptest::prelude::*;

    fn app_data(roles: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("roles".to_string(), roles.to_string())])
    }

    fn unit(name: &str, app: &str, address: &str) -> UnitSnapshot {
        UnitSnapshot {
            unit: name.to_string(),
            application: app.to_string(),
            data: BTreeMap::from([("address".to_string(), format!("\"{address}\""))]),
        }
    }

    fn relation(roles: &str, units: Vec<UnitSnapshot>) -> RelationSnapshot {
        RelationSnapshot {
            app_data: app_data(roles),
            units,
        }
    }

    #[test]
    fn role_counts_scale_by_unit_count() {
        let state = ClusterState::new(vec![relation(
            r#"["read"]"#,
            vec![
                unit("reader/0", "reader", "10.0.0.1"),
                unit("reader/1", "reader", "10.0.0.2"),
            ],
        )]);

        assert_eq!(
            state.gather_role_counts(),
            BTreeMap::from([(Role::Read, 2)])
        );
    }

    #[test]
    fn meta_role_counts_toward_every_atomic_role() {
        let state = ClusterState::new(vec![relation(
            r#"["all"]"#,
            vec![unit("worker/0", "worker", "10.0.0.1")],
        )]);

        assert_eq!(
            state.gather_role_counts(),
            BTreeMap::from([(Role::Read, 1), (Role::Write, 1), (Role::Backend, 1)])
        );
    }

    #[test]
    fn invalid_app_databag_is_skipped_not_fatal() {
        let state = ClusterState::new(vec![
            relation("not json", vec![unit("bad/0", "bad", "10.9.9.9")]),
            relation(r#"["write"]"#, vec![unit("writer/0", "writer", "10.0.0.3")]),
        ]);

        assert_eq!(
            state.gather_role_counts(),
            BTreeMap::from([(Role::Write, 1)])
        );
    }

    #[test]
    fn addresses_grouped_by_expanded_role() {
        let state = ClusterState::new(vec![
            relation(r#"["all"]"#, vec![unit("worker/0", "worker", "10.0.0.1")]),
            relation(r#"["read"]"#, vec![unit("reader/0", "reader", "10.0.0.2")]),
        ]);

        let by_role = state.gather_addresses_by_role();
        let read: Vec<_> = by_role[&Role::Read].iter().cloned().collect();
        assert_eq!(read, vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(by_role[&Role::Write].len(), 1);
        assert_eq!(by_role[&Role::Backend].len(), 1);
    }

    #[test]
    fn one_bad_unit_does_not_invalidate_the_relation() {
        let mut bad_unit = unit("writer/1", "writer", "ignored");
        bad_unit.data = BTreeMap::from([("address".to_string(), "oops".to_string())]);

        let state = ClusterState::new(vec![relation(
            r#"["write"]"#,
            vec![unit("writer/0", "writer", "10.0.0.1"), bad_unit],
        )]);

        let by_role = state.gather_addresses_by_role();
        assert_eq!(
            by_role[&Role::Write],
            BTreeSet::from(["10.0.0.1".to_string()])
        );
    }

    #[test]
    fn gather_addresses_unions_roles() {
        let state = ClusterState::new(vec![
            relation(r#"["read"]"#, vec![unit("reader/0", "reader", "10.0.0.1")]),
            relation(r#"["write"]"#, vec![unit("writer/0", "writer", "10.0.0.1")]),
            relation(r#"["backend"]"#, vec![unit("backend/0", "backend", "10.0.0.2")]),
        ]);

        assert_eq!(
            state.gather_addresses(),
            BTreeSet::from(["10.0.0.1".to_string(), "10.0.0.2".to_string()])
        );
    }

    #[test]
    fn topology_lists_every_valid_unit() {
        let state = ClusterState::new(vec![relation(
            r#"["read"]"#,
            vec![
                unit("reader/0", "reader", "10.0.0.1"),
                unit("reader/1", "reader", "10.0.0.2"),
            ],
        )]);

        let topology = state.gather_topology();
        assert_eq!(topology.len(), 2);
        assert_eq!(topology[0].unit, "reader/0");
        assert_eq!(topology[0].address, "10.0.0.1");
    }

    #[test]
    fn snapshot_combines_counts_and_addresses() {
        let state = ClusterState::new(vec![relation(
            r#"["backend"]"#,
            vec![unit("backend/0", "backend", "10.0.0.9")],
        )]);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.counts[&Role::Backend], 1);
        assert_eq!(snapshot.role_scale(Role::Backend), 1);
    }

    #[test]
    fn publish_payloads_one_per_relation() {
        let state = ClusterState::new(vec![
            relation(r#"["read"]"#, vec![]),
            relation(r#"["write"]"#, vec![]),
        ]);

        let payloads = state.publish_payloads("auth_enabled: false\n", None);
        assert_eq!(payloads.len(), 2);
        assert_eq!(
            payloads[0].get("worker_config").unwrap(),
            r#""auth_enabled: false\n""#
        );
    }

    fn arb_roles_json() -> impl Strategy<Value = String> {
        proptest::collection::vec(
            prop_oneof![
                Just("read"),
                Just("write"),
                Just("backend"),
                Just("all"),
            ],
            0..4,
        )
        .prop_map(|roles| {
            let quoted: Vec<String> = roles.iter().map(|r| format!("\"{r}\"")).collect();
            format!("[{}]", quoted.join(","))
        })
    }

    proptest! {
        #[test]
        fn count_keys_are_always_atomic(roles_json in arb_roles_json(), units in 0usize..4) {
            let units = (0..units)
                .map(|i| unit(&format!("w/{i}"), "w", &format!("10.0.0.{i}")))
                .collect();
            let state = ClusterState::new(vec![relation(&roles_json, units)]);

            for role in state.gather_role_counts().keys() {
                prop_assert!(!role.is_meta());
            }
            for role in state.gather_addresses_by_role().keys() {
                prop_assert!(!role.is_meta());
            }
        }
    }
}

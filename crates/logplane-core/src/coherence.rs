//! Deployment coherency — is the observed fleet a valid deployment?
//!
//! Pure predicates over the aggregated role counts. The surrounding
//! reconciler maps an incoherent deployment to a blocking status naming
//! the missing roles, and a coherent-but-thin one to an advisory.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::roles::{MINIMAL_DEPLOYMENT, RECOMMENDED_DEPLOYMENT, Role};

/// True iff the observed role set covers the minimal deployment.
pub fn is_coherent(counts: &BTreeMap<Role, usize>) -> bool {
    MINIMAL_DEPLOYMENT
        .iter()
        .all(|role| counts.contains_key(role))
}

/// The minimally-required roles no advertisement declares.
pub fn missing_roles(counts: &BTreeMap<Role, usize>) -> BTreeSet<Role> {
    MINIMAL_DEPLOYMENT
        .iter()
        .copied()
        .filter(|role| !counts.contains_key(role))
        .collect()
}

/// True iff every role meets its recommended unit count.
pub fn is_recommended(counts: &BTreeMap<Role, usize>) -> bool {
    RECOMMENDED_DEPLOYMENT
        .iter()
        .all(|(role, min_n)| counts.get(role).copied().unwrap_or(0) >= *min_n)
}

/// Derived deployment health, recomputed every tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentHealth {
    pub is_coherent: bool,
    pub missing_roles: BTreeSet<Role>,
    pub is_recommended: bool,
}

impl DeploymentHealth {
    pub fn evaluate(counts: &BTreeMap<Role, usize>) -> Self {
        Self {
            is_coherent: is_coherent(counts),
            missing_roles: missing_roles(counts),
            is_recommended: is_recommended(counts),
        }
    }
}

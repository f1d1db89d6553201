//! Worker role model — the closed set of roles a worker can declare.
//!
//! Roles are defined at compile time and never created or destroyed at
//! runtime. `all` is the single meta-role; it expands to every atomic
//! role via an explicit lookup table rather than any inheritance
//! relationship, so exhaustive `match` handling stays possible.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A functional responsibility a worker process can take on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Query path.
    Read,
    /// Ingest path.
    Write,
    /// Internal path (compactor, ruler, scheduler).
    Backend,
    /// Meta-role: expands to every atomic role.
    All,
}

/// The atomic (non-meta) roles.
pub const ATOMIC_ROLES: [Role; 3] = [Role::Read, Role::Write, Role::Backend];

/// Roles that must all be present for the deployment to be coherent.
pub const MINIMAL_DEPLOYMENT: [Role; 3] = [Role::Read, Role::Write, Role::Backend];

/// Unit counts per role for the deployment to be considered robust
/// according to the upstream recommendations.
pub const RECOMMENDED_DEPLOYMENT: [(Role, usize); 3] = [
    (Role::Read, 3),
    (Role::Write, 3),
    (Role::Backend, 3),
];

/// Minimum number of backend workers required to enable replication.
pub const REPLICATION_MIN_WORKERS: usize = 3;

/// Replication factor applied once enough backend workers exist;
/// below the threshold replication is disabled by setting the factor to 1.
pub const DEFAULT_REPLICATION: u64 = 3;

impl Role {
    /// Expand this role to its atomic members.
    ///
    /// Atomic roles expand to themselves.
    pub fn expand(self) -> &'static [Role] {
        match self {
            Role::Read => &[Role::Read],
            Role::Write => &[Role::Write],
            Role::Backend => &[Role::Backend],
            Role::All => &ATOMIC_ROLES,
        }
    }

    /// Whether this is a meta-role.
    pub fn is_meta(self) -> bool {
        matches!(self, Role::All)
    }

    /// The wire name for this role, also used as the upstream pool name.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Read => "read",
            Role::Write => "write",
            Role::Backend => "backend",
            Role::All => "all",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expand any meta-roles in `roles` to their atomic equivalents.
///
/// Idempotent: `expand_roles(expand_roles(s)) == expand_roles(s)`.
pub fn expand_roles<I>(roles: I) -> BTreeSet<Role>
where
    I: IntoIterator<Item = Role>,
{
    roles
        .into_iter()
        .flat_map(|role| role.expand().iter().copied())
        .collect()
}

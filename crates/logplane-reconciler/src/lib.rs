//! logplane-reconciler — one reconciliation tick, start to finish.
//!
//! Each tick runs synchronously to completion: aggregate the fleet,
//! evaluate health, synthesize both configuration documents, push them
//! to the workload filesystem only when their content hash changed,
//! consolidate alert rules and re-sync them when their aggregate hash
//! moved, and assemble the payloads the transport publishes to peers.
//!
//! The external dispatcher guarantees at most one tick in flight; no
//! state is carried between ticks beyond what sits on the filesystem.

pub mod digest;
pub mod reconciler;
pub mod rules;
pub mod status;

pub use digest::{sha256_hex, write_if_changed};
pub use reconciler::{
    ReconcileContext, ReconcileError, ReconcileOutcome, Reconciler, ReconcilerPaths,
};
pub use rules::{RulesSync, RulesSyncError};
pub use status::Status;

//! Operator-facing deployment status.

use std::fmt;

use serde::{Deserialize, Serialize};

use logplane_core::DeploymentHealth;

/// What the operator sees after a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum Status {
    /// Coherent and at recommended scale.
    Active,
    /// Coherent but thinner than recommended; non-blocking advisory.
    Degraded(String),
    /// Incoherent; the deployment cannot serve until this is resolved.
    Blocked(String),
}

impl Status {
    pub fn from_health(health: &DeploymentHealth) -> Self {
        if !health.is_coherent {
            let missing: Vec<String> = health
                .missing_roles
                .iter()
                .map(|role| role.to_string())
                .collect();
            Status::Blocked(format!("missing roles: {}", missing.join(", ")))
        } else if !health.is_recommended {
            Status::Degraded("deployment is below the recommended scale".to_string())
        } else {
            Status::Active
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Status::Blocked(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Active => f.write_str("active"),
            Status::Degraded(reason) => write!(f, "degraded: {reason}"),
            Status::Blocked(reason) => write!(f, "blocked: {reason}"),
        }
    }
}

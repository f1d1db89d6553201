//! Object-storage credentials.
//!
//! Presence or absence of this value is a binary mode switch for the
//! engine config: present means object-storage directives, absent means
//! local-filesystem directives. There is no partial state.

use serde::{Deserialize, Serialize};

/// Credentials and location of the object-storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub insecure: bool,
}

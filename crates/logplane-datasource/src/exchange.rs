//! Datasource exchange payloads.
//!
//! Each peer relation carries a single `datasources` key holding a JSON
//! list of records. Encoding sorts records by uid so the published
//! payload is stable regardless of enumeration order; decoding isolates
//! failures per relation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use logplane_cluster::{DatabagError, decode_databag, encode_databag};

/// The kind tag we publish for our own datasource.
pub const DATASOURCE_TYPE: &str = "loki";

/// One datasource identity as another system's dashboards know it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasourceRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub uid: String,
    pub grafana_uid: String,
}

/// App-scoped databag payload on a datasource-exchange relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsExchangeAppData {
    /// JSON-encoded list of [`DatasourceRecord`].
    pub datasources: String,
}

/// The record this deployment publishes toward one receiving peer.
pub fn publish_record(local_uid: &str, receiver_grafana_uid: &str) -> DatasourceRecord {
    DatasourceRecord {
        kind: DATASOURCE_TYPE.to_string(),
        uid: local_uid.to_string(),
        grafana_uid: receiver_grafana_uid.to_string(),
    }
}

/// Encode records as the outbound databag, sorted by uid.
pub fn publish_payload(
    records: &[DatasourceRecord],
) -> Result<BTreeMap<String, String>, DatabagError> {
    let mut sorted: Vec<&DatasourceRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.uid.cmp(&b.uid));

    let datasources = serde_json::to_string(&sorted).map_err(DatabagError::Schema)?;
    encode_databag(&DsExchangeAppData { datasources })
}

/// Decode every peer's received records; a malformed relation payload
/// contributes nothing and logs a diagnostic.
pub fn received_records(relations: &[BTreeMap<String, String>]) -> Vec<DatasourceRecord> {
    let mut records = Vec::new();
    for bag in relations {
        let app_data: DsExchangeAppData = match decode_databag(bag) {
            Ok(data) => data,
            Err(err) => {
                info!(error = %err, "skipping datasource relation with invalid databag");
                continue;
            }
        };
        match serde_json::from_str::<Vec<DatasourceRecord>>(&app_data.datasources) {
            Ok(parsed) => records.extend(parsed),
            Err(err) => {
                info!(error = %err, "skipping datasource relation with invalid record list");
            }
        }
    }
    records
}

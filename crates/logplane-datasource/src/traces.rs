//! Logs-to-traces correlation.
//!
//! For every received record whose kind matches the tracing system's
//! tag, emit one derived-field rule that lifts trace ids out of log
//! lines and links them to that datasource. No qualifying record means
//! no section at all; an empty `derivedFields` list is never emitted.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::exchange::DatasourceRecord;

/// Fixed matcher lifting a trace id out of a log line.
pub const TRACE_ID_MATCHER: &str = r#"[tT]race_?[iI][dD]"?[:=]"?(\w+)"#;

/// Dashboard-layer derived-field configuration, camelCase on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsToTracesConfig {
    pub derived_fields: Vec<DerivedField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedField {
    pub datasource_uid: String,
    pub matcher_regex: String,
    pub name: String,
    pub url: String,
}

/// Build the correlation config from received records.
///
/// Records sharing a `grafana_uid` are collapsed deterministically: the
/// lexicographically smallest uid wins.
pub fn correlate(
    received: &[DatasourceRecord],
    tracing_kind: &str,
) -> Option<LogsToTracesConfig> {
    let mut sorted: Vec<&DatasourceRecord> = received
        .iter()
        .filter(|record| record.kind == tracing_kind)
        .collect();
    sorted.sort_by(|a, b| a.uid.cmp(&b.uid));

    let mut seen = std::collections::BTreeSet::new();
    let matching: Vec<&DatasourceRecord> = sorted
        .into_iter()
        .filter(|record| seen.insert(record.grafana_uid.clone()))
        .collect();

    if matching.is_empty() {
        return None;
    }

    debug!(
        rules = matching.len(),
        tracing_kind, "derived logs-to-traces correlation"
    );

    Some(LogsToTracesConfig {
        derived_fields: matching
            .into_iter()
            .map(|record| DerivedField {
                datasource_uid: record.uid.clone(),
                matcher_regex: TRACE_ID_MATCHER.to_string(),
                name: "TraceID".to_string(),
                url: "${__value.raw}".to_string(),
            })
            .collect(),
    })
}

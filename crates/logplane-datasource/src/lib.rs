//! logplane-datasource — dashboard-datasource identifier exchange.
//!
//! Observability systems related to this deployment exchange the
//! identifiers their dashboards know them by. We publish our own record
//! to every peer and, from the records we receive, derive the
//! logs-to-traces correlation handed to the dashboard layer.

pub mod exchange;
pub mod traces;

pub use exchange::{
    DatasourceRecord, DsExchangeAppData, publish_payload, publish_record, received_records,
};
pub use traces::{DerivedField, LogsToTracesConfig, TRACE_ID_MATCHER, correlate};

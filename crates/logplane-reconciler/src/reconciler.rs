//! The reconciliation tick.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use logplane_cluster::ClusterState;
use logplane_config::{ConfigBuilder, ConfigError};
use logplane_core::{DeploymentHealth, OperatorSettings, S3Config, SettingsError};
use logplane_datasource::{
    LogsToTracesConfig, correlate, publish_payload, publish_record, received_records,
};
use logplane_nginx::{NginxConfig, ProxyOptions};

use crate::digest::write_if_changed;
use crate::rules::{RulesSync, consolidate_rules, default_hash_file, sync_if_changed};
use crate::status::Status;

/// Errors that abort a tick.
///
/// Per the error taxonomy, only invalid operator configuration and a
/// failed render abort; filesystem pushes and the external sync tool
/// degrade to warnings and retry next tick.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Render(#[from] ConfigError),
}

/// Where this tick's outputs land on the workload filesystem.
#[derive(Debug, Clone)]
pub struct ReconcilerPaths {
    pub engine_config: PathBuf,
    pub nginx_config: PathBuf,
    /// Per-identity alert-rule source directories.
    pub rules_sources: Vec<PathBuf>,
    /// Consolidated rules directory; the hash sidecar lives inside it.
    pub rules_dir: PathBuf,
}

impl Default for ReconcilerPaths {
    fn default() -> Self {
        Self {
            engine_config: PathBuf::from("/etc/loki/loki-config.yaml"),
            nginx_config: PathBuf::from("/etc/nginx/nginx.conf"),
            rules_sources: Vec::new(),
            rules_dir: PathBuf::from("/etc/loki/alert-rules"),
        }
    }
}

/// Everything one tick consumes, gathered by the caller up front.
///
/// Synthesis never reaches back into an ambient coordinator object;
/// whatever it needs is here, explicitly.
#[derive(Debug, Clone, Default)]
pub struct ReconcileContext {
    pub cluster: ClusterState,
    pub s3: Option<S3Config>,
    pub certificates_on_disk: bool,
    pub raw_settings: BTreeMap<String, String>,
    pub alertmanager_urls: Vec<String>,
    pub external_url: String,
    pub cluster_identity: String,
    /// Kind tag of the tracing system, e.g. `tempo`.
    pub tracing_kind: String,
    /// Our own datasource uid, once the dashboard receiver assigned one.
    pub local_datasource_uid: Option<String>,
    /// The receiving dashboard's uid, negotiated out of band.
    pub receiver_grafana_uid: Option<String>,
    /// Raw app databags of the inbound datasource-exchange relations.
    pub datasource_relations: Vec<BTreeMap<String, String>>,
}

/// What a tick produced.
#[derive(Debug)]
pub struct ReconcileOutcome {
    pub status: Status,
    pub health: DeploymentHealth,
    pub engine_config_written: bool,
    pub proxy_config_written: bool,
    pub rules_synced: bool,
    /// Outbound databag per worker relation.
    pub worker_payloads: Vec<BTreeMap<String, String>>,
    /// Outbound databag for every datasource-exchange peer.
    pub datasource_payload: Option<BTreeMap<String, String>>,
    pub logs_to_traces: Option<LogsToTracesConfig>,
}

/// Runs reconciliation ticks against a fixed filesystem layout.
pub struct Reconciler {
    paths: ReconcilerPaths,
    proxy_options: ProxyOptions,
    rules_sync: Option<RulesSync>,
}

impl Reconciler {
    pub fn new(paths: ReconcilerPaths, proxy_options: ProxyOptions) -> Self {
        Self {
            paths,
            proxy_options,
            rules_sync: None,
        }
    }

    /// Enable alert-rule syncing through the given external tool.
    pub fn with_rules_sync(mut self, sync: RulesSync) -> Self {
        self.rules_sync = Some(sync);
        self
    }

    /// Execute one tick, start to finish.
    pub fn run(&self, ctx: &ReconcileContext) -> Result<ReconcileOutcome, ReconcileError> {
        // Invalid operator configuration aborts before anything is written.
        let settings = OperatorSettings::from_map(&ctx.raw_settings)?;

        let snapshot = ctx.cluster.snapshot();
        let health = DeploymentHealth::evaluate(&snapshot.counts);
        let status = Status::from_health(&health);

        // The proxy always gets a loadable document, coherent or not.
        let nginx = NginxConfig::new(self.proxy_options.clone());
        let proxy_doc = nginx.config(&snapshot.addresses_by_role, ctx.certificates_on_disk);
        let proxy_config_written = self.push(&self.paths.nginx_config, &proxy_doc);

        // Engine config and worker payloads only make sense for a
        // coherent fleet; a blocked deployment keeps its previous config.
        let (engine_config_written, worker_payloads) = if health.is_coherent {
            let builder = ConfigBuilder {
                topology: &snapshot,
                s3: ctx.s3.as_ref(),
                tls_enabled: ctx.certificates_on_disk,
                settings: &settings,
                alertmanager_urls: &ctx.alertmanager_urls,
                external_url: &ctx.external_url,
                cluster_identity: &ctx.cluster_identity,
            };
            let engine_doc = builder.render()?;
            let written = self.push(&self.paths.engine_config, &engine_doc);
            let payloads = ctx.cluster.publish_payloads(&engine_doc, None);
            (written, payloads)
        } else {
            (false, Vec::new())
        };

        let rules_synced = self.sync_rules(&ctx.external_url);

        let received = received_records(&ctx.datasource_relations);
        let logs_to_traces = correlate(&received, &ctx.tracing_kind);
        let datasource_payload = self.datasource_payload(ctx);

        info!(
            %status,
            engine_config_written,
            proxy_config_written,
            rules_synced,
            workers = worker_payloads.len(),
            "reconciliation tick complete"
        );

        Ok(ReconcileOutcome {
            status,
            health,
            engine_config_written,
            proxy_config_written,
            rules_synced,
            worker_payloads,
            datasource_payload,
            logs_to_traces,
        })
    }

    /// Hash-gated file push; failures warn and leave the old file alone.
    fn push(&self, path: &std::path::Path, contents: &str) -> bool {
        match write_if_changed(path, contents) {
            Ok(written) => written,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "config push failed");
                false
            }
        }
    }

    fn sync_rules(&self, external_url: &str) -> bool {
        let Some(sync) = &self.rules_sync else {
            return false;
        };
        if let Err(err) = consolidate_rules(&self.paths.rules_sources, &self.paths.rules_dir) {
            warn!(error = %err, "failed to consolidate alert rules");
            return false;
        }
        let hash_file = default_hash_file(&self.paths.rules_dir);
        sync_if_changed(sync, &self.paths.rules_dir, &hash_file, external_url)
    }

    fn datasource_payload(&self, ctx: &ReconcileContext) -> Option<BTreeMap<String, String>> {
        let uid = ctx.local_datasource_uid.as_deref()?;
        let grafana_uid = ctx.receiver_grafana_uid.as_deref()?;
        let record = publish_record(uid, grafana_uid);
        match publish_payload(&[record]) {
            Ok(payload) => Some(payload),
            Err(err) => {
                warn!(error = %err, "failed to encode datasource payload");
                None
            }
        }
    }
}

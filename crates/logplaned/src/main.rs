//! logplaned — the logplane coordinator daemon.
//!
//! One invocation runs one reconciliation tick: the external event
//! dispatcher (operator framework, cron, CI — whatever owns lifecycle
//! events) decides *when* to call us and guarantees at most one
//! invocation in flight per deployment.
//!
//! # Usage
//!
//! ```text
//! logplaned reconcile --state /run/logplane/state.json \
//!     --engine-config /etc/loki/loki-config.yaml \
//!     --nginx-config /etc/nginx/nginx.conf
//! logplaned status --state /run/logplane/state.json
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::info;

use logplane_cluster::{ClusterState, RelationSnapshot};
use logplane_core::{DeploymentHealth, OperatorSettings, S3Config};
use logplane_nginx::net::{DEFAULT_RESOLVER, ipv6_enabled, resolver_from_resolv_conf};
use logplane_nginx::{ProxyOptions, config as nginx};
use logplane_reconciler::{ReconcileContext, Reconciler, ReconcilerPaths, RulesSync, Status};

#[derive(Parser)]
#[command(name = "logplaned", about = "logplane coordinator daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one reconciliation tick.
    Reconcile {
        /// Cluster-state snapshot (JSON) gathered by the transport glue.
        #[arg(long)]
        state: PathBuf,

        /// Operator settings file (TOML); overrides settings in the snapshot.
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Where to write the engine configuration.
        #[arg(long, default_value = "/etc/loki/loki-config.yaml")]
        engine_config: PathBuf,

        /// Where to write the proxy configuration.
        #[arg(long, default_value = "/etc/nginx/nginx.conf")]
        nginx_config: PathBuf,

        /// Alert-rule source directory; repeat for multiple identities.
        #[arg(long = "rules-source")]
        rules_sources: Vec<PathBuf>,

        /// Consolidated alert-rules directory.
        #[arg(long, default_value = "/etc/loki/alert-rules")]
        rules_dir: PathBuf,

        /// External rules-sync tool; rules syncing is skipped if unset.
        #[arg(long)]
        rules_sync_tool: Option<PathBuf>,

        /// Server name for the TLS server block.
        #[arg(long, default_value = "localhost")]
        server_name: String,

        /// Plain listening port of the proxy.
        #[arg(long, default_value_t = nginx::NGINX_PORT)]
        nginx_port: u16,

        /// TLS listening port of the proxy.
        #[arg(long, default_value_t = nginx::NGINX_TLS_PORT)]
        tls_port: u16,
    },

    /// Evaluate and print deployment health, nothing else.
    Status {
        /// Cluster-state snapshot (JSON).
        #[arg(long)]
        state: PathBuf,
    },
}

/// On-disk form of the per-tick inputs the transport glue collects.
#[derive(Debug, Default, Deserialize)]
struct StateFile {
    #[serde(default)]
    relations: Vec<RelationSnapshot>,
    #[serde(default)]
    s3: Option<S3Config>,
    #[serde(default)]
    certificates_on_disk: bool,
    #[serde(default)]
    settings: BTreeMap<String, String>,
    #[serde(default)]
    alertmanager_urls: Vec<String>,
    #[serde(default)]
    external_url: String,
    #[serde(default)]
    cluster_identity: String,
    #[serde(default = "default_tracing_kind")]
    tracing_kind: String,
    #[serde(default)]
    local_datasource_uid: Option<String>,
    #[serde(default)]
    receiver_grafana_uid: Option<String>,
    #[serde(default)]
    datasource_relations: Vec<BTreeMap<String, String>>,
}

fn default_tracing_kind() -> String {
    "tempo".to_string()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,logplane=debug".parse().expect("static filter")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Reconcile {
            state,
            settings,
            engine_config,
            nginx_config,
            rules_sources,
            rules_dir,
            rules_sync_tool,
            server_name,
            nginx_port,
            tls_port,
        } => run_reconcile(
            &state,
            settings.as_deref(),
            ReconcilerPaths {
                engine_config,
                nginx_config,
                rules_sources,
                rules_dir,
            },
            rules_sync_tool,
            server_name,
            nginx_port,
            tls_port,
        ),
        Command::Status { state } => run_status(&state),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_reconcile(
    state_path: &Path,
    settings_path: Option<&Path>,
    paths: ReconcilerPaths,
    rules_sync_tool: Option<PathBuf>,
    server_name: String,
    nginx_port: u16,
    tls_port: u16,
) -> anyhow::Result<()> {
    let state = load_state(state_path)?;

    let raw_settings = match settings_path {
        Some(path) => OperatorSettings::from_file(path)
            .with_context(|| format!("invalid settings file {}", path.display()))?
            .to_map(),
        None => state.settings.clone(),
    };

    let resolver = resolver_from_resolv_conf(Path::new("/etc/resolv.conf"))
        .ok()
        .flatten()
        .unwrap_or_else(|| DEFAULT_RESOLVER.to_string());

    let proxy_options = ProxyOptions {
        nginx_port,
        tls_port,
        ipv6_enabled: ipv6_enabled(),
        resolver,
        server_name,
    };

    let ctx = ReconcileContext {
        cluster: ClusterState::new(state.relations),
        s3: state.s3,
        certificates_on_disk: state.certificates_on_disk,
        raw_settings,
        alertmanager_urls: state.alertmanager_urls,
        external_url: state.external_url,
        cluster_identity: state.cluster_identity,
        tracing_kind: state.tracing_kind,
        local_datasource_uid: state.local_datasource_uid,
        receiver_grafana_uid: state.receiver_grafana_uid,
        datasource_relations: state.datasource_relations,
    };

    let mut reconciler = Reconciler::new(paths, proxy_options);
    if let Some(tool) = rules_sync_tool {
        reconciler = reconciler.with_rules_sync(RulesSync::new(tool));
    }

    let outcome = reconciler.run(&ctx).context("reconciliation failed")?;

    info!(status = %outcome.status, "tick finished");
    // A blocked deployment is data, not a daemon failure: exit clean so
    // the dispatcher re-invokes on the next event.
    println!("{}", outcome.status);
    Ok(())
}

fn run_status(state_path: &Path) -> anyhow::Result<()> {
    let state = load_state(state_path)?;
    let cluster = ClusterState::new(state.relations);

    let snapshot = cluster.snapshot();
    let health = DeploymentHealth::evaluate(&snapshot.counts);
    let status = Status::from_health(&health);

    println!("{status}");
    for entry in cluster.gather_topology() {
        println!("{}\t{}\t{}", entry.unit, entry.application, entry.address);
    }
    Ok(())
}

fn load_state(path: &Path) -> anyhow::Result<StateFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read state file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("invalid state file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_file_tolerates_minimal_json() {
        let state: StateFile = serde_json::from_str("{}").unwrap();
        assert!(state.relations.is_empty());
        assert!(state.s3.is_none());
        assert_eq!(state.tracing_kind, "tempo");
    }

    #[test]
    fn state_file_parses_full_snapshot() {
        let state: StateFile = serde_json::from_str(
            r#"{
                "relations": [
                    {
                        "app_data": {"roles": "[\"all\"]"},
                        "units": [
                            {
                                "unit": "worker/0",
                                "application": "worker",
                                "data": {"address": "\"10.0.0.1\""}
                            }
                        ]
                    }
                ],
                "s3": {
                    "endpoint": "s3.example.com:9000",
                    "bucket": "logs",
                    "access_key": "ak",
                    "secret_key": "sk"
                },
                "certificates_on_disk": true,
                "settings": {"retention-period": "7"},
                "alertmanager_urls": ["http://am.example.com"],
                "external_url": "http://logs.example.com",
                "cluster_identity": "prod-logs"
            }"#,
        )
        .unwrap();

        assert_eq!(state.relations.len(), 1);
        assert!(state.certificates_on_disk);
        assert_eq!(state.settings.get("retention-period").unwrap(), "7");
    }

    #[test]
    fn load_state_reports_missing_file() {
        let err = load_state(Path::new("/no/such/state.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read state file"));
    }

    #[test]
    fn end_to_end_reconcile_from_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let state_path = dir.path().join("state.json");
        std::fs::write(
            &state_path,
            r#"{
                "relations": [
                    {
                        "app_data": {"roles": "[\"all\"]"},
                        "units": [
                            {
                                "unit": "worker/0",
                                "application": "worker",
                                "data": {"address": "\"10.0.0.1\""}
                            }
                        ]
                    }
                ],
                "external_url": "http://logs.example.com",
                "cluster_identity": "test-logs"
            }"#,
        )
        .unwrap();

        let paths = ReconcilerPaths {
            engine_config: dir.path().join("loki-config.yaml"),
            nginx_config: dir.path().join("nginx.conf"),
            rules_sources: Vec::new(),
            rules_dir: dir.path().join("rules"),
        };
        run_reconcile(
            &state_path,
            None,
            paths,
            None,
            "localhost".to_string(),
            8080,
            443,
        )
        .unwrap();

        assert!(dir.path().join("loki-config.yaml").exists());
        assert!(dir.path().join("nginx.conf").exists());
    }
}

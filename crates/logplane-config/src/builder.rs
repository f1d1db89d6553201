//! Engine config builder — all synthesis policies in one place.
//!
//! The builder borrows its inputs for one tick, applies each policy
//! (replication factor, storage branch, retention, rate limits, TLS,
//! membership, alerting), and produces the typed document. Inputs are
//! normalized before entry; nothing in here can fail except the final
//! serialization boundary.

use std::collections::BTreeSet;

use thiserror::Error;

use logplane_core::{
    DEFAULT_REPLICATION, OperatorSettings, REPLICATION_MIN_WORKERS, Role, S3Config,
    TopologySnapshot,
};

use crate::model::*;
use crate::paths;

/// Suffix appended to the deployment identity to form the gossip label,
/// so independently deployed clusters sharing a network never collide.
pub const CLUSTER_LABEL_SUFFIX: &str = "-cluster";

/// Legacy object-store key the engine expects for the s3 client in
/// delete-request bookkeeping.
const DELETE_REQUEST_STORE: &str = "aws";

/// Errors raised at the serialization boundary.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to render engine config: {0}")]
    Render(#[from] serde_yaml::Error),
}

/// One tick's inputs to engine config synthesis.
#[derive(Debug, Clone, Copy)]
pub struct ConfigBuilder<'a> {
    pub topology: &'a TopologySnapshot,
    pub s3: Option<&'a S3Config>,
    pub tls_enabled: bool,
    pub settings: &'a OperatorSettings,
    pub alertmanager_urls: &'a [String],
    pub external_url: &'a str,
    /// The deployment's unique identity; combined with
    /// [`CLUSTER_LABEL_SUFFIX`] to form the gossip cluster label.
    pub cluster_identity: &'a str,
}

impl ConfigBuilder<'_> {
    /// Assemble the complete configuration document.
    pub fn build(&self) -> EngineConfig {
        EngineConfig {
            analytics: Analytics {
                reporting_enabled: self.settings.reporting_enabled,
            },
            auth_enabled: false,
            chunk_store_config: chunk_store(),
            common: self.common(),
            compactor: self.compactor(),
            frontend: frontend(),
            ingester: ingester(),
            limits_config: self.limits(),
            memberlist: self.memberlist(),
            querier: QuerierConfig { max_concurrent: 20 },
            query_range: query_range(),
            ruler: self.ruler(),
            schema_config: self.schema(),
            server: self.server(),
            storage_config: self.storage(),
        }
    }

    /// Render the document to YAML.
    pub fn render(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(&self.build())?)
    }

    /// Replication is disabled (factor 1) until enough backend workers
    /// exist for it to be meaningful.
    fn replication_factor(&self) -> u64 {
        if self.topology.role_scale(Role::Backend) < REPLICATION_MIN_WORKERS {
            1
        } else {
            DEFAULT_REPLICATION
        }
    }

    fn common(&self) -> CommonConfig {
        let storage = match self.s3 {
            Some(s3) => CommonStorage::S3(S3Storage::from(s3)),
            None => CommonStorage::Filesystem(FilesystemDirs {
                chunks_directory: paths::CHUNKS_DIR.to_string(),
                rules_directory: paths::RULES_DIR.to_string(),
            }),
        };

        CommonConfig {
            compactor_grpc_address: self.external_url.to_string(),
            path_prefix: paths::LOKI_DIR.to_string(),
            replication_factor: self.replication_factor(),
            storage,
        }
    }

    fn compactor(&self) -> CompactorConfig {
        let retention_enabled = self.settings.retention_enabled();
        // Deletion bookkeeping needs durable storage; without an object
        // store the directive is omitted, not pointed at the filesystem.
        let delete_request_store = (retention_enabled && self.s3.is_some())
            .then(|| DELETE_REQUEST_STORE.to_string());

        CompactorConfig {
            delete_request_store,
            retention_enabled,
            working_directory: paths::COMPACTOR_DIR.to_string(),
        }
    }

    fn limits(&self) -> LimitsConfig {
        let rate = self.settings.ingestion_rate_mb;
        let burst = self.settings.ingestion_burst_size_mb;
        LimitsConfig {
            ingestion_burst_size_mb: burst as f64,
            ingestion_rate_mb: rate as f64,
            // Per-stream limits intentionally mirror the per-tenant
            // limits: this deployment targets one stream per tenant.
            per_stream_rate_limit: format!("{rate}MB"),
            per_stream_rate_limit_burst: format!("{burst}MB"),
            retention_period: format!("{}d", self.settings.retention_period),
            split_queries_by_interval: "0".to_string(),
        }
    }

    fn memberlist(&self) -> MemberlistConfig {
        let members: BTreeSet<String> = self.topology.all_addresses();
        MemberlistConfig {
            cluster_label: format!("{}{CLUSTER_LABEL_SUFFIX}", self.cluster_identity),
            join_members: members.into_iter().collect(),
        }
    }

    fn ruler(&self) -> RulerConfig {
        let mut urls: Vec<&str> = self.alertmanager_urls.iter().map(String::as_str).collect();
        urls.sort_unstable();
        RulerConfig {
            alertmanager_url: urls.join(","),
            external_url: self.external_url.to_string(),
        }
    }

    fn schema(&self) -> SchemaConfig {
        let object_store = if self.s3.is_some() { "s3" } else { "filesystem" };
        SchemaConfig {
            configs: vec![SchemaPeriod {
                from: "2024-08-06".to_string(),
                index: IndexConfig {
                    period: "24h".to_string(),
                    prefix: "index_".to_string(),
                },
                object_store: object_store.to_string(),
                schema: "v13".to_string(),
                store: "tsdb".to_string(),
            }],
        }
    }

    fn storage(&self) -> StorageConfig {
        let (aws, filesystem) = match self.s3 {
            Some(s3) => (Some(S3Storage::from(s3)), None),
            None => (
                None,
                Some(FilesystemStorage {
                    directory: paths::CHUNKS_DIR.to_string(),
                }),
            ),
        };

        StorageConfig {
            aws,
            filesystem,
            tsdb_shipper: TsdbShipper {
                active_index_directory: paths::INDEX_DIR.to_string(),
                cache_location: paths::INDEX_CACHE_DIR.to_string(),
            },
        }
    }

    fn server(&self) -> ServerConfig {
        ServerConfig {
            http_listen_address: "0.0.0.0".to_string(),
            http_listen_port: paths::HTTP_LISTEN_PORT,
            http_tls_config: self.tls_enabled.then(|| TlsServerConfig {
                cert_file: paths::CERT_FILE.to_string(),
                key_file: paths::KEY_FILE.to_string(),
            }),
        }
    }
}

fn chunk_store() -> ChunkStoreConfig {
    ChunkStoreConfig {
        chunk_cache_config: ChunkCacheConfig {
            embedded_cache: EmbeddedCache { enabled: true },
        },
    }
}

fn frontend() -> FrontendConfig {
    FrontendConfig {
        compress_responses: true,
        // Default is 2048; the reference hardware ingests ~3x more, so 4x.
        max_outstanding_per_tenant: 8192,
    }
}

fn ingester() -> IngesterConfig {
    IngesterConfig {
        wal: WalConfig {
            dir: paths::WAL_DIR.to_string(),
            enabled: true,
            flush_on_shutdown: true,
        },
    }
}

fn query_range() -> QueryRangeConfig {
    QueryRangeConfig {
        parallelise_shardable_queries: false,
        results_cache: ResultsCache {
            cache: chunk_store().chunk_cache_config,
        },
    }
}

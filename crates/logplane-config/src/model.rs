//! Typed engine configuration tree.
//!
//! Mirrors the engine's own configuration schema, reduced to the fields
//! this coordinator manages. Field order is alphabetical so the rendered
//! document is stable across releases. Optional sections carry
//! `skip_serializing_if` so an absent section is truly absent.

use serde::{Deserialize, Serialize};

use logplane_core::S3Config;

/// The complete synthesized configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub analytics: Analytics,
    pub auth_enabled: bool,
    pub chunk_store_config: ChunkStoreConfig,
    pub common: CommonConfig,
    pub compactor: CompactorConfig,
    pub frontend: FrontendConfig,
    pub ingester: IngesterConfig,
    pub limits_config: LimitsConfig,
    pub memberlist: MemberlistConfig,
    pub querier: QuerierConfig,
    pub query_range: QueryRangeConfig,
    pub ruler: RulerConfig,
    pub schema_config: SchemaConfig,
    pub server: ServerConfig,
    pub storage_config: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analytics {
    pub reporting_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkStoreConfig {
    pub chunk_cache_config: ChunkCacheConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkCacheConfig {
    pub embedded_cache: EmbeddedCache,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedCache {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonConfig {
    pub compactor_grpc_address: String,
    pub path_prefix: String,
    pub replication_factor: u64,
    pub storage: CommonStorage,
}

/// Two-way storage branch: object storage or local filesystem, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommonStorage {
    #[serde(rename = "s3")]
    S3(S3Storage),
    #[serde(rename = "filesystem")]
    Filesystem(FilesystemDirs),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemDirs {
    pub chunks_directory: String,
    pub rules_directory: String,
}

/// Object-storage client settings in the engine's wire schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Storage {
    pub access_key_id: String,
    pub bucketnames: String,
    pub endpoint: String,
    pub http_config: S3HttpConfig,
    pub insecure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub s3forcepathstyle: bool,
    pub secret_access_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3HttpConfig {
    pub idle_conn_timeout: String,
    pub insecure_skip_verify: bool,
    pub response_header_timeout: String,
}

impl From<&S3Config> for S3Storage {
    fn from(s3: &S3Config) -> Self {
        Self {
            access_key_id: s3.access_key.clone(),
            bucketnames: s3.bucket.clone(),
            endpoint: s3.endpoint.clone(),
            http_config: S3HttpConfig {
                idle_conn_timeout: "90s".to_string(),
                insecure_skip_verify: false,
                response_header_timeout: "0s".to_string(),
            },
            insecure: s3.insecure,
            region: s3.region.clone(),
            s3forcepathstyle: true,
            secret_access_key: s3.secret_key.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_request_store: Option<String>,
    pub retention_enabled: bool,
    pub working_directory: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendConfig {
    pub compress_responses: bool,
    pub max_outstanding_per_tenant: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngesterConfig {
    pub wal: WalConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalConfig {
    pub dir: String,
    pub enabled: bool,
    pub flush_on_shutdown: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub ingestion_burst_size_mb: f64,
    pub ingestion_rate_mb: f64,
    pub per_stream_rate_limit: String,
    pub per_stream_rate_limit_burst: String,
    pub retention_period: String,
    pub split_queries_by_interval: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberlistConfig {
    pub cluster_label: String,
    pub join_members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerierConfig {
    pub max_concurrent: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRangeConfig {
    pub parallelise_shardable_queries: bool,
    pub results_cache: ResultsCache,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsCache {
    pub cache: ChunkCacheConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulerConfig {
    pub alertmanager_url: String,
    pub external_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub configs: Vec<SchemaPeriod>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaPeriod {
    pub from: String,
    pub index: IndexConfig,
    pub object_store: String,
    pub schema: String,
    pub store: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub period: String,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub http_listen_address: String,
    pub http_listen_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_tls_config: Option<TlsServerConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsServerConfig {
    pub cert_file: String,
    pub key_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws: Option<S3Storage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FilesystemStorage>,
    pub tsdb_shipper: TsdbShipper,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemStorage {
    pub directory: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TsdbShipper {
    pub active_index_directory: String,
    pub cache_location: String,
}

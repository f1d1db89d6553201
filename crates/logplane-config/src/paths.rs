//! Fixed filesystem layout on the worker workload.

/// Engine data root.
pub const LOKI_DIR: &str = "/loki";
/// Chunk storage when running on local filesystem.
pub const CHUNKS_DIR: &str = "/loki/chunks";
/// Rule storage when running on local filesystem.
pub const RULES_DIR: &str = "/loki/rules";
/// Compactor working directory.
pub const COMPACTOR_DIR: &str = "/loki/compactor";
/// Ingester write-ahead log.
pub const WAL_DIR: &str = "/loki/chunks/wal";
/// Active tsdb index shards.
pub const INDEX_DIR: &str = "/loki/index";
/// tsdb index cache.
pub const INDEX_CACHE_DIR: &str = "/loki/index_cache";

/// HTTP port every worker listens on.
pub const HTTP_LISTEN_PORT: u16 = 3100;

/// Server certificate path on the worker, present when TLS is active.
pub const CERT_FILE: &str = "/etc/worker/server.cert";
/// Server key path on the worker, present when TLS is active.
pub const KEY_FILE: &str = "/etc/worker/private.key";

//! Host network probes.
//!
//! Worker pod IPs are ephemeral, so the proxy must resolve upstreams
//! through the platform's own DNS rather than its default resolver
//! cache; we read that resolver straight from the host's resolv.conf.

use std::io;
use std::path::Path;

/// Fallback resolver when the host resolv.conf yields nothing.
pub const DEFAULT_RESOLVER: &str = "kube-dns.kube-system.svc.cluster.local.";

/// Whether the host network stack has IPv6 enabled.
pub fn ipv6_enabled() -> bool {
    Path::new("/proc/net/if_inet6").exists()
}

/// The first nameserver listed in the given resolv.conf, if any.
pub fn resolver_from_resolv_conf(path: &Path) -> io::Result<Option<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter_map(|line| line.strip_prefix("nameserver"))
        .map(|rest| rest.trim().to_string())
        .find(|address| !address.is_empty()))
}

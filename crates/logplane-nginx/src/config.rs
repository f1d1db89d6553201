//! Proxy config synthesis — upstreams, locations, server blocks.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use logplane_core::Role;

use crate::directive::Directive;
use crate::net::DEFAULT_RESOLVER;

/// HTTP port every worker listens on.
pub const WORKER_HTTP_PORT: u16 = 3100;
/// Plain listening port of the proxy.
pub const NGINX_PORT: u16 = 8080;
/// TLS listening port of the proxy.
pub const NGINX_TLS_PORT: u16 = 443;

/// Certificate path inside the proxy workload.
pub const CERT_PATH: &str = "/etc/nginx/certs/server.cert";
/// Key path inside the proxy workload.
pub const KEY_PATH: &str = "/etc/nginx/certs/server.key";

/// Pool name for the role-agnostic upstream spanning the whole fleet.
const WORKER_POOL: &str = "worker";

/// Host- and deployment-level knobs for proxy synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyOptions {
    pub nginx_port: u16,
    pub tls_port: u16,
    pub ipv6_enabled: bool,
    pub resolver: String,
    pub server_name: String,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self {
            nginx_port: NGINX_PORT,
            tls_port: NGINX_TLS_PORT,
            ipv6_enabled: false,
            resolver: DEFAULT_RESOLVER.to_string(),
            server_name: "localhost".to_string(),
        }
    }
}

/// Builds the proxy configuration from the per-tick topology.
pub struct NginxConfig {
    options: ProxyOptions,
}

impl NginxConfig {
    pub fn new(options: ProxyOptions) -> Self {
        Self { options }
    }

    /// Render the full configuration document.
    pub fn config(
        &self,
        addresses_by_role: &BTreeMap<Role, BTreeSet<String>>,
        tls: bool,
    ) -> String {
        Directive::render_all(&self.build(addresses_by_role, tls))
    }

    /// Assemble the full directive tree.
    pub fn build(
        &self,
        addresses_by_role: &BTreeMap<Role, BTreeSet<String>>,
        tls: bool,
    ) -> Vec<Directive> {
        let pools = present_pools(addresses_by_role);
        debug!(pools = pools.len(), tls, "assembling proxy config");

        let mut http_children = self.upstreams(&pools);
        http_children.extend([
            Directive::simple("client_body_temp_path", &["/tmp/client_temp"]),
            Directive::simple("proxy_temp_path", &["/tmp/proxy_temp_path"]),
            Directive::simple("fastcgi_temp_path", &["/tmp/fastcgi_temp"]),
            Directive::simple("uwsgi_temp_path", &["/tmp/uwsgi_temp"]),
            Directive::simple("scgi_temp_path", &["/tmp/scgi_temp"]),
            Directive::simple("default_type", &["application/octet-stream"]),
            Directive::simple(
                "log_format",
                &[
                    "main",
                    "'$remote_addr - $remote_user [$time_local]  $status \"$request\" $body_bytes_sent \"$http_referer\" \"$http_user_agent\" \"$http_x_forwarded_for\"'",
                ],
            ),
        ]);
        http_children.extend(log_errors_only());
        http_children.extend([
            Directive::simple("sendfile", &["on"]),
            Directive::simple("tcp_nopush", &["on"]),
            self.resolver(),
            // Default the multitenancy header so the engine always sees one.
            Directive::block(
                "map",
                &["$http_x_scope_orgid", "$ensured_x_scope_orgid"],
                vec![
                    Directive::simple("default", &["$http_x_scope_orgid"]),
                    Directive::simple("\"\"", &["anonymous"]),
                ],
            ),
            Directive::simple("proxy_read_timeout", &["300"]),
            self.server(&pools, tls),
        ]);

        vec![
            Directive::simple("worker_processes", &["5"]),
            Directive::simple("error_log", &["/dev/stderr", "error"]),
            Directive::simple("pid", &["/tmp/nginx.pid"]),
            Directive::simple("worker_rlimit_nofile", &["8192"]),
            Directive::block(
                "events",
                &[],
                vec![Directive::simple("worker_connections", &["4096"])],
            ),
            Directive::block("http", &[], http_children),
        ]
    }

    /// One pool per present role, plus the `worker` union pool.
    fn upstreams(&self, pools: &BTreeMap<String, BTreeSet<String>>) -> Vec<Directive> {
        let mut upstreams = Vec::new();
        let mut all_addresses = BTreeSet::new();

        for (pool, addresses) in pools {
            all_addresses.extend(addresses.iter().cloned());
            upstreams.push(Directive::Block {
                name: "upstream".to_string(),
                args: vec![pool.clone()],
                children: addresses.iter().map(|addr| server_entry(addr)).collect(),
            });
        }

        if !upstreams.is_empty() {
            upstreams.push(Directive::Block {
                name: "upstream".to_string(),
                args: vec![WORKER_POOL.to_string()],
                children: all_addresses.iter().map(|addr| server_entry(addr)).collect(),
            });
        }

        upstreams
    }

    /// Role-gated location rules, fixed precedence.
    ///
    /// A role with no addresses contributes no locations at all: a rule
    /// referencing an empty pool is a hard startup error for the proxy.
    fn locations(&self, pools: &BTreeMap<String, BTreeSet<String>>) -> Vec<Directive> {
        let mut locations = vec![
            Directive::block(
                "location",
                &["=", "/"],
                vec![
                    Directive::simple("return", &["200", "'OK'"]),
                    Directive::simple("auth_basic", &["off"]),
                ],
            ),
            // Scraped by the metrics exporter sidecar.
            Directive::block(
                "location",
                &["=", "/status"],
                vec![Directive::simple("stub_status", &[])],
            ),
        ];

        if pools.contains_key(Role::Write.as_str()) {
            locations.push(Directive::block(
                "location",
                &["=", "/loki/api/v1/push"],
                vec![Directive::simple("proxy_pass", &["http://write"])],
            ));
        }

        if pools.contains_key(Role::Backend.as_str()) {
            locations.extend([
                Directive::block(
                    "location",
                    &["=", "/loki/api/v1/rules"],
                    vec![Directive::simple("proxy_pass", &["http://backend"])],
                ),
                Directive::block(
                    "location",
                    &["=", "/prometheus"],
                    vec![Directive::simple("proxy_pass", &["http://backend"])],
                ),
                Directive::block(
                    "location",
                    &["=", "/api/v1/rules"],
                    vec![Directive::simple(
                        "proxy_pass",
                        &["http://backend/loki/api/v1/rules"],
                    )],
                ),
            ]);
        }

        if pools.contains_key(Role::Read.as_str()) {
            locations.extend([
                // Tail streaming is exact-matched ahead of the general
                // read prefix rule.
                Directive::block(
                    "location",
                    &["=", "/loki/api/v1/tail"],
                    vec![Directive::simple("proxy_pass", &["http://read"])],
                ),
                Directive::block(
                    "location",
                    &["~", "/loki/api/.*"],
                    vec![
                        Directive::simple("proxy_pass", &["http://read"]),
                        Directive::simple("proxy_set_header", &["Upgrade", "$http_upgrade"]),
                        Directive::simple("proxy_set_header", &["Connection", "\"upgrade\""]),
                    ],
                ),
            ]);
        }

        if !pools.is_empty() {
            locations.extend([
                Directive::block(
                    "location",
                    &["=", "/loki/api/v1/format_query"],
                    vec![Directive::simple("proxy_pass", &["http://worker"])],
                ),
                Directive::block(
                    "location",
                    &["=", "/loki/api/v1/status/buildinfo"],
                    vec![Directive::simple("proxy_pass", &["http://worker"])],
                ),
                Directive::block(
                    "location",
                    &["=", "/ring"],
                    vec![Directive::simple("proxy_pass", &["http://worker"])],
                ),
            ]);
        }

        locations
    }

    fn server(&self, pools: &BTreeMap<String, BTreeSet<String>>, tls: bool) -> Directive {
        let mut children = Vec::new();

        if tls {
            children.extend(self.listen(self.options.tls_port, true));
            children.extend([
                Directive::simple(
                    "proxy_set_header",
                    &["X-Scope-OrgID", "$ensured_x_scope_orgid"],
                ),
                Directive::simple("server_name", &[&self.options.server_name]),
                Directive::simple("ssl_certificate", &[CERT_PATH]),
                Directive::simple("ssl_certificate_key", &[KEY_PATH]),
                Directive::simple("ssl_protocols", &["TLSv1", "TLSv1.1", "TLSv1.2"]),
                Directive::simple("ssl_ciphers", &["HIGH:!aNULL:!MD5"]),
            ]);
        } else {
            children.extend(self.listen(self.options.nginx_port, false));
            children.push(Directive::simple(
                "proxy_set_header",
                &["X-Scope-OrgID", "$ensured_x_scope_orgid"],
            ));
        }

        // Worker IPs are ephemeral; re-resolve through the platform DNS
        // so a recycled IP never keeps receiving traffic.
        children.push(self.resolver());
        children.extend(self.locations(pools));

        Directive::Block {
            name: "server".to_string(),
            args: vec![],
            children,
        }
    }

    fn listen(&self, port: u16, ssl: bool) -> Vec<Directive> {
        let mut directives = vec![Directive::Simple {
            name: "listen".to_string(),
            args: listen_args(&port.to_string(), ssl),
        }];
        if self.options.ipv6_enabled {
            directives.push(Directive::Simple {
                name: "listen".to_string(),
                args: listen_args(&format!("[::]:{port}"), ssl),
            });
        }
        directives
    }

    fn resolver(&self) -> Directive {
        Directive::simple("resolver", &[&self.options.resolver])
    }
}

fn listen_args(address: &str, ssl: bool) -> Vec<String> {
    let mut args = vec![address.to_string()];
    if ssl {
        args.push("ssl".to_string());
    }
    args
}

fn server_entry(address: &str) -> Directive {
    Directive::Simple {
        name: "server".to_string(),
        args: vec![format!("{address}:{WORKER_HTTP_PORT}")],
    }
}

/// Status-filtered access log: 2xx/3xx suppressed, the rest logged.
fn log_errors_only() -> Vec<Directive> {
    vec![
        Directive::block(
            "map",
            &["$status", "$loggable"],
            vec![
                Directive::simple("~^[23]", &["0"]),
                Directive::simple("default", &["1"]),
            ],
        ),
        Directive::simple("access_log", &["/dev/stderr"]),
    ]
}

/// Pool name → address set, keeping only roles that actually have
/// addresses this tick.
fn present_pools(
    addresses_by_role: &BTreeMap<Role, BTreeSet<String>>,
) -> BTreeMap<String, BTreeSet<String>> {
    addresses_by_role
        .iter()
        .filter(|(_, addresses)| !addresses.is_empty())
        .map(|(role, addresses)| (role.as_str().to_string(), addresses.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addresses(addrs: &[&str]) -> BTreeSet<String> {
        addrs.iter().map(|a| a.to_string()).collect()
    }

    fn read_only_topology() -> BTreeMap<Role, BTreeSet<String>> {
        BTreeMap::from([(Role::Read, addresses(&["10.0.0.1"]))])
    }

    fn full_topology() -> BTreeMap<Role, BTreeSet<String>> {
        BTreeMap::from([
            (Role::Read, addresses(&["10.0.0.1"])),
            (Role::Write, addresses(&["10.0.0.2"])),
            (Role::Backend, addresses(&["10.0.0.3"])),
        ])
    }

    #[test]
    fn worker_pool_is_union_of_role_pools() {
        let config = NginxConfig::new(ProxyOptions::default());
        let rendered = config.config(&full_topology(), false);

        let worker_block = rendered
            .split("upstream worker {")
            .nth(1)
            .and_then(|rest| rest.split('}').next())
            .unwrap();
        for addr in ["10.0.0.1:3100", "10.0.0.2:3100", "10.0.0.3:3100"] {
            assert!(worker_block.contains(addr), "missing {addr}");
        }
    }

    #[test]
    fn single_role_worker_pool_matches_that_role() {
        let config = NginxConfig::new(ProxyOptions::default());
        let rendered = config.config(&read_only_topology(), false);

        assert!(rendered.contains("upstream read {"));
        let worker_block = rendered
            .split("upstream worker {")
            .nth(1)
            .and_then(|rest| rest.split('}').next())
            .unwrap();
        assert!(worker_block.contains("10.0.0.1:3100"));
        assert_eq!(worker_block.matches("server ").count(), 1);
    }

    #[test]
    fn roles_without_addresses_get_no_locations() {
        let config = NginxConfig::new(ProxyOptions::default());
        let rendered = config.config(&read_only_topology(), false);

        assert!(!rendered.contains("/loki/api/v1/push"));
        assert!(!rendered.contains("http://write"));
        assert!(!rendered.contains("http://backend"));
        // Read and worker locations still present.
        assert!(rendered.contains("location = /loki/api/v1/tail"));
        assert!(rendered.contains("location = /ring"));
    }

    #[test]
    fn empty_topology_still_renders_a_server_block() {
        let config = NginxConfig::new(ProxyOptions::default());
        let rendered = config.config(&BTreeMap::new(), false);

        assert!(!rendered.contains("upstream"));
        assert!(rendered.contains("server {"));
        assert!(rendered.contains("location = / {"));
        assert!(rendered.contains("location = /status {"));
        assert!(!rendered.contains("proxy_pass"));
    }

    #[test]
    fn empty_address_set_is_treated_as_absent() {
        let topology = BTreeMap::from([
            (Role::Read, addresses(&["10.0.0.1"])),
            (Role::Write, BTreeSet::new()),
        ]);
        let config = NginxConfig::new(ProxyOptions::default());
        let rendered = config.config(&topology, false);

        assert!(!rendered.contains("upstream write"));
        assert!(!rendered.contains("/loki/api/v1/push"));
    }

    #[test]
    fn tail_location_precedes_general_read_location() {
        let config = NginxConfig::new(ProxyOptions::default());
        let rendered = config.config(&read_only_topology(), false);

        let tail = rendered.find("location = /loki/api/v1/tail").unwrap();
        let general = rendered.find("location ~ /loki/api/.*").unwrap();
        assert!(tail < general);
    }

    #[test]
    fn streaming_headers_propagated_on_read_path() {
        let config = NginxConfig::new(ProxyOptions::default());
        let rendered = config.config(&read_only_topology(), false);

        assert!(rendered.contains("proxy_set_header Upgrade $http_upgrade;"));
        assert!(rendered.contains("proxy_set_header Connection \"upgrade\";"));
    }

    #[test]
    fn ipv6_doubles_every_listen_directive() {
        let options = ProxyOptions {
            ipv6_enabled: true,
            ..ProxyOptions::default()
        };
        let config = NginxConfig::new(options);

        let plain = config.config(&full_topology(), false);
        assert!(plain.contains("listen 8080;"));
        assert!(plain.contains("listen [::]:8080;"));

        let tls = config.config(&full_topology(), true);
        assert!(tls.contains("listen 443 ssl;"));
        assert!(tls.contains("listen [::]:443 ssl;"));
    }

    #[test]
    fn without_ipv6_only_ipv4_listen() {
        let config = NginxConfig::new(ProxyOptions::default());
        let rendered = config.config(&full_topology(), false);

        assert!(rendered.contains("listen 8080;"));
        assert!(!rendered.contains("[::]"));
    }

    #[test]
    fn tls_server_block_is_hardened() {
        let options = ProxyOptions {
            server_name: "logs.example.com".to_string(),
            ..ProxyOptions::default()
        };
        let config = NginxConfig::new(options);
        let rendered = config.config(&full_topology(), true);

        assert!(rendered.contains("server_name logs.example.com;"));
        assert!(rendered.contains("ssl_certificate /etc/nginx/certs/server.cert;"));
        assert!(rendered.contains("ssl_certificate_key /etc/nginx/certs/server.key;"));
        assert!(rendered.contains("ssl_protocols TLSv1 TLSv1.1 TLSv1.2;"));
        assert!(rendered.contains("ssl_ciphers HIGH:!aNULL:!MD5;"));
    }

    #[test]
    fn tenant_header_defaults_to_anonymous() {
        let config = NginxConfig::new(ProxyOptions::default());
        let rendered = config.config(&full_topology(), false);

        assert!(rendered.contains("map $http_x_scope_orgid $ensured_x_scope_orgid {"));
        assert!(rendered.contains("\"\" anonymous;"));
        assert!(rendered.contains("proxy_set_header X-Scope-OrgID $ensured_x_scope_orgid;"));
    }

    #[test]
    fn custom_resolver_appears_in_http_and_server_blocks() {
        let options = ProxyOptions {
            resolver: "10.152.183.10".to_string(),
            ..ProxyOptions::default()
        };
        let config = NginxConfig::new(options);
        let rendered = config.config(&full_topology(), false);

        assert_eq!(rendered.matches("resolver 10.152.183.10;").count(), 2);
    }

    #[test]
    fn braces_balance() {
        let config = NginxConfig::new(ProxyOptions::default());
        for tls in [false, true] {
            let rendered = config.config(&full_topology(), tls);
            assert_eq!(
                rendered.matches('{').count(),
                rendered.matches('}').count()
            );
        }
    }
}

//! logplane-nginx — reverse-proxy configuration for the worker fleet.
//!
//! Builds the complete nginx document from the per-tick topology:
//! one upstream pool per role plus a synthetic `worker` pool spanning
//! the whole fleet, role-gated location rules, and plain/TLS server
//! blocks with optional IPv6 dual listening.
//!
//! The synthesizer never fails to produce a loadable document: with no
//! workers at all it still emits a minimal health/status server block,
//! because the proxy process needs *a* config file to start.

pub mod config;
pub mod directive;
pub mod net;

pub use config::{NginxConfig, ProxyOptions};
pub use directive::Directive;

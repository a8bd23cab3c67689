//! Node-wide tunables, gathering each component's own `Config` under one
//! roof with the defaults from the core configuration table.

use std::time::Duration;

/// Aggregates every component's configuration. Each field defaults to the
/// same values a standalone component would pick on its own.
#[derive(Debug, Clone)]
pub struct Config {
    pub local_eid: bp7::Eid,
    pub store: bp7_store::Config,
    /// Bundles larger than this (encoded, in bytes) are split before being
    /// handed to routing. The core table names the link MTU as the
    /// intended default; callers should set this from their transport's
    /// actual MTU rather than relying on this placeholder.
    pub max_fragment_size: usize,
    pub routing_interval: Duration,
    pub cleanup_interval: Duration,
    pub tcp: bp7_cla::tcp::Config,
    pub udp: bp7_cla::udp::Config,
}

impl Config {
    pub fn new(local_eid: bp7::Eid) -> Self {
        Self {
            local_eid,
            store: bp7_store::Config::default(),
            max_fragment_size: 1500,
            routing_interval: Duration::from_secs(10),
            cleanup_interval: Duration::from_secs(60),
            tcp: bp7_cla::tcp::Config::default(),
            udp: bp7_cla::udp::Config::default(),
        }
    }
}

//! Shared fixtures for the kubespawn-render integration tests.

#![allow(dead_code)]

use kubespawn_render::{ParameterSet, RenderEngine};
use tracing_subscriber::EnvFilter;

/// Route engine logs to the test harness; `RUST_LOG=debug` shows every render.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn engine() -> RenderEngine {
    init_tracing();
    RenderEngine::builtin().expect("built-in templates load")
}

/// Smallest parameter set that renders every docker artifact.
pub fn minimal_docker() -> ParameterSet {
    ParameterSet::docker("v1.10.0")
}

/// Smallest parameter set that renders every rkt artifact.
pub fn minimal_rkt() -> ParameterSet {
    ParameterSet::rkt("v1.10.0", "/run/rktlet.sock").with_cni_plugin("ptp")
}

/// rkt node with a pod subnet and no kube-proxy cluster CIDR.
pub fn documented_rkt_node() -> ParameterSet {
    minimal_rkt().with_pod_network_cidr("10.32.0.0/12")
}

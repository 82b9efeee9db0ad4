//! Metrics collection.
//!
//! # Responsibilities
//! - Define node metrics (lifecycle, peers, RPC traffic, store rebuilds)
//! - Keep recording cheap and recorder-agnostic
//!
//! # Metrics
//! - `node_lifecycle_state` (gauge): 0=configuring .. 4=stopped
//! - `node_p2p_connections_total` (counter): accepted/opened peer sessions by direction
//! - `node_p2p_active_peers` (gauge): live peer sessions
//! - `node_rpc_requests_total` (counter): RPC requests by service, path, status
//! - `node_store_rebuilds_total` (counter): destructive schema rebuilds
//!
//! # Design Decisions
//! - No exporter is installed here; without a recorder every call is a no-op
//! - Labels stay low-cardinality (no peer addresses)

use metrics::{counter, gauge};

use crate::lifecycle::LifecycleState;

pub fn record_lifecycle_state(state: LifecycleState) {
    gauge!("node_lifecycle_state").set(f64::from(state as u8));
}

pub fn record_peer_connected(direction: &'static str) {
    counter!("node_p2p_connections_total", "direction" => direction).increment(1);
}

pub fn record_active_peers(count: usize) {
    gauge!("node_p2p_active_peers").set(count as f64);
}

pub fn record_rpc_request(service: &'static str, path: &str, status: u16) {
    counter!(
        "node_rpc_requests_total",
        "service" => service,
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_store_rebuild() {
    counter!("node_store_rebuilds_total").increment(1);
}

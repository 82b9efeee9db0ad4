//! Daemon RPC handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::config::schema::DaemonConfig;
use crate::engine::ChainEngine;
use crate::net::ProtocolHandler;
use crate::rpc::with_common_layers;

#[derive(Clone)]
pub struct DaemonRpcState {
    pub engine: Arc<ChainEngine>,
    pub protocol: Arc<ProtocolHandler>,
    pub fee_address: String,
    pub fee_amount: u64,
    pub block_explorer: bool,
    pub started: Instant,
}

impl DaemonRpcState {
    pub fn new(config: &DaemonConfig, engine: Arc<ChainEngine>, protocol: Arc<ProtocolHandler>) -> Self {
        Self {
            engine,
            protocol,
            fee_address: config.fee_address.clone(),
            fee_amount: config.fee_amount,
            block_explorer: config.enable_block_explorer,
            started: Instant::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NodeInfo {
    pub version: &'static str,
    pub status: &'static str,
    pub height: u64,
    pub checkpoints: usize,
    pub top_checkpoint: Option<u64>,
    pub incoming_connections: usize,
    pub outgoing_connections: usize,
    pub p2p_port: Option<u16>,
    pub block_explorer: bool,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct HeightResponse {
    pub height: u64,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PeerInfo {
    pub address: String,
    pub direction: &'static str,
    pub connected_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct PeersResponse {
    pub peers: Vec<PeerInfo>,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct FeeResponse {
    pub address: String,
    pub amount: u64,
    pub status: &'static str,
}

pub fn router(state: DaemonRpcState, cors: &[String]) -> Router {
    let router = Router::new()
        .route("/info", get(get_info))
        .route("/height", get(get_height))
        .route("/peers", get(get_peers))
        .route("/fee", get(get_fee))
        .with_state(state);
    with_common_layers("daemon", router, cors)
}

pub async fn get_info(State(state): State<DaemonRpcState>) -> Json<NodeInfo> {
    use crate::net::connection::Direction;

    let sessions = state.protocol.connections().sessions();
    let incoming = sessions
        .iter()
        .filter(|s| s.direction == Direction::Inbound)
        .count();

    Json(NodeInfo {
        version: env!("CARGO_PKG_VERSION"),
        status: "OK",
        height: state.engine.height(),
        checkpoints: state.engine.checkpoints().len(),
        top_checkpoint: state.engine.checkpoints().top_height(),
        incoming_connections: incoming,
        outgoing_connections: sessions.len() - incoming,
        p2p_port: state.protocol.endpoint().and_then(|e| e.advertised_port),
        block_explorer: state.block_explorer,
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

pub async fn get_height(State(state): State<DaemonRpcState>) -> Json<HeightResponse> {
    Json(HeightResponse {
        height: state.engine.height(),
        status: "OK",
    })
}

pub async fn get_peers(State(state): State<DaemonRpcState>) -> Json<PeersResponse> {
    Json(PeersResponse {
        peers: state
            .protocol
            .connections()
            .sessions()
            .into_iter()
            .map(|s| PeerInfo {
                address: s.addr.to_string(),
                direction: s.direction.as_str(),
                connected_secs: s.connected_secs(),
            })
            .collect(),
        status: "OK",
    })
}

pub async fn get_fee(State(state): State<DaemonRpcState>) -> Json<FeeResponse> {
    Json(FeeResponse {
        address: state.fee_address.clone(),
        amount: state.fee_amount,
        status: "OK",
    })
}

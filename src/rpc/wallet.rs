//! Wallet-service RPC handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, middleware, routing::get, Json, Router};
use serde::Serialize;

use crate::config::schema::WalletServiceConfig;
use crate::rpc::{auth::require_credential, with_common_layers};
use crate::security::RpcCredential;

#[derive(Clone)]
pub struct WalletRpcState {
    pub container_file: PathBuf,
    pub daemon: String,
    pub started: Instant,
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub container_file: String,
    pub daemon: String,
    pub uptime_secs: u64,
}

pub fn router(config: &WalletServiceConfig, credential: Arc<RpcCredential>) -> Router {
    let state = WalletRpcState {
        container_file: config.container_file.clone(),
        daemon: format!("{}:{}", config.daemon_address, config.daemon_port),
        started: Instant::now(),
    };

    let router = Router::new()
        .route("/status", get(get_status))
        .route_layer(middleware::from_fn_with_state(credential, require_credential))
        .with_state(state);

    let cors: Vec<String> = if config.enable_cors.is_empty() {
        Vec::new()
    } else {
        vec![config.enable_cors.clone()]
    };
    with_common_layers("wallet", router, &cors)
}

pub async fn get_status(State(state): State<WalletRpcState>) -> Json<ServiceStatus> {
    Json(ServiceStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "OK",
        container_file: state.container_file.display().to_string(),
        daemon: state.daemon,
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

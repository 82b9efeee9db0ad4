//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::path::Path;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use node_launcher::config::schema::WalletServiceConfig;
use node_launcher::lifecycle::ShutdownReport;
use node_launcher::{DaemonConfig, Error, Node, NodeOptions, Shutdown};

/// A daemon config that binds ephemeral loopback ports inside `data_dir`.
pub fn daemon_config(data_dir: &Path) -> DaemonConfig {
    DaemonConfig {
        data_dir: data_dir.to_path_buf(),
        load_checkpoints: String::new(),
        log_file: data_dir.join("noded.log"),
        no_console: true,
        p2p_bind_ip: "127.0.0.1".into(),
        p2p_bind_port: 0,
        rpc_bind_ip: "127.0.0.1".into(),
        rpc_bind_port: 0,
        ..Default::default()
    }
}

pub fn node_options(schema_version: u32) -> NodeOptions {
    NodeOptions {
        install_signals: false,
        console_io: None,
        schema_version,
    }
}

/// Wallet-service config with a password and an ephemeral port.
pub fn wallet_config(container: &Path, password: &str) -> WalletServiceConfig {
    WalletServiceConfig {
        container_file: container.to_path_buf(),
        rpc_password: password.into(),
        bind_address: "127.0.0.1".into(),
        bind_port: 0,
        ..Default::default()
    }
}

/// What a running node thread hands back before it blocks in `run`.
pub struct Started {
    pub shutdown: Shutdown,
    pub rpc_addr: std::net::SocketAddr,
    pub p2p_addr: std::net::SocketAddr,
    pub provisioned: node_launcher::storage::Provisioned,
}

/// Start a node on its own thread and run it until stopped.
///
/// `Node::run` blocks on its own runtime, so it must not be called from
/// inside a `#[tokio::test]`.
pub fn spawn_node(
    config: DaemonConfig,
    options: NodeOptions,
) -> Result<(Started, JoinHandle<Result<ShutdownReport, Error>>), Error> {
    let (tx, rx) = mpsc::channel();
    let handle = std::thread::spawn(move || {
        let node = match Node::start(std::sync::Arc::new(config), options) {
            Ok(node) => node,
            Err(e) => {
                let _ = tx.send(Err(e));
                return Ok(ShutdownReport {
                    cause: None,
                    steps: Vec::new(),
                });
            }
        };
        let _ = tx.send(Ok(Started {
            shutdown: node.shutdown_handle(),
            rpc_addr: node.rpc_addr(),
            p2p_addr: node.p2p_addr(),
            provisioned: node.provisioned(),
        }));
        node.run()
    });

    match rx.recv_timeout(Duration::from_secs(10)) {
        Ok(Ok(started)) => Ok((started, handle)),
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(e)
        }
        Err(_) => panic!("node did not start in time"),
    }
}

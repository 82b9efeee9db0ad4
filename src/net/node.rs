//! P2P network layer.
//!
//! # Responsibilities
//! - Bind the p2p listener during startup
//! - Run the accept loop on the controlling thread until a stop request
//! - Dial configured peers
//! - Persist the known peer list on deinit
//!
//! # Design Decisions
//! - A current-thread runtime: all peer I/O is multiplexed on the thread
//!   that called `run`
//! - Binding happens in `init` so port conflicts are startup errors
//! - Accept errors that only affect one connection are logged and skipped

use std::fs;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;

use crate::error::{RuntimeFault, StartupError};
use crate::lifecycle::Shutdown;
use crate::net::config::{is_local, NetNodeConfig};
use crate::net::connection::Direction;
use crate::net::protocol::{P2pEndpoint, ProtocolHandler};

const PEER_STATE_FILE: &str = "p2pstate.json";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Default, Serialize, Deserialize)]
struct PeerState {
    peers: Vec<SocketAddr>,
}

pub struct P2pNode {
    config: NetNodeConfig,
    handler: Arc<ProtocolHandler>,
    runtime: Option<Runtime>,
    listener: Option<std::net::TcpListener>,
    local_addr: SocketAddr,
}

impl P2pNode {
    /// Bind the listener and prepare the runtime. Nothing is accepted yet.
    pub fn init(config: NetNodeConfig, handler: Arc<ProtocolHandler>) -> Result<Self, StartupError> {
        let bind_err = |source| StartupError::Bind {
            service: "p2p",
            address: config.bind.to_string(),
            source,
        };

        let listener = std::net::TcpListener::bind(config.bind).map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StartupError::Runtime("p2p", e))?;

        for addr in load_peer_state(&state_path(&config)) {
            handler.remember_peer(addr);
        }

        tracing::info!(
            address = %local_addr,
            advertised_port = ?config.advertised_port(local_addr.port()),
            "P2P listener bound"
        );

        Ok(Self {
            config,
            handler,
            runtime: Some(runtime),
            listener: Some(listener),
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn endpoint(&self) -> P2pEndpoint {
        P2pEndpoint {
            local_addr: self.local_addr,
            advertised_port: self.config.advertised_port(self.local_addr.port()),
        }
    }

    /// Run the event loop on this thread until `shutdown` fires.
    pub fn run(&mut self, shutdown: &Shutdown) -> Result<(), RuntimeFault> {
        let (Some(runtime), Some(listener)) = (self.runtime.as_ref(), self.listener.take()) else {
            return Err(RuntimeFault::Network(std::io::Error::new(
                ErrorKind::NotConnected,
                "p2p listener is not bound",
            )));
        };

        let handler = Arc::clone(&self.handler);
        let config = self.config.clone();
        let shutdown = shutdown.clone();

        runtime.block_on(async move {
            let listener = TcpListener::from_std(listener).map_err(RuntimeFault::Network)?;

            let mut targets = config.outbound_targets();
            targets.shuffle(&mut rand::thread_rng());
            for addr in targets {
                tokio::spawn(dial(Arc::clone(&handler), addr, shutdown.clone()));
            }

            tracing::info!(address = %config.bind, "P2P node running");
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, addr)) => {
                            if !config.admits(&addr) {
                                tracing::debug!(peer_addr = %addr, "Rejected non-exclusive peer");
                                continue;
                            }
                            tokio::spawn(Arc::clone(&handler).handle_peer(
                                stream,
                                addr,
                                Direction::Inbound,
                                shutdown.clone(),
                            ));
                        }
                        Err(e) if is_transient(&e) => {
                            tracing::warn!(error = %e, "Accept failed");
                        }
                        Err(e) => return Err(RuntimeFault::Network(e)),
                    },
                }
            }
            Ok(())
        })
    }

    #[cfg(test)]
    pub(crate) fn close_listener(&mut self) {
        self.listener = None;
    }

    /// Stop the runtime and persist the peer list.
    pub fn deinit(&mut self) -> Result<(), RuntimeFault> {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(DRAIN_TIMEOUT);
        }
        self.listener = None;

        let peers: Vec<SocketAddr> = self
            .handler
            .known_peers()
            .into_iter()
            .filter(|addr| self.config.allow_local_ip || !is_local(&addr.ip()))
            .collect();

        let path = state_path(&self.config);
        let rendered = serde_json::to_string_pretty(&PeerState { peers })
            .map_err(|e| RuntimeFault::Network(std::io::Error::new(ErrorKind::InvalidData, e)))?;
        fs::write(&path, rendered).map_err(RuntimeFault::Network)?;

        tracing::info!(path = %path.display(), "P2P node stopped");
        Ok(())
    }
}

impl Drop for P2pNode {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

fn state_path(config: &NetNodeConfig) -> PathBuf {
    config.data_dir.join(PEER_STATE_FILE)
}

fn load_peer_state(path: &Path) -> Vec<SocketAddr> {
    match fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str::<PeerState>(&text) {
            Ok(state) => state.peers,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed peer state");
                Vec::new()
            }
        },
        Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot read peer state");
            Vec::new()
        }
    }
}

fn is_transient(e: &std::io::Error) -> bool {
    let kind = matches!(
        e.kind(),
        ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset | ErrorKind::Interrupted | ErrorKind::WouldBlock
    );
    // EMFILE / ENFILE: out of descriptors, later accepts may succeed
    kind || e.raw_os_error().is_some_and(|code| code == 24 || code == 23)
}

async fn dial(handler: Arc<ProtocolHandler>, addr: SocketAddr, shutdown: Shutdown) {
    handler.remember_peer(addr);
    match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => {
            handler
                .handle_peer(stream, addr, Direction::Outbound, shutdown)
                .await
        }
        Ok(Err(e)) => tracing::debug!(peer_addr = %addr, error = %e, "Connect failed"),
        Err(_) => tracing::debug!(peer_addr = %addr, "Connect timed out"),
    }
}

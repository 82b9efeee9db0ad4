//! Protocol handler: the glue between peer sessions and the engine.
//!
//! The wire protocol itself is not implemented here. The handler owns the
//! session table, remembers addresses worth persisting, and holds a
//! reference to the network layer's endpoint while that layer is up.
//!
//! Only dialable addresses are remembered: configured peers and outbound
//! targets. The source address of an inbound session is the remote's
//! ephemeral port and is never persisted.

use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};

use dashmap::DashSet;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use crate::engine::ChainEngine;
use crate::lifecycle::Shutdown;
use crate::net::connection::{ConnectionTracker, Direction};

/// Upper bound on remembered peer addresses.
pub const MAX_KNOWN_PEERS: usize = 1000;

/// What the protocol handler knows about the running network layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct P2pEndpoint {
    pub local_addr: SocketAddr,
    pub advertised_port: Option<u16>,
}

#[derive(Debug)]
pub struct ProtocolHandler {
    engine: Arc<ChainEngine>,
    endpoint: RwLock<Option<P2pEndpoint>>,
    connections: ConnectionTracker,
    known_peers: DashSet<SocketAddr>,
}

impl ProtocolHandler {
    pub fn new(engine: Arc<ChainEngine>) -> Self {
        Self {
            engine,
            endpoint: RwLock::new(None),
            connections: ConnectionTracker::new(),
            known_peers: DashSet::new(),
        }
    }

    /// Bind to the network layer.
    pub fn attach(&self, endpoint: P2pEndpoint) {
        *self.endpoint.write().unwrap_or_else(PoisonError::into_inner) = Some(endpoint);
        tracing::debug!(local_addr = %endpoint.local_addr, "Protocol handler attached");
    }

    /// Drop the reference to the network layer.
    pub fn detach(&self) {
        if self
            .endpoint
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            tracing::debug!("Protocol handler detached");
        }
    }

    pub fn endpoint(&self) -> Option<P2pEndpoint> {
        *self.endpoint.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn connections(&self) -> &ConnectionTracker {
        &self.connections
    }

    /// Remember a dialable address. Returns `false` once the list is full.
    pub fn remember_peer(&self, addr: SocketAddr) -> bool {
        if self.known_peers.len() >= MAX_KNOWN_PEERS && !self.known_peers.contains(&addr) {
            tracing::trace!(peer_addr = %addr, "Known peer list full");
            return false;
        }
        self.known_peers.insert(addr);
        true
    }

    /// Every address seen or configured, sorted.
    pub fn known_peers(&self) -> Vec<SocketAddr> {
        let mut peers: Vec<_> = self.known_peers.iter().map(|a| *a).collect();
        peers.sort();
        peers
    }

    /// Hold a peer session open until the peer hangs up or the node stops.
    pub async fn handle_peer(
        self: Arc<Self>,
        mut stream: TcpStream,
        addr: SocketAddr,
        direction: Direction,
        shutdown: Shutdown,
    ) {
        let guard = self.connections.track(addr, direction);
        tracing::debug!(
            connection_id = %guard.id(),
            local_height = self.engine.height(),
            "Peer session started"
        );

        let mut buf = [0u8; 4096];
        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                read = stream.read(&mut buf) => match read {
                    Ok(0) => break,
                    Ok(n) => {
                        tracing::trace!(connection_id = %guard.id(), bytes = n, "Peer data");
                    }
                    Err(e) => {
                        tracing::debug!(connection_id = %guard.id(), error = %e, "Peer read failed");
                        break;
                    }
                },
            }
        }
    }
}

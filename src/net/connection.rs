//! Peer connection tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Track live peer sessions for the console and RPC
//! - Drop a session from the table when its guard goes away

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;

use crate::observability::metrics;

/// Relaxed ordering is enough: only uniqueness matters.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// A live peer session.
#[derive(Debug, Clone)]
pub struct PeerSession {
    pub id: ConnectionId,
    pub addr: SocketAddr,
    pub direction: Direction,
    pub opened_at: Instant,
}

impl PeerSession {
    /// Whole seconds since the session was opened.
    pub fn connected_secs(&self) -> u64 {
        self.opened_at.elapsed().as_secs()
    }
}

/// Table of live peer sessions.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    sessions: Arc<DashMap<ConnectionId, PeerSession>>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a session. It stays listed until the guard is dropped.
    pub fn track(&self, addr: SocketAddr, direction: Direction) -> ConnectionGuard {
        let id = ConnectionId::next();
        self.sessions.insert(
            id,
            PeerSession {
                id,
                addr,
                direction,
                opened_at: Instant::now(),
            },
        );
        metrics::record_peer_connected(direction.as_str());
        metrics::record_active_peers(self.sessions.len());
        tracing::debug!(connection_id = %id, peer_addr = %addr, direction = direction.as_str(), "Peer connected");

        ConnectionGuard {
            sessions: Arc::clone(&self.sessions),
            id,
        }
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Snapshot of the live sessions, oldest first.
    pub fn sessions(&self) -> Vec<PeerSession> {
        let mut sessions: Vec<_> = self.sessions.iter().map(|e| e.value().clone()).collect();
        sessions.sort_by_key(|s| s.id);
        sessions
    }
}

/// Removes its session from the tracker when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    sessions: Arc<DashMap<ConnectionId, PeerSession>>,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.sessions.remove(&self.id);
        metrics::record_active_peers(self.sessions.len());
        tracing::trace!(connection_id = %self.id, "Peer disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_unique() {
        assert_ne!(ConnectionId::next(), ConnectionId::next());
    }

    #[test]
    fn tracker_lists_live_sessions() {
        let tracker = ConnectionTracker::new();
        let a = tracker.track("1.2.3.4:5".parse().unwrap(), Direction::Inbound);
        let b = tracker.track("5.6.7.8:9".parse().unwrap(), Direction::Outbound);
        assert_eq!(tracker.active_count(), 2);

        let sessions = tracker.sessions();
        assert_eq!(sessions[0].id, a.id());
        assert_eq!(sessions[1].direction, Direction::Outbound);
        assert!(sessions[0].opened_at <= sessions[1].opened_at);
        assert_eq!(sessions[1].connected_secs(), 0);

        drop(a);
        assert_eq!(tracker.active_count(), 1);
        drop(b);
        assert_eq!(tracker.active_count(), 0);
    }
}

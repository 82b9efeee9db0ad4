//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! DaemonConfig
//!     → config.rs (NetNodeConfig: bind address, peer lists)
//!     → node.rs (P2pNode: bind at init, accept/dial loop, deinit)
//!     → protocol.rs (ProtocolHandler: per-peer sessions, engine binding)
//!     → connection.rs (live session table)
//!
//! Peer session:
//!     Accepted/Dialed → Tracked → Closed (guard dropped)
//! ```
//!
//! # Design Decisions
//! - The listener is bound during startup; accepting starts with `run`
//! - Exclusive nodes replace every other peer source
//! - Each session is tracked for the console and RPC views

pub mod config;
pub mod connection;
pub mod node;
pub mod protocol;

pub use config::NetNodeConfig;
pub use node::P2pNode;
pub use protocol::{P2pEndpoint, ProtocolHandler};

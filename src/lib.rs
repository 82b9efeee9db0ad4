//! Node launcher: configuration resolution, bootstrap and lifecycle
//! orchestration for a blockchain node daemon and its wallet service.
//!
//! # Architecture Overview
//!
//! ```text
//!   defaults ─┐
//!   file ─────┼─▶ config ──▶ validated config (Arc)
//!   CLI ──────┘                    │
//!                                  ▼
//!                ┌──────────── lifecycle::Node ─────────────┐
//!                │ checkpoints → storage → engine → net     │
//!                │        → console → rpc → signals         │
//!                │                                          │
//!                │ run: p2p event loop until request_stop   │
//!                │ drain: exact reverse order, once         │
//!                └──────────────────────────────────────────┘
//!
//!   wallet-service: config → security (sealed RPC secret)
//!                   → wallet::WalletService (rpc + signals)
//! ```
//!
//! Cross-cutting: `observability` (tracing + metrics), `error` (one typed
//! taxonomy mapped to an exit code by the binaries).

// Configuration
pub mod config;
pub mod error;

// Node subsystems
pub mod console;
pub mod engine;
pub mod net;
pub mod rpc;
pub mod storage;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

// Wallet-service front-end
pub mod wallet;

pub use config::schema::{DaemonConfig, WalletServiceConfig};
pub use error::{Error, Result};
pub use lifecycle::{Node, NodeOptions, Shutdown, StopCause};
pub use wallet::WalletService;

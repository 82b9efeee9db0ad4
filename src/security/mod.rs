//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Resolved WalletServiceConfig (plaintext rpc-password)
//!     → secret.rs (derive FixedSecret, wipe plaintext)
//!     → RpcCredential shared with the RPC surface
//!     → rpc/auth.rs (compare presented bearer token)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a missing or wrong credential is rejected
//! - The plaintext never outlives configuration resolution

pub mod secret;

pub use secret::{derive, seal_rpc_password, FixedSecret, RpcCredential};

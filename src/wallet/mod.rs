//! Wallet-service front-end support.
//!
//! # Data Flow
//! ```text
//! Resolved WalletServiceConfig + WalletModes
//!     → --generate-container: container.rs creates the record, process exits
//!     → otherwise: container.rs checks the file exists
//!     → security::seal_rpc_password
//!     → service.rs (RPC thread + signal bridge until stop)
//! ```

pub mod container;
pub mod service;

pub use container::{check_container_exists, generate_container, ContainerRecord, CreationMode};
pub use service::WalletService;

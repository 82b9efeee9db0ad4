//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! built-in defaults ──────────────┐
//! config file (JSON/TOML)          │
//!     → loader.rs → Overrides ─────┼─▶ resolver.rs (layer: default < file < cli)
//! command line                     │        │
//!     → cli.rs (clap) → Overrides ─┘        ├─▶ --dump-config / --save-config
//!                                           ▼
//!                                  validation.rs (ordered, fail-fast)
//!                                           ▼
//!                                  DaemonConfig / WalletServiceConfig
//!                                  (immutable, shared via Arc)
//! ```
//!
//! # Design Decisions
//! - "Explicitly supplied" is an `Option` in the overrides type, never a
//!   comparison against the default value
//! - Lists replace, they never merge across tiers
//! - Config is immutable once resolved; there is no reload

pub mod cli;
pub mod loader;
pub mod resolver;
pub mod schema;
pub mod validation;

pub use cli::{DaemonCli, WalletServiceCli};
pub use loader::{dump_config, load_overrides, save_config, FileFormat};
pub use resolver::{layer, resolve_daemon, resolve_wallet_service, Overlay, SettingSource};
pub use schema::{
    DaemonConfig, DaemonOverrides, WalletModes, WalletServiceConfig, WalletServiceOverrides,
};
pub use validation::{validate_daemon, validate_wallet_service};

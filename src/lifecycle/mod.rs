//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (node.rs):
//!     Checkpoints → Network config → Store provisioning → Engine
//!     → Protocol handler → P2P bind → Console → RPC → Signals
//!
//! Run (node.rs):
//!     P2P event loop owns the controlling thread until a stop request
//!
//! Shutdown (node.rs, exact reverse):
//!     Signals → Console → RPC → Network → Protocol → Persist → Store
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → atomic flag → watcher thread → request_stop
//! ```
//!
//! # Design Decisions
//! - State is monotonic: Configuring → Initializing → Running → Draining → Stopped
//! - Stop requests are idempotent; only the first one counts
//! - Shutdown runs every step and reports the first failure

pub mod node;
pub mod shutdown;
pub mod signals;
pub mod state;

pub use node::{Node, NodeOptions, ShutdownReport, ShutdownStep};
pub use shutdown::{Shutdown, StopCause};
pub use signals::SignalBridge;
pub use state::{LifecycleState, StateCell};

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, console + log file)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Operator console / log file
//!     → Whatever metrics recorder the embedding process installs
//! ```
//!
//! # Design Decisions
//! - Structured key/value fields on every event
//! - Metrics are cheap (no-op without a recorder)

pub mod logging;
pub mod metrics;

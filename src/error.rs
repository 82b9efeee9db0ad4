//! Error taxonomy shared by the daemon and the wallet service.
//!
//! # Data Flow
//! ```text
//! config file / CLI  → ConfigError      (parse, validation, credential)
//! data directory     → DirectoryError
//! persisted store    → SchemaError
//! subsystem startup  → StartupError
//! run loop/shutdown  → RuntimeFault
//!                    ↓
//!               Error  → exit code + operator message in main
//! ```
//!
//! # Design Decisions
//! - Every failure is a typed value; binaries pattern-match instead of catching
//! - Validation is fail-fast: a `ValidationError` names the first broken rule

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::StoreError;

/// A resolved value that breaks one of the post-merge rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Two run modes were requested that cannot be combined.
    #[error("It's impossible to use both --{first} and --{second} at the same time")]
    ConflictingModes {
        first: &'static str,
        second: &'static str,
    },

    /// A numeric setting is outside its accepted bounds.
    #[error("{field} must be between {min}..{max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// A setting that must be present was left empty.
    #[error("--{0} is required")]
    MissingField(&'static str),

    /// A flag was given without the mode flag it depends on.
    #[error("--{required} is required when --{given} is used")]
    RequiresMode {
        given: &'static str,
        required: &'static str,
    },

    /// Importing from a mnemonic seed and from raw keys at once.
    #[error("You cannot specify import from both a mnemonic seed and private keys")]
    ConflictingImport,

    /// Only one half of a view/spend key pair was supplied.
    #[error("--view-key and --spend-key must be supplied together")]
    IncompleteKeyPair,

    /// An address-valued setting does not parse.
    #[error("invalid {field} '{value}': {reason}")]
    InvalidAddress {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Problems with the RPC credential mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("Please specify either an RPC password or use the --rpc-legacy-security flag")]
    MissingCredential,

    #[error("--rpc-password cannot be combined with --rpc-legacy-security")]
    ConflictingCredential,
}

/// Failures while producing a validated configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration file {path}: {source}")]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration file {path} is malformed: {reason}")]
    FileMalformed { path: PathBuf, reason: String },

    #[error("could not save configuration to {path}: {reason}")]
    FileUnwritable { path: PathBuf, reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Data directory policy violations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// An explicitly configured directory does not exist.
    #[error("Directory does not exist: {0}")]
    Missing(PathBuf),

    /// The defaulted directory could not be created.
    #[error("Can't create directory {path}: {source}")]
    Uncreatable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The persisted store could not be opened or rebuilt.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("store at {path} is unreadable: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error("store at {path} could not be rebuilt: {source}")]
    RebuildFailed {
        path: PathBuf,
        #[source]
        source: StoreError,
    },
}

/// A dependent subsystem failed to come up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load checkpoints from {path}: {reason}")]
    Checkpoints { path: PathBuf, reason: String },

    #[error("failed to load engine state: {0}")]
    Engine(#[source] StoreError),

    #[error("invalid {field} '{value}'")]
    Address { field: &'static str, value: String },

    #[error("failed to bind {service} on {address}: {source}")]
    Bind {
        service: &'static str,
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start {0} runtime: {1}")]
    Runtime(&'static str, #[source] std::io::Error),

    #[error("failed to spawn {0} thread: {1}")]
    Thread(&'static str, #[source] std::io::Error),

    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),

    #[error("failed to initialize logging: {0}")]
    Logging(String),

    #[error("wallet container error: {0}")]
    Container(String),

    #[error("cannot use {path} as server root: {source}")]
    ServerRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Unsupported(&'static str),
}

/// Unexpected failure surfaced while running or draining.
#[derive(Debug, Error)]
pub enum RuntimeFault {
    #[error("p2p network failure: {0}")]
    Network(#[source] std::io::Error),

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),

    #[error("{0} RPC requests still in flight at the drain deadline")]
    DrainTimeout(&'static str),

    #[error("failed to persist engine state: {0}")]
    Persist(#[source] StoreError),

    #[error("failed to release store: {0}")]
    Release(#[source] StoreError),

    #[error("invalid lifecycle transition {from:?} -> {to:?}")]
    Transition {
        from: crate::lifecycle::LifecycleState,
        to: crate::lifecycle::LifecycleState,
    },
}

/// Top-level error; every fatal condition ends up here.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error(transparent)]
    Runtime(#[from] RuntimeFault),
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Config(ConfigError::Validation(err))
    }
}

impl From<CredentialError> for Error {
    fn from(err: CredentialError) -> Self {
        Error::Config(ConfigError::Credential(err))
    }
}

impl Error {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// Whether the failure happened before any subsystem thread was started.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::Directory(_) | Error::Schema(_)
        )
    }
}

/// Result type used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

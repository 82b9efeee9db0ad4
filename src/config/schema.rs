//! Configuration schema definitions.
//!
//! Two record types live here, one per front-end, plus their override
//! mirrors. A config record always holds a complete value for every field;
//! an override holds `Some` only for fields a source explicitly supplied.
//! The same override type is filled from a config file (serde) and from the
//! command line (clap), so "was this set" is answered by the type itself.

use std::fmt;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::{Deserialize, Serialize};

/// Default TCP port of the p2p service.
pub const P2P_DEFAULT_PORT: u16 = 11897;

/// Default TCP port of the daemon RPC service.
pub const RPC_DEFAULT_PORT: u16 = 11898;

/// Default TCP port of the wallet-service RPC.
pub const SERVICE_DEFAULT_PORT: u16 = 8070;

pub const DATABASE_DEFAULT_MAX_OPEN_FILES: u32 = 100;
pub const DATABASE_READ_BUFFER_MB_DEFAULT_SIZE: u32 = 10;
pub const DATABASE_WRITE_BUFFER_MB_DEFAULT_SIZE: u32 = 256;
pub const DATABASE_DEFAULT_BACKGROUND_THREADS_COUNT: u32 = 2;

/// Highest accepted daemon log level (0 = errors only, 4 = trace).
pub const DAEMON_MAX_LOG_LEVEL: u8 = 4;

/// Highest accepted wallet-service log level (0 = fatal, 5 = trace).
pub const SERVICE_MAX_LOG_LEVEL: u8 = 5;

const DATA_DIR_NAME: &str = "noded";

/// Platform data directory used when `data-dir` is not supplied.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DaemonConfig {
    /// Blockchain data directory.
    pub data_dir: PathBuf,

    /// "" disables checkpoints, "default" uses the built-in table,
    /// anything else is a CSV file path.
    pub load_checkpoints: String,

    pub log_file: PathBuf,
    pub log_level: u8,

    /// Disable the interactive console.
    pub no_console: bool,

    pub db_max_open_files: u32,
    pub db_read_buffer_size: u32,
    pub db_threads: u32,
    pub db_write_buffer_size: u32,

    /// Allow local addresses in the persisted peer list.
    pub allow_local_ip: bool,

    /// Do not advertise our p2p port.
    pub hide_my_port: bool,

    pub p2p_bind_ip: String,
    pub p2p_bind_port: u16,

    /// NAT-forwarded port to advertise instead of the bound one (0 = none).
    pub p2p_external_port: u16,

    pub rpc_bind_ip: String,
    pub rpc_bind_port: u16,

    #[serde(rename = "add-exclusive-node")]
    pub exclusive_nodes: Vec<String>,

    #[serde(rename = "add-peer")]
    pub peers: Vec<String>,

    #[serde(rename = "add-priority-node")]
    pub priority_nodes: Vec<String>,

    #[serde(rename = "seed-node")]
    pub seed_nodes: Vec<String>,

    #[serde(rename = "enable-blockexplorer")]
    pub enable_block_explorer: bool,

    pub enable_cors: Vec<String>,

    /// Convenience charge address for light wallets.
    pub fee_address: String,
    pub fee_amount: u64,
}

impl DaemonConfig {
    /// Defaults with the log file placed next to the executable.
    pub fn for_executable(exe: &Path) -> Self {
        Self {
            log_file: exe.with_extension("log"),
            ..Self::default()
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            load_checkpoints: "default".to_string(),
            log_file: PathBuf::from("noded.log"),
            log_level: 2,
            no_console: false,
            db_max_open_files: DATABASE_DEFAULT_MAX_OPEN_FILES,
            db_read_buffer_size: DATABASE_READ_BUFFER_MB_DEFAULT_SIZE,
            db_threads: DATABASE_DEFAULT_BACKGROUND_THREADS_COUNT,
            db_write_buffer_size: DATABASE_WRITE_BUFFER_MB_DEFAULT_SIZE,
            allow_local_ip: false,
            hide_my_port: false,
            p2p_bind_ip: "0.0.0.0".to_string(),
            p2p_bind_port: P2P_DEFAULT_PORT,
            p2p_external_port: 0,
            rpc_bind_ip: "127.0.0.1".to_string(),
            rpc_bind_port: RPC_DEFAULT_PORT,
            exclusive_nodes: Vec::new(),
            peers: Vec::new(),
            priority_nodes: Vec::new(),
            seed_nodes: Vec::new(),
            enable_block_explorer: false,
            enable_cors: Vec::new(),
            fee_address: String::new(),
            fee_amount: 0,
        }
    }
}

/// Explicitly supplied daemon settings from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Args)]
#[serde(rename_all = "kebab-case")]
pub struct DaemonOverrides {
    /// Specify the <path> to the Blockchain data directory
    #[arg(long = "data-dir", value_name = "PATH", help_heading = "Daemon")]
    pub data_dir: Option<PathBuf>,

    /// Specify a file <path> containing a CSV of Blockchain checkpoints for faster sync. A value of 'default' uses the built-in checkpoints.
    #[arg(long = "load-checkpoints", value_name = "PATH", num_args = 0..=1, default_missing_value = "default", help_heading = "Daemon")]
    pub load_checkpoints: Option<String>,

    /// Specify the <path> to the log file
    #[arg(long = "log-file", value_name = "PATH", help_heading = "Daemon")]
    pub log_file: Option<PathBuf>,

    /// Specify log level
    #[arg(long = "log-level", value_name = "#", help_heading = "Daemon")]
    pub log_level: Option<u8>,

    /// Disable daemon console commands
    #[arg(long = "no-console", num_args = 0..=1, default_missing_value = "true", value_name = "BOOL", help_heading = "Daemon")]
    pub no_console: Option<bool>,

    /// Number of files that can be used by the database at one time
    #[arg(long = "db-max-open-files", value_name = "#", help_heading = "Database")]
    pub db_max_open_files: Option<u32>,

    /// Size of the database read cache in megabytes (MB)
    #[arg(long = "db-read-buffer-size", value_name = "#", help_heading = "Database")]
    pub db_read_buffer_size: Option<u32>,

    /// Number of background threads used for compaction and flush operations
    #[arg(long = "db-threads", value_name = "#", help_heading = "Database")]
    pub db_threads: Option<u32>,

    /// Size of the database write buffer in megabytes (MB)
    #[arg(long = "db-write-buffer-size", value_name = "#", help_heading = "Database")]
    pub db_write_buffer_size: Option<u32>,

    /// Allow the local IP to be added to the peer list
    #[arg(long = "allow-local-ip", num_args = 0..=1, default_missing_value = "true", value_name = "BOOL", help_heading = "Network")]
    pub allow_local_ip: Option<bool>,

    /// Do not announce yourself as a peerlist candidate
    #[arg(long = "hide-my-port", num_args = 0..=1, default_missing_value = "true", value_name = "BOOL", help_heading = "Network")]
    pub hide_my_port: Option<bool>,

    /// Interface IP address for the P2P service
    #[arg(long = "p2p-bind-ip", value_name = "IP", help_heading = "Network")]
    pub p2p_bind_ip: Option<String>,

    /// TCP port for the P2P service
    #[arg(long = "p2p-bind-port", value_name = "#", help_heading = "Network")]
    pub p2p_bind_port: Option<u16>,

    /// External TCP port for the P2P service (NAT port forward)
    #[arg(long = "p2p-external-port", value_name = "#", help_heading = "Network")]
    pub p2p_external_port: Option<u16>,

    /// Interface IP address for the RPC service
    #[arg(long = "rpc-bind-ip", value_name = "IP", help_heading = "Network")]
    pub rpc_bind_ip: Option<String>,

    /// TCP port for the RPC service
    #[arg(long = "rpc-bind-port", value_name = "#", help_heading = "Network")]
    pub rpc_bind_port: Option<u16>,

    /// Manually add a peer to the local peer list ONLY attempt connections to it
    #[serde(rename = "add-exclusive-node")]
    #[arg(long = "add-exclusive-node", value_name = "IP:PORT", help_heading = "Peer")]
    pub exclusive_nodes: Option<Vec<String>>,

    /// Manually add a peer to the local peer list
    #[serde(rename = "add-peer")]
    #[arg(long = "add-peer", value_name = "IP:PORT", help_heading = "Peer")]
    pub peers: Option<Vec<String>>,

    /// Manually add a peer to the local peer list and attempt to maintain a connection to it
    #[serde(rename = "add-priority-node")]
    #[arg(long = "add-priority-node", value_name = "IP:PORT", help_heading = "Peer")]
    pub priority_nodes: Option<Vec<String>>,

    /// Connect to a node to retrieve the peer list and then disconnect
    #[serde(rename = "seed-node")]
    #[arg(long = "seed-node", value_name = "IP:PORT", help_heading = "Peer")]
    pub seed_nodes: Option<Vec<String>>,

    /// Enable the Blockchain Explorer RPC
    #[serde(rename = "enable-blockexplorer")]
    #[arg(long = "enable-blockexplorer", num_args = 0..=1, default_missing_value = "true", value_name = "BOOL", help_heading = "RPC")]
    pub enable_block_explorer: Option<bool>,

    /// Adds header 'Access-Control-Allow-Origin' to the RPC responses using the <domain>. Use * for all.
    #[arg(long = "enable-cors", value_name = "DOMAIN", num_args = 0..=1, default_missing_value = "*", help_heading = "RPC")]
    pub enable_cors: Option<Vec<String>>,

    /// Sets the convenience charge <address> for light wallets that use the daemon
    #[arg(long = "fee-address", value_name = "ADDRESS", help_heading = "RPC")]
    pub fee_address: Option<String>,

    /// Sets the convenience charge amount for light wallets that use the daemon
    #[arg(long = "fee-amount", value_name = "#", help_heading = "RPC")]
    pub fee_amount: Option<u64>,
}

/// Resolved wallet-service configuration.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct WalletServiceConfig {
    pub daemon_address: String,
    pub daemon_port: u16,
    pub log_file: PathBuf,
    pub log_level: u8,
    pub container_file: PathBuf,
    pub container_password: String,
    pub bind_address: String,
    pub bind_port: u16,

    /// Single CORS origin, empty to disable.
    pub enable_cors: String,

    /// No password on the RPC surface.
    #[serde(rename = "rpc-legacy-security")]
    pub legacy_security: bool,

    /// Plaintext only until the RPC secret is derived.
    pub rpc_password: String,

    /// Working directory of the service.
    pub server_root: PathBuf,
}

impl Default for WalletServiceConfig {
    fn default() -> Self {
        Self {
            daemon_address: "127.0.0.1".to_string(),
            daemon_port: RPC_DEFAULT_PORT,
            log_file: PathBuf::from("service.log"),
            log_level: 3,
            container_file: PathBuf::new(),
            container_password: String::new(),
            bind_address: "127.0.0.1".to_string(),
            bind_port: SERVICE_DEFAULT_PORT,
            enable_cors: String::new(),
            legacy_security: false,
            rpc_password: String::new(),
            server_root: PathBuf::new(),
        }
    }
}

impl fmt::Debug for WalletServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(value: &str) -> &'static str {
            if value.is_empty() { "" } else { "<redacted>" }
        }

        f.debug_struct("WalletServiceConfig")
            .field("daemon_address", &self.daemon_address)
            .field("daemon_port", &self.daemon_port)
            .field("log_file", &self.log_file)
            .field("log_level", &self.log_level)
            .field("container_file", &self.container_file)
            .field("container_password", &redact(&self.container_password))
            .field("bind_address", &self.bind_address)
            .field("bind_port", &self.bind_port)
            .field("enable_cors", &self.enable_cors)
            .field("legacy_security", &self.legacy_security)
            .field("rpc_password", &redact(&self.rpc_password))
            .field("server_root", &self.server_root)
            .finish()
    }
}

/// Explicitly supplied wallet-service settings from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Args)]
#[serde(rename_all = "kebab-case")]
pub struct WalletServiceOverrides {
    /// The daemon host to use for node operations
    #[arg(long = "daemon-address", value_name = "IP", help_heading = "Daemon")]
    pub daemon_address: Option<String>,

    /// The daemon RPC port to use for node operations
    #[arg(long = "daemon-port", value_name = "PORT", help_heading = "Daemon")]
    pub daemon_port: Option<u16>,

    /// Specify log <file> location
    #[arg(long = "log-file", value_name = "FILE", help_heading = "Service")]
    pub log_file: Option<PathBuf>,

    /// Specify log level
    #[arg(long = "log-level", value_name = "#", help_heading = "Service")]
    pub log_level: Option<u8>,

    /// Wallet container <file>
    #[arg(short = 'w', long = "container-file", value_name = "FILE", help_heading = "Wallet")]
    pub container_file: Option<PathBuf>,

    /// Wallet container <password>
    #[arg(short = 'p', long = "container-password", value_name = "PASSWORD", help_heading = "Wallet")]
    pub container_password: Option<String>,

    /// Interface IP address for the RPC service
    #[arg(long = "bind-address", value_name = "IP", help_heading = "Network")]
    pub bind_address: Option<String>,

    /// TCP port for the RPC service
    #[arg(long = "bind-port", value_name = "PORT", help_heading = "Network")]
    pub bind_port: Option<u16>,

    /// Adds header 'Access-Control-Allow-Origin' to the RPC responses. Use * for all.
    #[arg(long = "enable-cors", value_name = "DOMAIN", help_heading = "RPC")]
    pub enable_cors: Option<String>,

    /// Enable legacy mode (no password for RPC). WARNING: INSECURE. USE ONLY AS A LAST RESORT.
    #[serde(rename = "rpc-legacy-security")]
    #[arg(long = "rpc-legacy-security", num_args = 0..=1, default_missing_value = "true", value_name = "BOOL", help_heading = "RPC")]
    pub legacy_security: Option<bool>,

    /// Specify the <password> to access the RPC server.
    #[arg(long = "rpc-password", value_name = "PASSWORD", help_heading = "RPC")]
    pub rpc_password: Option<String>,

    /// The service will use this <path> as the working directory
    #[arg(long = "server-root", value_name = "PATH", help_heading = "Service")]
    pub server_root: Option<PathBuf>,
}

/// Wallet-service run modes. Command line only, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct WalletModes {
    /// Generate a new wallet container
    #[arg(short = 'g', long = "generate-container", help_heading = "Wallet")]
    pub generate_container: bool,

    /// Generate a wallet container with this secret view <key>
    #[arg(long = "view-key", value_name = "KEY", help_heading = "Wallet")]
    pub view_key: Option<String>,

    /// Generate a wallet container with this secret spend <key>
    #[arg(long = "spend-key", value_name = "KEY", help_heading = "Wallet")]
    pub spend_key: Option<String>,

    /// Generate a wallet container with this Mnemonic <seed>
    #[arg(long = "mnemonic-seed", value_name = "SEED", help_heading = "Wallet")]
    pub mnemonic_seed: Option<String>,

    /// Start scanning for transactions from this Blockchain height
    #[arg(long = "scan-height", value_name = "#", default_value_t = 0, help_heading = "Wallet")]
    pub scan_height: u64,

    /// Registers this program as a system service
    #[arg(long = "register-service", help_heading = "Service")]
    pub register_service: bool,

    /// Unregisters this program from being a system service
    #[arg(long = "unregister-service", help_heading = "Service")]
    pub unregister_service: bool,
}

impl WalletModes {
    pub fn has_keys(&self) -> bool {
        self.view_key.as_deref().is_some_and(|k| !k.is_empty())
            || self.spend_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    pub fn has_seed(&self) -> bool {
        self.mnemonic_seed.as_deref().is_some_and(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daemon_defaults() {
        let config = DaemonConfig::default();
        assert_eq!(config.log_level, 2);
        assert_eq!(config.p2p_bind_port, P2P_DEFAULT_PORT);
        assert_eq!(config.rpc_bind_ip, "127.0.0.1");
        assert_eq!(config.load_checkpoints, "default");
        assert!(config.peers.is_empty());
    }

    #[test]
    fn test_log_file_follows_executable() {
        let config = DaemonConfig::for_executable(Path::new("/opt/bin/noded"));
        assert_eq!(config.log_file, PathBuf::from("/opt/bin/noded.log"));
    }

    #[test]
    fn test_keys_mirror_flag_names() {
        let json = serde_json::to_value(DaemonConfig::default()).unwrap();
        for key in ["data-dir", "p2p-bind-port", "add-peer", "seed-node", "enable-blockexplorer", "allow-local-ip"] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }

        let json = serde_json::to_value(WalletServiceConfig::default()).unwrap();
        assert!(json.get("rpc-legacy-security").is_some());
        assert!(json.get("container-file").is_some());
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let config = WalletServiceConfig {
            rpc_password: "hunter2".into(),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}

//! Command line front-ends.
//!
//! Only the launcher-level switches live here. Every persisted setting is
//! declared once on its overrides struct in `schema.rs` and flattened in.

use std::path::PathBuf;

use clap::Parser;

use crate::config::schema::{DaemonOverrides, WalletModes, WalletServiceOverrides};

#[derive(Debug, Parser)]
#[command(name = "noded", version, about = "Blockchain node daemon", long_about = None)]
pub struct DaemonCli {
    /// Specify the <path> to a configuration file
    #[arg(short = 'c', long = "config-file", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Prints the current configuration to the screen
    #[arg(long = "dump-config")]
    pub dump_config: bool,

    /// Saves the configuration to the specified <file>
    #[arg(long = "save-config", value_name = "FILE")]
    pub save_config: Option<PathBuf>,

    /// Output Operating System version information
    #[arg(long = "os-version")]
    pub os_version: bool,

    #[command(flatten)]
    pub settings: DaemonOverrides,
}

#[derive(Debug, Parser)]
#[command(name = "wallet-service", version, about = "Wallet RPC service", long_about = None)]
pub struct WalletServiceCli {
    /// Specify the configuration <file>
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Prints the current configuration to the screen
    #[arg(long = "dump-config")]
    pub dump_config: bool,

    /// Save the configuration to the specified <file>
    #[arg(long = "save-config", value_name = "FILE")]
    pub save_config: Option<PathBuf>,

    #[command(flatten)]
    pub settings: WalletServiceOverrides,

    #[command(flatten)]
    pub modes: WalletModes,
}

/// Operating system line for `--os-version`.
pub fn os_version() -> String {
    format!("{} ({})", std::env::consts::OS, std::env::consts::ARCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definitions_are_consistent() {
        DaemonCli::command().debug_assert();
        WalletServiceCli::command().debug_assert();
    }

    #[test]
    fn test_absent_flags_stay_none() {
        let cli = DaemonCli::try_parse_from(["noded", "--rpc-bind-port", "12000"]).unwrap();
        assert_eq!(cli.settings.rpc_bind_port, Some(12000));
        assert_eq!(cli.settings.log_level, None);
        assert_eq!(cli.settings.no_console, None);
        assert!(cli.settings.peers.is_none());
    }

    #[test]
    fn test_bare_switches_and_repeats() {
        let cli = DaemonCli::try_parse_from([
            "noded",
            "--no-console",
            "--load-checkpoints",
            "--add-peer",
            "1.2.3.4:11897",
            "--add-peer",
            "5.6.7.8:11897",
        ])
        .unwrap();
        assert_eq!(cli.settings.no_console, Some(true));
        assert_eq!(cli.settings.load_checkpoints.as_deref(), Some("default"));
        assert_eq!(cli.settings.peers.map(|p| p.len()), Some(2));
    }

    #[test]
    fn test_wallet_modes_parse() {
        let cli = WalletServiceCli::try_parse_from([
            "wallet-service",
            "-w",
            "main.wallet",
            "-g",
            "--scan-height",
            "42",
        ])
        .unwrap();
        assert!(cli.modes.generate_container);
        assert_eq!(cli.modes.scan_height, 42);
        assert_eq!(cli.settings.container_file, Some(PathBuf::from("main.wallet")));
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(DaemonCli::try_parse_from(["noded", "--bogus"]).is_err());
    }
}

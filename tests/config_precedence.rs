//! Tier resolution from real files and command lines.

use clap::Parser;

use node_launcher::config::{
    layer, load_overrides, resolve_daemon, resolve_wallet_service, save_config, DaemonCli,
    DaemonConfig, DaemonOverrides, WalletServiceCli, WalletServiceConfig, WalletServiceOverrides,
};
use node_launcher::error::{ConfigError, CredentialError, ValidationError};

#[test]
fn test_cli_beats_file_beats_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("noded.json");
    std::fs::write(
        &path,
        r#"{ "rpc-bind-port": 20000, "p2p-bind-port": 20001, "log-level": 3, "unknown-key": 1 }"#,
    )
    .unwrap();

    let file: DaemonOverrides = load_overrides(&path).unwrap();
    let cli = DaemonCli::try_parse_from(["noded", "--rpc-bind-port", "30000"]).unwrap();

    let config = resolve_daemon(DaemonConfig::default(), Some(file), Some(cli.settings)).unwrap();
    assert_eq!(config.rpc_bind_port, 30000);
    assert_eq!(config.p2p_bind_port, 20001);
    assert_eq!(config.log_level, 3);
    assert_eq!(config.rpc_bind_ip, "127.0.0.1");
}

#[test]
fn test_toml_file_tier() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("noded.toml");
    std::fs::write(
        &path,
        "add-peer = [\"10.0.0.1:11897\", \"10.0.0.2:11897\"]\nno-console = true\n",
    )
    .unwrap();

    let file: DaemonOverrides = load_overrides(&path).unwrap();
    let cli = DaemonCli::try_parse_from(["noded", "--add-peer", "10.0.0.9:11897"]).unwrap();

    let config = layer(DaemonConfig::default(), Some(file.clone()), None);
    assert_eq!(config.peers.len(), 2);
    assert!(config.no_console);

    let config = layer(DaemonConfig::default(), Some(file), Some(cli.settings));
    assert_eq!(config.peers, vec!["10.0.0.9:11897".to_string()]);
    assert!(config.no_console);
}

#[test]
fn test_malformed_file_is_rejected_whole() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, r#"{ "rpc-bind-port": "not a port" "#).unwrap();

    let err = load_overrides::<DaemonOverrides>(&path).unwrap_err();
    assert!(matches!(err, ConfigError::FileMalformed { .. }));

    let err = load_overrides::<DaemonOverrides>(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::FileUnreadable { .. }));
}

#[test]
fn test_saved_config_loads_back_as_file_tier() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("saved.json");
    let cli = DaemonCli::try_parse_from(["noded", "--fee-address", "abc", "--fee-amount", "7"]).unwrap();

    let merged = layer(DaemonConfig::default(), None, Some(cli.settings));
    save_config(&merged, &path).unwrap();

    let file: DaemonOverrides = load_overrides(&path).unwrap();
    let config = resolve_daemon(DaemonConfig::default(), Some(file), None).unwrap();
    assert_eq!(config, merged);
}

#[test]
fn test_daemon_validation_runs_after_merge() {
    let cli = DaemonCli::try_parse_from(["noded", "--log-level", "9"]).unwrap();
    let err = resolve_daemon(DaemonConfig::default(), None, Some(cli.settings)).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Validation(ValidationError::OutOfRange { field: "log-level", .. })
    ));
}

#[test]
fn test_wallet_requires_credential() {
    let cli = WalletServiceCli::try_parse_from(["wallet-service", "-w", "main.wallet"]).unwrap();
    let err = resolve_wallet_service(
        WalletServiceConfig::default(),
        None,
        Some(cli.settings),
        &cli.modes,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Credential(CredentialError::MissingCredential)
    ));
}

#[test]
fn test_wallet_view_key_needs_generate() {
    let cli = WalletServiceCli::try_parse_from([
        "wallet-service",
        "-w",
        "main.wallet",
        "--rpc-password",
        "pw",
        "--view-key",
        "aa",
    ])
    .unwrap();
    let err = resolve_wallet_service(
        WalletServiceConfig::default(),
        None,
        Some(cli.settings),
        &cli.modes,
    )
    .unwrap_err();
    assert!(err.to_string().contains("--view-key"));
}

#[test]
fn test_wallet_file_password_survives_silent_cli() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service.json");
    std::fs::write(
        &path,
        r#"{ "container-file": "main.wallet", "rpc-password": "from-file", "bind-port": 9000 }"#,
    )
    .unwrap();

    let file: WalletServiceOverrides = load_overrides(&path).unwrap();
    let cli = WalletServiceCli::try_parse_from(["wallet-service"]).unwrap();
    let config = resolve_wallet_service(
        WalletServiceConfig::default(),
        Some(file),
        Some(cli.settings),
        &cli.modes,
    )
    .unwrap();
    assert_eq!(config.rpc_password, "from-file");
    assert_eq!(config.bind_port, 9000);
}

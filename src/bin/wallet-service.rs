//! `wallet-service`: wallet RPC service.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use node_launcher::config::{
    self, layer, load_overrides, resolve_wallet_service, WalletServiceCli, WalletServiceConfig,
    WalletServiceOverrides,
};
use node_launcher::error::StartupError;
use node_launcher::observability::logging::{init_logging, resolve_log_path, service_level};
use node_launcher::security::seal_rpc_password;
use node_launcher::wallet::{check_container_exists, generate_container};
use node_launcher::{Error, WalletService};

fn main() -> ExitCode {
    let cli = match WalletServiceCli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_preflight() {
                tracing::error!(error = %e, "Wallet service failed to start");
            } else {
                tracing::error!(error = %e, "Wallet service exited with an error");
            }
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: WalletServiceCli) -> Result<(), Error> {
    let exe = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("wallet-service"));

    let file = cli
        .config
        .as_deref()
        .map(load_overrides::<WalletServiceOverrides>)
        .transpose()?;

    if cli.dump_config || cli.save_config.is_some() {
        let merged = layer(WalletServiceConfig::default(), file, Some(cli.settings));
        if cli.dump_config {
            println!("{}", config::dump_config(&merged)?);
        }
        if let Some(path) = &cli.save_config {
            config::save_config(&merged, path)?;
            println!("Configuration saved to {}", path.display());
        }
        return Ok(());
    }

    let mut config = resolve_wallet_service(
        WalletServiceConfig::default(),
        file,
        Some(cli.settings),
        &cli.modes,
    )?;

    if !config.server_root.as_os_str().is_empty() {
        std::env::set_current_dir(&config.server_root).map_err(|source| {
            StartupError::ServerRoot {
                path: config.server_root.clone(),
                source,
            }
        })?;
    }

    if cli.modes.register_service || cli.modes.unregister_service {
        return Err(StartupError::Unsupported(
            "service registration is not supported on this platform",
        )
        .into());
    }

    if cli.modes.generate_container {
        let record = generate_container(&config.container_file, &cli.modes)?;
        println!(
            "Wallet container {} created ({:?})",
            config.container_file.display(),
            record.creation
        );
        return Ok(());
    }

    check_container_exists(&config.container_file)?;
    let credential = seal_rpc_password(&mut config);

    let _log_guard = init_logging(
        service_level(config.log_level),
        &resolve_log_path(&config.log_file, &exe),
    )?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        container = %config.container_file.display(),
        daemon = %format!("{}:{}", config.daemon_address, config.daemon_port),
        "Starting wallet service"
    );

    let service = WalletService::start(&config, credential, true)?;
    let cause = service.run()?;
    tracing::info!(?cause, "Shutdown complete");
    Ok(())
}

//! `noded`: blockchain node daemon.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use node_launcher::config::{
    self, cli, layer, load_overrides, resolve_daemon, DaemonCli, DaemonConfig, DaemonOverrides,
};
use node_launcher::observability::logging::{daemon_level, init_logging, resolve_log_path};
use node_launcher::{Error, Node, NodeOptions};

fn main() -> ExitCode {
    let cli = match DaemonCli::try_parse() {
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
                tracing::error!(error = %e, "Daemon failed to start");
            } else {
                tracing::error!(error = %e, "Daemon exited with an error");
            }
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: DaemonCli) -> Result<(), Error> {
    if cli.os_version {
        println!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        println!("OS: {}", cli::os_version());
        return Ok(());
    }

    let exe = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("noded"));
    let defaults = DaemonConfig::for_executable(&exe);

    let file = cli
        .config_file
        .as_deref()
        .map(load_overrides::<DaemonOverrides>)
        .transpose()?;

    if cli.dump_config || cli.save_config.is_some() {
        let merged = layer(defaults, file, Some(cli.settings));
        if cli.dump_config {
            println!("{}", config::dump_config(&merged)?);
        }
        if let Some(path) = &cli.save_config {
            config::save_config(&merged, path)?;
            println!("Configuration saved to {}", path.display());
        }
        return Ok(());
    }

    let config = resolve_daemon(defaults, file, Some(cli.settings))?;

    let _log_guard = init_logging(
        daemon_level(config.log_level),
        &resolve_log_path(&config.log_file, &exe),
    )?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        os = %cli::os_version(),
        data_dir = %config.data_dir.display(),
        "Starting node daemon"
    );

    let node = Node::start(Arc::new(config), NodeOptions::default())?;
    let report = node.run()?;
    tracing::info!(cause = ?report.cause, steps = report.steps.len(), "Shutdown complete");
    Ok(())
}

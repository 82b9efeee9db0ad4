//! Tiered configuration resolution.
//!
//! # Responsibilities
//! - Layer Default ← File ← Cli, field by field
//! - Hand the merged record to validation
//!
//! # Design Decisions
//! - A tier only wins a field it explicitly set (`Some`); it never writes
//!   its own fallback over a lower tier
//! - List fields are replaced wholesale, never concatenated
//! - Pure: no I/O, no globals

use crate::config::schema::{
    DaemonConfig, DaemonOverrides, WalletModes, WalletServiceConfig, WalletServiceOverrides,
};
use crate::config::validation::{validate_daemon, validate_wallet_service};
use crate::error::ConfigError;

/// Where a resolved value came from, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SettingSource {
    Default,
    File,
    Cli,
}

/// A partial record that can be laid over a complete one.
pub trait Overlay {
    type Target;

    /// Copy every explicitly supplied field onto `target`.
    fn apply_to(self, target: &mut Self::Target);
}

macro_rules! overlay_fields {
    ($source:ident => $target:ident: $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $source.$field {
                $target.$field = value;
            }
        )+
    };
}

impl Overlay for DaemonOverrides {
    type Target = DaemonConfig;

    fn apply_to(self, target: &mut DaemonConfig) {
        let source = self;
        overlay_fields!(source => target:
            data_dir,
            load_checkpoints,
            log_file,
            log_level,
            no_console,
            db_max_open_files,
            db_read_buffer_size,
            db_threads,
            db_write_buffer_size,
            allow_local_ip,
            hide_my_port,
            p2p_bind_ip,
            p2p_bind_port,
            p2p_external_port,
            rpc_bind_ip,
            rpc_bind_port,
            exclusive_nodes,
            peers,
            priority_nodes,
            seed_nodes,
            enable_block_explorer,
            enable_cors,
            fee_address,
            fee_amount,
        );
    }
}

impl Overlay for WalletServiceOverrides {
    type Target = WalletServiceConfig;

    fn apply_to(self, target: &mut WalletServiceConfig) {
        let source = self;
        overlay_fields!(source => target:
            daemon_address,
            daemon_port,
            log_file,
            log_level,
            container_file,
            container_password,
            bind_address,
            bind_port,
            enable_cors,
            legacy_security,
            rpc_password,
            server_root,
        );
    }
}

/// Merge the tiers without validating.
///
/// Used directly by `--dump-config` / `--save-config`, which report what the
/// tiers produce even when it would not validate.
pub fn layer<O: Overlay>(defaults: O::Target, file: Option<O>, cli: Option<O>) -> O::Target {
    let mut resolved = defaults;
    for (source, tier) in [(SettingSource::File, file), (SettingSource::Cli, cli)] {
        if let Some(tier) = tier {
            tracing::trace!(?source, "Applying configuration tier");
            tier.apply_to(&mut resolved);
        }
    }
    resolved
}

/// Resolve and validate a daemon configuration.
pub fn resolve_daemon(
    defaults: DaemonConfig,
    file: Option<DaemonOverrides>,
    cli: Option<DaemonOverrides>,
) -> Result<DaemonConfig, ConfigError> {
    let config = layer(defaults, file, cli);
    validate_daemon(&config)?;
    Ok(config)
}

/// Resolve and validate a wallet-service configuration.
///
/// The RPC password is still plaintext in the result; it is sealed into a
/// secret by [`crate::security::secret::seal_rpc_password`].
pub fn resolve_wallet_service(
    defaults: WalletServiceConfig,
    file: Option<WalletServiceOverrides>,
    cli: Option<WalletServiceOverrides>,
    modes: &WalletModes,
) -> Result<WalletServiceConfig, ConfigError> {
    let config = layer(defaults, file, cli);
    validate_wallet_service(&config, modes)?;
    Ok(config)
}

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde and clap handle syntactic)
//! - Validate value ranges (log level, database knobs)
//! - Check required fields and cross-field rules
//!
//! # Design Decisions
//! - Rules run in a fixed order: exclusive modes, ranges, required fields,
//!   cross-field checks
//! - Fail fast: the first broken rule is returned
//! - Validation is a pure function of the resolved record

use std::net::{IpAddr, SocketAddr};

use crate::config::schema::{
    DaemonConfig, WalletModes, WalletServiceConfig, DAEMON_MAX_LOG_LEVEL, SERVICE_MAX_LOG_LEVEL,
};
use crate::error::{ConfigError, CredentialError, ValidationError};

/// Validate a merged daemon configuration.
pub fn validate_daemon(config: &DaemonConfig) -> Result<(), ConfigError> {
    // Ranges
    check_log_level(config.log_level, DAEMON_MAX_LOG_LEVEL)?;
    for (field, value) in [
        ("db-max-open-files", config.db_max_open_files),
        ("db-read-buffer-size", config.db_read_buffer_size),
        ("db-threads", config.db_threads),
        ("db-write-buffer-size", config.db_write_buffer_size),
    ] {
        if value == 0 {
            return Err(ValidationError::OutOfRange {
                field,
                value: 0,
                min: 1,
                max: i64::from(u32::MAX),
            }
            .into());
        }
    }

    // Required
    if config.data_dir.as_os_str().is_empty() {
        return Err(ValidationError::MissingField("data-dir").into());
    }

    // Cross-field
    check_ip("p2p-bind-ip", &config.p2p_bind_ip)?;
    check_ip("rpc-bind-ip", &config.rpc_bind_ip)?;
    for (field, entries) in [
        ("add-exclusive-node", &config.exclusive_nodes),
        ("add-peer", &config.peers),
        ("add-priority-node", &config.priority_nodes),
        ("seed-node", &config.seed_nodes),
    ] {
        for entry in entries {
            check_socket_addr(field, entry)?;
        }
    }
    if config.fee_amount > 0 && config.fee_address.is_empty() {
        return Err(ValidationError::RequiresMode {
            given: "fee-amount",
            required: "fee-address",
        }
        .into());
    }

    Ok(())
}

/// Validate a merged wallet-service configuration against its run modes.
pub fn validate_wallet_service(
    config: &WalletServiceConfig,
    modes: &WalletModes,
) -> Result<(), ConfigError> {
    // Exclusive modes
    if modes.register_service && modes.unregister_service {
        return Err(ValidationError::ConflictingModes {
            first: "register-service",
            second: "unregister-service",
        }
        .into());
    }

    // Ranges
    check_log_level(config.log_level, SERVICE_MAX_LOG_LEVEL)?;

    // Required
    if config.container_file.as_os_str().is_empty() {
        return Err(ValidationError::MissingField("container-file").into());
    }

    // Cross-field
    if modes.has_keys() && !modes.generate_container {
        let given = if modes.view_key.as_deref().is_some_and(|k| !k.is_empty()) {
            "view-key"
        } else {
            "spend-key"
        };
        return Err(ValidationError::RequiresMode {
            given,
            required: "generate-container",
        }
        .into());
    }
    if modes.has_seed() && !modes.generate_container {
        return Err(ValidationError::RequiresMode {
            given: "mnemonic-seed",
            required: "generate-container",
        }
        .into());
    }
    if modes.has_seed() && modes.has_keys() {
        return Err(ValidationError::ConflictingImport.into());
    }
    if modes.has_keys() {
        let view = modes.view_key.as_deref().unwrap_or_default();
        let spend = modes.spend_key.as_deref().unwrap_or_default();
        if view.is_empty() || spend.is_empty() {
            return Err(ValidationError::IncompleteKeyPair.into());
        }
    }
    check_ip("bind-address", &config.bind_address)?;

    // A new container is created and the process exits; no RPC is served.
    if modes.generate_container {
        return Ok(());
    }

    match (config.rpc_password.is_empty(), config.legacy_security) {
        (true, false) => Err(CredentialError::MissingCredential.into()),
        (false, true) => Err(CredentialError::ConflictingCredential.into()),
        _ => Ok(()),
    }
}

fn check_log_level(level: u8, max: u8) -> Result<(), ValidationError> {
    if level > max {
        return Err(ValidationError::OutOfRange {
            field: "log-level",
            value: i64::from(level),
            min: 0,
            max: i64::from(max),
        });
    }
    Ok(())
}

fn check_ip(field: &'static str, value: &str) -> Result<(), ValidationError> {
    value
        .parse::<IpAddr>()
        .map(|_| ())
        .map_err(|e| ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn check_socket_addr(field: &'static str, value: &str) -> Result<(), ValidationError> {
    value
        .parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|e| ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

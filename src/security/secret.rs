//! RPC credential derivation.
//!
//! # Responsibilities
//! - Derive a fixed-length secret from the plaintext RPC password
//! - Erase the plaintext from the resolved configuration
//! - Compare presented credentials against the secret
//!
//! # Design Decisions
//! - One-way: SHA-256, no decode path, no way to print the secret
//! - Comparison runs over every byte regardless of where a mismatch is
//! - Secret bytes are zeroized on drop

use std::fmt;

use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::config::schema::WalletServiceConfig;

/// Output of [`derive`]. Only ever compared, never shown.
#[derive(Clone, PartialEq, Eq)]
pub struct FixedSecret([u8; 32]);

impl FixedSecret {
    /// Whether `candidate` derives to this secret.
    pub fn matches(&self, candidate: &str) -> bool {
        let other = derive(candidate);
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for FixedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FixedSecret(<redacted>)")
    }
}

impl Drop for FixedSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

pub fn derive(plaintext: &str) -> FixedSecret {
    FixedSecret(Sha256::digest(plaintext.as_bytes()).into())
}

/// How the RPC surface authenticates callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcCredential {
    /// Legacy mode: no password.
    Open,
    Secret(FixedSecret),
}

impl RpcCredential {
    pub fn verify(&self, presented: Option<&str>) -> bool {
        match self {
            RpcCredential::Open => true,
            RpcCredential::Secret(secret) => presented.is_some_and(|p| secret.matches(p)),
        }
    }
}

/// Replace the plaintext RPC password with its derived secret.
///
/// The password field is wiped and left empty whatever the mode, so later
/// dumps or saves of `config` never contain it.
pub fn seal_rpc_password(config: &mut WalletServiceConfig) -> RpcCredential {
    let credential = if config.legacy_security || config.rpc_password.is_empty() {
        RpcCredential::Open
    } else {
        RpcCredential::Secret(derive(&config.rpc_password))
    };
    config.rpc_password.zeroize();
    credential
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_deterministic() {
        assert_eq!(derive("correct horse"), derive("correct horse"));
        assert_ne!(derive("correct horse"), derive("battery staple"));
    }

    #[test]
    fn test_matches() {
        let secret = derive("pw");
        assert!(secret.matches("pw"));
        assert!(!secret.matches("pw "));
        assert!(!secret.matches(""));
    }

    #[test]
    fn test_seal_wipes_plaintext() {
        let mut config = WalletServiceConfig {
            rpc_password: "s3cret-value".into(),
            ..Default::default()
        };
        let credential = seal_rpc_password(&mut config);

        assert!(config.rpc_password.is_empty());
        let dumped = serde_json::to_string(&config).unwrap();
        assert!(!dumped.contains("s3cret-value"));
        assert!(credential.verify(Some("s3cret-value")));
        assert!(!credential.verify(None));
    }

    #[test]
    fn test_legacy_mode_is_open() {
        let mut config = WalletServiceConfig {
            legacy_security: true,
            ..Default::default()
        };
        let credential = seal_rpc_password(&mut config);
        assert_eq!(credential, RpcCredential::Open);
        assert!(credential.verify(None));
    }

    #[test]
    fn test_debug_hides_bytes() {
        let rendered = format!("{:?}", derive("pw"));
        assert_eq!(rendered, "FixedSecret(<redacted>)");
    }
}

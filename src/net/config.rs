//! Network layer configuration assembled from the daemon settings.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::config::schema::DaemonConfig;
use crate::error::StartupError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetNodeConfig {
    pub bind: SocketAddr,

    /// NAT-forwarded port advertised instead of the bound one.
    pub external_port: Option<u16>,

    pub allow_local_ip: bool,
    pub hide_my_port: bool,

    /// When non-empty, the only peers we talk to.
    pub exclusive_nodes: Vec<SocketAddr>,
    pub peers: Vec<SocketAddr>,
    pub priority_nodes: Vec<SocketAddr>,
    pub seed_nodes: Vec<SocketAddr>,

    /// Where the peer list is persisted.
    pub data_dir: PathBuf,
}

fn parse_peers(field: &'static str, entries: &[String]) -> Result<Vec<SocketAddr>, StartupError> {
    entries
        .iter()
        .map(|entry| {
            entry.parse().map_err(|_| StartupError::Address {
                field,
                value: entry.clone(),
            })
        })
        .collect()
}

impl NetNodeConfig {
    pub fn from_daemon(config: &DaemonConfig) -> Result<Self, StartupError> {
        let ip: IpAddr = config
            .p2p_bind_ip
            .parse()
            .map_err(|_| StartupError::Address {
                field: "p2p-bind-ip",
                value: config.p2p_bind_ip.clone(),
            })?;

        Ok(Self {
            bind: SocketAddr::new(ip, config.p2p_bind_port),
            external_port: (config.p2p_external_port != 0).then_some(config.p2p_external_port),
            allow_local_ip: config.allow_local_ip,
            hide_my_port: config.hide_my_port,
            exclusive_nodes: parse_peers("add-exclusive-node", &config.exclusive_nodes)?,
            peers: parse_peers("add-peer", &config.peers)?,
            priority_nodes: parse_peers("add-priority-node", &config.priority_nodes)?,
            seed_nodes: parse_peers("seed-node", &config.seed_nodes)?,
            data_dir: config.data_dir.clone(),
        })
    }

    /// Port announced to other peers, if any.
    pub fn advertised_port(&self, bound_port: u16) -> Option<u16> {
        if self.hide_my_port {
            None
        } else {
            Some(self.external_port.unwrap_or(bound_port))
        }
    }

    /// Peers we dial on startup. Exclusive nodes replace everything else.
    pub fn outbound_targets(&self) -> Vec<SocketAddr> {
        if !self.exclusive_nodes.is_empty() {
            return self.exclusive_nodes.clone();
        }
        let mut targets = self.priority_nodes.clone();
        for addr in self.peers.iter().chain(&self.seed_nodes) {
            if !targets.contains(addr) {
                targets.push(*addr);
            }
        }
        targets
    }

    /// Whether an inbound connection from `addr` is acceptable.
    pub fn admits(&self, addr: &SocketAddr) -> bool {
        self.exclusive_nodes.is_empty() || self.exclusive_nodes.iter().any(|n| n.ip() == addr.ip())
    }
}

/// Loopback, private, link-local or unspecified addresses.
pub fn is_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified(),
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_defaults() {
        let config = NetNodeConfig::from_daemon(&DaemonConfig::default()).unwrap();
        assert_eq!(config.bind, "0.0.0.0:11897".parse().unwrap());
        assert_eq!(config.external_port, None);
        assert_eq!(config.advertised_port(11897), Some(11897));
    }

    #[test]
    fn test_hide_my_port_and_external_port() {
        let daemon = DaemonConfig {
            p2p_external_port: 40000,
            ..Default::default()
        };
        let config = NetNodeConfig::from_daemon(&daemon).unwrap();
        assert_eq!(config.advertised_port(11897), Some(40000));

        let hidden = NetNodeConfig {
            hide_my_port: true,
            ..config
        };
        assert_eq!(hidden.advertised_port(11897), None);
    }

    #[test]
    fn test_exclusive_nodes_take_over() {
        let daemon = DaemonConfig {
            peers: vec!["10.0.0.1:1".into()],
            exclusive_nodes: vec!["10.0.0.9:9".into()],
            ..Default::default()
        };
        let config = NetNodeConfig::from_daemon(&daemon).unwrap();
        assert_eq!(config.outbound_targets(), vec!["10.0.0.9:9".parse().unwrap()]);
        assert!(config.admits(&"10.0.0.9:5555".parse().unwrap()));
        assert!(!config.admits(&"10.0.0.1:1".parse().unwrap()));
    }

    #[test]
    fn test_bad_peer_is_startup_error() {
        let daemon = DaemonConfig {
            seed_nodes: vec!["seed.example".into()],
            ..Default::default()
        };
        assert!(matches!(
            NetNodeConfig::from_daemon(&daemon),
            Err(StartupError::Address { field: "seed-node", .. })
        ));
    }

    #[test]
    fn test_local_addresses() {
        assert!(is_local(&"127.0.0.1".parse().unwrap()));
        assert!(is_local(&"192.168.1.4".parse().unwrap()));
        assert!(!is_local(&"8.8.8.8".parse().unwrap()));
    }
}

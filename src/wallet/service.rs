//! Wallet-service runner.
//!
//! Starts the RPC surface on its own thread, installs the signal bridge and
//! waits for a stop request, then tears both down in reverse order.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::config::schema::WalletServiceConfig;
use crate::error::{Error, StartupError};
use crate::lifecycle::{LifecycleState, Shutdown, SignalBridge, StateCell, StopCause};
use crate::rpc::{self, RpcServer};
use crate::security::RpcCredential;

pub struct WalletService {
    signals: Option<SignalBridge>,
    rpc: RpcServer,
    state: Arc<StateCell>,
    shutdown: Shutdown,
}

impl WalletService {
    /// `config` must already have its RPC password sealed.
    pub fn start(
        config: &WalletServiceConfig,
        credential: RpcCredential,
        install_signals: bool,
    ) -> Result<Self, Error> {
        let state = Arc::new(StateCell::new());
        state.advance(LifecycleState::Initializing)?;
        let shutdown = Shutdown::new();

        let ip: IpAddr = config.bind_address.parse().map_err(|_| StartupError::Address {
            field: "bind-address",
            value: config.bind_address.clone(),
        })?;
        if credential == RpcCredential::Open {
            tracing::warn!("RPC legacy security is enabled; the RPC surface accepts any caller");
        }

        let rpc = RpcServer::start(
            "wallet",
            SocketAddr::new(ip, config.bind_port),
            rpc::wallet::router(config, Arc::new(credential)),
        )?;
        let signals = if install_signals {
            Some(SignalBridge::install(shutdown.clone())?)
        } else {
            None
        };

        state.advance(LifecycleState::Running)?;
        tracing::info!(address = %rpc.local_addr(), "Wallet service started");
        Ok(Self {
            signals,
            rpc,
            state,
            shutdown,
        })
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn rpc_addr(&self) -> SocketAddr {
        self.rpc.local_addr()
    }

    /// Block until a stop is requested, then stop.
    pub fn run(mut self) -> Result<Option<StopCause>, Error> {
        let waiter = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StartupError::Runtime("wallet", e))?;
        waiter.block_on(self.shutdown.wait());

        self.state.advance(LifecycleState::Draining)?;
        if let Some(mut signals) = self.signals.take() {
            signals.uninstall();
        }
        let stopped = self.rpc.stop();
        self.state.advance(LifecycleState::Stopped)?;
        stopped?;

        tracing::info!(cause = ?self.shutdown.cause(), "Wallet service stopped");
        Ok(self.shutdown.cause())
    }
}

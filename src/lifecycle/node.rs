//! Node orchestration: ordered startup, the run loop, ordered shutdown.
//!
//! # Responsibilities
//! - Construct every subsystem in dependency order
//! - Hand the controlling thread to the p2p event loop
//! - Tear everything down in exact reverse order, once
//!
//! # Design Decisions
//! - Fail fast on startup: the first error aborts, and already-built
//!   subsystems are cleaned up by their own `Drop` in reverse order
//! - Every shutdown step runs even when an earlier one fails; the first
//!   failure becomes the final result
//! - `Shutdown::request_stop` is the only way to end the run loop

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::config::schema::DaemonConfig;
use crate::console::{Console, ConsoleContext, ConsoleIo};
use crate::engine::{ChainEngine, CheckpointSource, Checkpoints};
use crate::error::{Error, RuntimeFault, StartupError};
use crate::lifecycle::shutdown::{Shutdown, StopCause};
use crate::lifecycle::signals::SignalBridge;
use crate::lifecycle::state::{LifecycleState, StateCell};
use crate::net::{NetNodeConfig, P2pNode, ProtocolHandler};
use crate::rpc::{self, daemon::DaemonRpcState, RpcServer};
use crate::storage::{
    ensure_schema, open_store, prepare_data_dir, DatabaseConfig, FileStore, Provisioned,
    SCHEMA_VERSION,
};

/// Process-level knobs that are not part of the daemon configuration.
pub struct NodeOptions {
    pub install_signals: bool,

    /// Console streams; `None` means stdin/stdout. Ignored with `no-console`.
    pub console_io: Option<ConsoleIo>,

    pub schema_version: u32,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            install_signals: true,
            console_io: None,
            schema_version: SCHEMA_VERSION,
        }
    }
}

/// One step of the shutdown sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownStep {
    RemoveSignals,
    StopConsole,
    StopRpc,
    DeinitNetwork,
    DetachProtocol,
    PersistEngine,
    ReleaseStore,
}

/// What happened during shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub cause: Option<StopCause>,
    pub steps: Vec<ShutdownStep>,
}

/// A started node.
///
/// Field order is the shutdown order, so dropping a `Node` that never ran
/// still releases everything in reverse construction order.
pub struct Node {
    signals: Option<SignalBridge>,
    console: Option<Console>,
    rpc: RpcServer,
    p2p: P2pNode,
    protocol: Arc<ProtocolHandler>,
    engine: Arc<ChainEngine>,
    provisioned: Provisioned,
    state: Arc<StateCell>,
    shutdown: Shutdown,
}

impl Node {
    /// Run the startup sequence. On success the node is `Running`.
    pub fn start(config: Arc<DaemonConfig>, options: NodeOptions) -> Result<Self, Error> {
        let state = Arc::new(StateCell::new());
        let shutdown = Shutdown::new();
        state.advance(LifecycleState::Initializing)?;

        let result = Self::build(&config, options, Arc::clone(&state), shutdown);
        if result.is_err() {
            let _ = state.advance(LifecycleState::Stopped);
        }
        result
    }

    fn build(
        config: &DaemonConfig,
        options: NodeOptions,
        state: Arc<StateCell>,
        shutdown: Shutdown,
    ) -> Result<Self, Error> {
        // Checkpoints
        let source = CheckpointSource::from_setting(&config.load_checkpoints);
        let checkpoints = match (Checkpoints::load(&source), &source) {
            (Ok(checkpoints), _) => checkpoints,
            (Err(e), CheckpointSource::File(path)) => {
                return Err(StartupError::Checkpoints {
                    path: path.clone(),
                    reason: e.to_string(),
                }
                .into());
            }
            (Err(e), _) => {
                tracing::warn!(error = %e, "Built-in checkpoints unusable, continuing without");
                Checkpoints::default()
            }
        };

        // Network configuration
        let net_config = NetNodeConfig::from_daemon(config)?;

        // Store
        let db_config = DatabaseConfig::from_daemon(config);
        prepare_data_dir(&db_config)?;
        let guard = open_store::<FileStore>(&db_config)?;
        let (provisioned, guard) = ensure_schema(guard, &db_config, options.schema_version)?;

        // Engine
        let engine = Arc::new(ChainEngine::new(guard, checkpoints));
        engine.load().map_err(StartupError::Engine)?;

        // Protocol handler + network layer
        let protocol = Arc::new(ProtocolHandler::new(Arc::clone(&engine)));
        for addr in net_config
            .peers
            .iter()
            .chain(&net_config.priority_nodes)
            .chain(&net_config.exclusive_nodes)
        {
            protocol.remember_peer(*addr);
        }
        let p2p = P2pNode::init(net_config, Arc::clone(&protocol))?;
        protocol.attach(p2p.endpoint());

        // Console
        let console = if config.no_console {
            None
        } else {
            let io = options.console_io.unwrap_or_else(ConsoleIo::stdio);
            let ctx = ConsoleContext {
                engine: Arc::clone(&engine),
                protocol: Arc::clone(&protocol),
                state: Arc::clone(&state),
                shutdown: shutdown.clone(),
            };
            Some(Console::start(io, ctx)?)
        };

        // RPC
        let rpc_ip: IpAddr = config.rpc_bind_ip.parse().map_err(|_| StartupError::Address {
            field: "rpc-bind-ip",
            value: config.rpc_bind_ip.clone(),
        })?;
        let rpc_state = DaemonRpcState::new(config, Arc::clone(&engine), Arc::clone(&protocol));
        let rpc = RpcServer::start(
            "daemon",
            SocketAddr::new(rpc_ip, config.rpc_bind_port),
            rpc::daemon::router(rpc_state, &config.enable_cors),
        )?;

        // Signals
        let signals = if options.install_signals {
            Some(SignalBridge::install(shutdown.clone())?)
        } else {
            None
        };

        state.advance(LifecycleState::Running)?;
        tracing::info!(
            p2p = %p2p.local_addr(),
            rpc = %rpc.local_addr(),
            height = engine.height(),
            ?provisioned,
            "Node started"
        );

        Ok(Self {
            signals,
            console,
            rpc,
            p2p,
            protocol,
            engine,
            provisioned,
            state,
            shutdown,
        })
    }

    /// Handle for requesting a stop from other threads.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    pub fn provisioned(&self) -> Provisioned {
        self.provisioned
    }

    pub fn p2p_addr(&self) -> SocketAddr {
        self.p2p.local_addr()
    }

    pub fn rpc_addr(&self) -> SocketAddr {
        self.rpc.local_addr()
    }

    pub fn engine(&self) -> &Arc<ChainEngine> {
        &self.engine
    }

    /// Block on the p2p loop until stopped, then shut down.
    pub fn run(mut self) -> Result<ShutdownReport, Error> {
        let mut first_error: Option<Error> = None;

        if let Err(fault) = self.p2p.run(&self.shutdown) {
            tracing::error!(error = %fault, "P2P event loop failed");
            self.shutdown.request_stop(StopCause::Fault);
            first_error = Some(fault.into());
        }

        self.drain(first_error)
    }

    fn drain(mut self, mut first_error: Option<Error>) -> Result<ShutdownReport, Error> {
        self.state.advance(LifecycleState::Draining)?;
        tracing::info!("Stopping node");

        let mut steps = Vec::with_capacity(7);
        let mut record = |step: ShutdownStep, result: Result<(), RuntimeFault>| {
            steps.push(step);
            if let Err(fault) = result {
                tracing::error!(?step, error = %fault, "Shutdown step failed");
                if first_error.is_none() {
                    first_error = Some(fault.into());
                }
            }
        };

        if let Some(mut signals) = self.signals.take() {
            signals.uninstall();
            record(ShutdownStep::RemoveSignals, Ok(()));
        }
        if let Some(mut console) = self.console.take() {
            record(ShutdownStep::StopConsole, console.stop());
        }
        record(ShutdownStep::StopRpc, self.rpc.stop());
        record(ShutdownStep::DeinitNetwork, self.p2p.deinit());
        self.protocol.detach();
        record(ShutdownStep::DetachProtocol, Ok(()));
        record(
            ShutdownStep::PersistEngine,
            self.engine.save().map_err(RuntimeFault::Persist),
        );
        record(
            ShutdownStep::ReleaseStore,
            self.engine.release_store().map_err(RuntimeFault::Release),
        );

        self.state.advance(LifecycleState::Stopped)?;
        let report = ShutdownReport {
            cause: self.shutdown.cause(),
            steps,
        };
        tracing::info!(cause = ?report.cause, "Node stopped");

        match first_error {
            Some(error) => Err(error),
            None => Ok(report),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreError;

    fn config(dir: &std::path::Path) -> Arc<DaemonConfig> {
        Arc::new(DaemonConfig {
            data_dir: dir.to_path_buf(),
            load_checkpoints: String::new(),
            no_console: true,
            p2p_bind_ip: "127.0.0.1".into(),
            p2p_bind_port: 0,
            rpc_bind_ip: "127.0.0.1".into(),
            rpc_bind_port: 0,
            ..Default::default()
        })
    }

    fn options() -> NodeOptions {
        NodeOptions {
            install_signals: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_run_loop_fault_still_drains() {
        let dir = tempfile::tempdir().unwrap();
        let mut node = Node::start(config(dir.path()), options()).unwrap();
        let engine = Arc::clone(node.engine());
        let shutdown = node.shutdown_handle();
        let state = Arc::clone(&node.state);

        // With the listener gone the event loop fails as soon as it starts.
        node.p2p.close_listener();
        let err = node.run().unwrap_err();

        assert!(matches!(err, Error::Runtime(RuntimeFault::Network(_))));
        assert_eq!(shutdown.cause(), Some(StopCause::Fault));
        assert_eq!(state.get(), LifecycleState::Stopped);
        assert!(dir.path().join("p2pstate.json").is_file());
        assert!(matches!(engine.save(), Err(StoreError::Closed)));
    }

    #[test]
    fn test_failed_start_releases_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut bad = (*config(dir.path())).clone();
        bad.rpc_bind_ip = "not-an-ip".into();

        let err = Node::start(Arc::new(bad), options()).err().unwrap();
        assert!(matches!(err, Error::Startup(StartupError::Address { .. })));

        // The store opened during the failed start is closed again.
        let node = Node::start(config(dir.path()), options()).unwrap();
        node.shutdown_handle().request_stop(StopCause::Requested);
        node.run().unwrap();
    }
}

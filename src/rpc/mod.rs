//! RPC surface.
//!
//! # Data Flow
//! ```text
//! RpcServer::start (binds synchronously, startup error on conflict)
//!     → dedicated thread with its own multi-thread runtime
//!     → axum::serve(router) with graceful shutdown on a watch channel
//!
//! Request:
//!     → TraceLayer → CorsLayer → request counter (matched route)
//!     → auth.rs (wallet service only)
//!     → daemon.rs / wallet.rs handlers
//! ```
//!
//! # Design Decisions
//! - Handlers only read shared state; they never drive the lifecycle
//! - `stop` joins the thread, so the next shutdown step starts after the
//!   last in-flight request has finished or the drain deadline has passed
//! - Connections still open at the deadline are dropped and reported as a
//!   fault; a stalled client never blocks the rest of the shutdown

pub mod auth;
pub mod daemon;
pub mod wallet;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::thread::JoinHandle;
use std::time::Duration;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
    Router,
};
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{RuntimeFault, StartupError};
use crate::observability::metrics;

const WORKER_THREADS: usize = 2;

/// How long in-flight requests get once a stop was requested.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// An HTTP server running on its own thread.
pub struct RpcServer {
    service: &'static str,
    local_addr: SocketAddr,
    stop: watch::Sender<bool>,
    thread: Option<JoinHandle<Result<(), RuntimeFault>>>,
}

impl RpcServer {
    pub fn start(service: &'static str, addr: SocketAddr, router: Router) -> Result<Self, StartupError> {
        let bind_err = |source| StartupError::Bind {
            service,
            address: addr.to_string(),
            source,
        };

        let listener = std::net::TcpListener::bind(addr).map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(WORKER_THREADS)
            .thread_name(format!("{service}-rpc-worker"))
            .enable_all()
            .build()
            .map_err(|e| StartupError::Runtime(service, e))?;

        // The channel keeps its value, so a stop that races startup is not lost.
        let (stop, stopped) = watch::channel(false);
        let thread = std::thread::Builder::new()
            .name(format!("{service}-rpc"))
            .spawn(move || {
                let result = runtime.block_on(serve(service, listener, router, stopped));
                runtime.shutdown_background();
                result
            })
            .map_err(|e| StartupError::Thread("rpc", e))?;

        tracing::info!(service, address = %local_addr, "RPC server listening");
        Ok(Self {
            service,
            local_addr,
            stop,
            thread: Some(thread),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, give in-flight requests [`DRAIN_TIMEOUT`] to finish
    /// and join the thread.
    pub fn stop(&mut self) -> Result<(), RuntimeFault> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };

        self.stop.send_replace(true);
        let result = thread
            .join()
            .unwrap_or(Err(RuntimeFault::ThreadPanicked("rpc")));
        tracing::info!(service = self.service, "RPC server stopped");
        result
    }
}

impl Drop for RpcServer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(service = self.service, error = %e, "RPC server did not stop cleanly");
        }
    }
}

async fn serve(
    service: &'static str,
    listener: std::net::TcpListener,
    router: Router,
    stopped: watch::Receiver<bool>,
) -> Result<(), RuntimeFault> {
    let listener = tokio::net::TcpListener::from_std(listener).map_err(RuntimeFault::Network)?;

    let mut graceful = stopped.clone();
    let server = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = graceful.wait_for(|stop| *stop).await;
        })
        .into_future();

    let mut deadline = stopped;
    tokio::select! {
        result = server => result.map_err(RuntimeFault::Network),
        _ = async {
            let _ = deadline.wait_for(|stop| *stop).await;
            tokio::time::sleep(DRAIN_TIMEOUT).await;
        } => {
            tracing::warn!(service, timeout = ?DRAIN_TIMEOUT, "RPC drain deadline passed, dropping connections");
            Err(RuntimeFault::DrainTimeout(service))
        }
    }
}

/// CORS for the configured origins. `*` allows any origin.
pub fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }
    if origins.iter().any(|o| o == "*") {
        return Some(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
    }

    let values: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(values))
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

/// Wrap a router with the layers every RPC service shares.
pub(crate) fn with_common_layers(service: &'static str, router: Router, cors: &[String]) -> Router {
    let router = router.layer(axum::middleware::from_fn(move |req: Request<Body>, next: Next| {
        count_requests(service, req, next)
    }));
    let router = match cors_layer(cors) {
        Some(layer) => router.layer(layer),
        None => router,
    };
    router.layer(TraceLayer::new_for_http())
}

/// Route template for metric labels, so path parameters never become labels.
fn route_label(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned())
}

async fn count_requests(service: &'static str, request: Request<Body>, next: Next) -> Response {
    let route = route_label(&request);
    let response = next.run(request).await;
    metrics::record_rpc_request(service, &route, response.status().as_u16());
    response
}

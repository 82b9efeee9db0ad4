//! End-to-end startup, run and shutdown of the node orchestrator.

use std::sync::Arc;
use std::time::Duration;

use node_launcher::error::{DirectoryError, Error, RuntimeFault};
use node_launcher::lifecycle::{LifecycleState, Node, ShutdownStep};
use node_launcher::storage::{Provisioned, SCHEMA_VERSION};
use node_launcher::StopCause;

mod common;

const ALL_STEPS: [ShutdownStep; 5] = [
    ShutdownStep::StopRpc,
    ShutdownStep::DeinitNetwork,
    ShutdownStep::DetachProtocol,
    ShutdownStep::PersistEngine,
    ShutdownStep::ReleaseStore,
];

#[test]
fn test_stop_request_runs_shutdown_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::daemon_config(dir.path());

    let (started, handle) =
        common::spawn_node(config, common::node_options(SCHEMA_VERSION)).unwrap();
    assert_eq!(started.provisioned, Provisioned::Ready);

    assert!(started.shutdown.request_stop(StopCause::Requested));
    let report = handle.join().unwrap().unwrap();

    assert_eq!(report.cause, Some(StopCause::Requested));
    // Signals were not installed and the console is disabled.
    assert_eq!(report.steps, ALL_STEPS.to_vec());

    // The peer list and engine state were persisted into the data dir.
    assert!(dir.path().join("p2pstate.json").is_file());
    assert!(dir.path().join("DB").is_dir());
}

#[test]
fn test_concurrent_stop_requests_have_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let (started, handle) = common::spawn_node(
        common::daemon_config(dir.path()),
        common::node_options(SCHEMA_VERSION),
    )
    .unwrap();

    let winners: usize = (0..8)
        .map(|_| {
            let shutdown = started.shutdown.clone();
            std::thread::spawn(move || shutdown.request_stop(StopCause::Requested))
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().unwrap() as usize)
        .sum();
    assert_eq!(winners, 1);

    let report = handle.join().unwrap().unwrap();
    assert_eq!(report.steps.len(), ALL_STEPS.len());
}

#[test]
fn test_schema_bump_rebuilds_store() {
    let dir = tempfile::tempdir().unwrap();

    let (started, handle) =
        common::spawn_node(common::daemon_config(dir.path()), common::node_options(1)).unwrap();
    assert_eq!(started.provisioned, Provisioned::Ready);
    started.shutdown.request_stop(StopCause::Requested);
    handle.join().unwrap().unwrap();

    let (started, handle) =
        common::spawn_node(common::daemon_config(dir.path()), common::node_options(2)).unwrap();
    assert_eq!(started.provisioned, Provisioned::Rebuilt);
    started.shutdown.request_stop(StopCause::Requested);
    handle.join().unwrap().unwrap();

    let (started, handle) =
        common::spawn_node(common::daemon_config(dir.path()), common::node_options(2)).unwrap();
    assert_eq!(started.provisioned, Provisioned::Ready);
    started.shutdown.request_stop(StopCause::Requested);
    handle.join().unwrap().unwrap();
}

#[test]
fn test_explicit_missing_data_dir_fails_before_startup() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nowhere");
    let config = common::daemon_config(&missing);

    let err = Node::start(Arc::new(config), common::node_options(SCHEMA_VERSION))
        .err()
        .expect("start must fail");
    assert!(matches!(err, Error::Directory(DirectoryError::Missing(_))));
    assert!(err.is_preflight());
    assert!(!missing.exists());
}

#[test]
fn test_port_conflict_is_startup_error() {
    let dir = tempfile::tempdir().unwrap();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = common::daemon_config(dir.path());
    config.rpc_bind_port = taken.local_addr().unwrap().port();

    let err = Node::start(Arc::new(config), common::node_options(SCHEMA_VERSION))
        .err()
        .expect("start must fail");
    assert!(!err.is_preflight());
    assert!(err.to_string().contains("daemon"));

    // The store opened before the RPC bind failed was closed again, so the
    // same data directory can be started right away.
    drop(taken);
    let (started, handle) = common::spawn_node(
        common::daemon_config(dir.path()),
        common::node_options(SCHEMA_VERSION),
    )
    .unwrap();
    started.shutdown.request_stop(StopCause::Requested);
    handle.join().unwrap().unwrap();
}

#[test]
fn test_failing_shutdown_step_does_not_skip_later_steps() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the peer state file goes makes the network deinit fail.
    std::fs::create_dir(dir.path().join("p2pstate.json")).unwrap();

    let (started, handle) = common::spawn_node(
        common::daemon_config(dir.path()),
        common::node_options(SCHEMA_VERSION),
    )
    .unwrap();
    started.shutdown.request_stop(StopCause::Requested);

    let err = handle.join().unwrap().unwrap_err();
    assert!(matches!(err, Error::Runtime(RuntimeFault::Network(_))));

    // Persist and release still ran after the failed step.
    let data = std::fs::read_to_string(dir.path().join("DB").join("data.json")).unwrap();
    assert!(data.contains("top-height"));
}

#[test]
fn test_stalled_rpc_client_cannot_hold_shutdown() {
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    let (started, handle) = common::spawn_node(
        common::daemon_config(dir.path()),
        common::node_options(SCHEMA_VERSION),
    )
    .unwrap();

    // Headers that never finish keep the connection in flight.
    let mut client = std::net::TcpStream::connect(started.rpc_addr).unwrap();
    client.write_all(b"GET /info HTTP/1.1\r\nHost: x\r\n").unwrap();
    std::thread::sleep(Duration::from_millis(200));

    started.shutdown.request_stop(StopCause::Requested);
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(handle.join());
    });
    let result = rx
        .recv_timeout(Duration::from_secs(15))
        .expect("shutdown must not wait on a stalled client")
        .unwrap();

    assert!(matches!(
        result,
        Err(Error::Runtime(RuntimeFault::DrainTimeout("daemon")))
    ));
    // Later steps still ran.
    assert!(dir.path().join("p2pstate.json").is_file());
    drop(client);
}

#[test]
fn test_started_node_reports_running() {
    let dir = tempfile::tempdir().unwrap();
    let node = Node::start(
        Arc::new(common::daemon_config(dir.path())),
        common::node_options(SCHEMA_VERSION),
    )
    .unwrap();
    assert_eq!(node.state(), LifecycleState::Running);
    assert_eq!(node.engine().height(), 0);
    assert_ne!(node.p2p_addr().port(), 0);
    drop(node);
}

#[tokio::test]
async fn test_rpc_serves_height_and_fee() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::daemon_config(dir.path());
    config.fee_address = "fee-wallet".into();
    config.fee_amount = 25;

    let (started, handle) =
        common::spawn_node(config, common::node_options(SCHEMA_VERSION)).unwrap();

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let base = format!("http://{}", started.rpc_addr);

    let height: serde_json::Value = client
        .get(format!("{base}/height"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(height["height"], 0);
    assert_eq!(height["status"], "OK");

    let fee: serde_json::Value = client
        .get(format!("{base}/fee"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fee["address"], "fee-wallet");
    assert_eq!(fee["amount"], 25);

    let info: serde_json::Value = client
        .get(format!("{base}/info"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["checkpoints"], 0);
    assert_eq!(info["p2p_port"], started.p2p_addr.port());

    let _peer = tokio::net::TcpStream::connect(started.p2p_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let peers: serde_json::Value = client
        .get(format!("{base}/peers"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(peers["peers"][0]["direction"], "inbound");
    assert_eq!(peers["peers"][0]["connected_secs"], 0);

    started.shutdown.request_stop(StopCause::Requested);
    let report = tokio::task::spawn_blocking(move || handle.join().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.cause, Some(StopCause::Requested));
}

#[test]
fn test_inbound_peer_is_tracked_until_stop() {
    let dir = tempfile::tempdir().unwrap();
    let (started, handle) = common::spawn_node(
        common::daemon_config(dir.path()),
        common::node_options(SCHEMA_VERSION),
    )
    .unwrap();

    let _peer = std::net::TcpStream::connect(started.p2p_addr).unwrap();
    std::thread::sleep(Duration::from_millis(200));

    started.shutdown.request_stop(StopCause::Requested);
    let report = handle.join().unwrap().unwrap();
    assert!(report.steps.contains(&ShutdownStep::DeinitNetwork));

    // Loopback peers are not persisted without allow-local-ip.
    let state: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("p2pstate.json")).unwrap())
            .unwrap();
    assert_eq!(state["peers"], serde_json::json!([]));
}

#[test]
fn test_explicit_checkpoint_file_must_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::daemon_config(dir.path());
    config.load_checkpoints = dir.path().join("missing.csv").display().to_string();

    let err = Node::start(Arc::new(config), common::node_options(SCHEMA_VERSION))
        .err()
        .expect("start must fail");
    assert!(err.to_string().contains("checkpoints"));
}

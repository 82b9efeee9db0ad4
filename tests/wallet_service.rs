//! Wallet-service front-end: container handling and the guarded RPC surface.

use node_launcher::security::seal_rpc_password;
use node_launcher::wallet::{check_container_exists, generate_container, CreationMode};
use node_launcher::{StopCause, WalletService};

mod common;

#[test]
fn test_generate_then_check_container() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.wallet");
    assert!(check_container_exists(&path).is_err());

    let modes = node_launcher::config::WalletModes {
        generate_container: true,
        mnemonic_seed: Some("one two three".into()),
        ..Default::default()
    };
    let record = generate_container(&path, &modes).unwrap();
    assert_eq!(record.creation, CreationMode::ImportedSeed);
    assert!(!std::fs::read_to_string(&path).unwrap().contains("one two three"));

    check_container_exists(&path).unwrap();
    assert!(generate_container(&path, &modes).is_err());
}

#[tokio::test]
async fn test_rpc_requires_password() {
    let dir = tempfile::tempdir().unwrap();
    let container = dir.path().join("main.wallet");
    let mut config = common::wallet_config(&container, "s3cret");

    let credential = seal_rpc_password(&mut config);
    assert!(config.rpc_password.is_empty());

    let service = WalletService::start(&config, credential, false).unwrap();
    let shutdown = service.shutdown_handle();
    let url = format!("http://{}/status", service.rpc_addr());
    let runner = std::thread::spawn(move || service.run());

    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), 401);

    let res = client.get(&url).bearer_auth("wrong").send().await.unwrap();
    assert_eq!(res.status(), 401);

    let res = client.get(&url).bearer_auth("s3cret").send().await.unwrap();
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "OK");

    shutdown.request_stop(StopCause::Requested);
    let cause = tokio::task::spawn_blocking(move || runner.join().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cause, Some(StopCause::Requested));
}

#[tokio::test]
async fn test_legacy_security_is_open() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::wallet_config(&dir.path().join("main.wallet"), "");
    config.legacy_security = true;

    let credential = seal_rpc_password(&mut config);
    let service = WalletService::start(&config, credential, false).unwrap();
    let shutdown = service.shutdown_handle();
    let url = format!("http://{}/status", service.rpc_addr());
    let runner = std::thread::spawn(move || service.run());

    let res = reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
        .get(&url)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    shutdown.request_stop(StopCause::Requested);
    tokio::task::spawn_blocking(move || runner.join().unwrap())
        .await
        .unwrap()
        .unwrap();
}

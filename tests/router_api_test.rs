use std::net::SocketAddr;

use axum::response::Redirect;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use content_router_engine::api::router_api::{
    current_mode, start_router, stop_router, wait_for_decision,
};
use content_router_engine::engine::publisher::DisplayMode;
use content_router_engine::platform::device::{DeviceIdiom, DeviceProfile};
use content_router_engine::store::file::JsonFileStore;
use content_router_engine::store::traits::KeyValueStore;

async fn start_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/go", get(|| async { Redirect::temporary("/landing?pathid=9") }))
        .route("/landing", get(|| async { "landing" }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    addr
}

fn config_json(mode: &str, source_url: &str) -> String {
    format!(
        r#"{{
            "content_mode": {mode},
            "source_url": "{source_url}",
            "release_date": {{"year": 2020, "month": 1, "day": 1}},
            "splash_dwell_ms": 0,
            "network_timeout_secs": 5,
            "reachability_host": "127.0.0.1:80"
        }}"#
    )
}

#[tokio::test]
async fn test_start_router_resolves_and_persists() {
    let addr = start_upstream().await;
    let dir = tempfile::tempdir().unwrap();
    let storage = dir.path().join("router.json");

    let info = start_router(
        config_json(r#"{"type":"classic"}"#, &format!("http://{}/go", addr)),
        storage.to_str().unwrap().to_string(),
        DeviceProfile::phone(),
    )
    .await
    .unwrap();

    assert!(info.source_url.contains("push_id="));

    let mode = wait_for_decision(info.router_id.clone()).await.unwrap();
    assert_eq!(
        mode,
        DisplayMode::Enhanced(format!("http://{}/landing?pathid=9", addr))
    );
    assert_eq!(current_mode(info.router_id.clone()).unwrap(), mode);

    // Same host as the source, so only the token is kept.
    let store = JsonFileStore::open(&storage).unwrap();
    assert_eq!(store.get_string("classic_path_id").as_deref(), Some("9"));
    assert_eq!(store.get_string("saved_content_source"), None);
    assert!(store.get_string("user_unique_identifier").is_some());
    assert_eq!(store.get_int("enhanced_access_count"), 1);

    assert!(stop_router(info.router_id.clone()));
    assert!(!stop_router(info.router_id.clone()));
    assert!(current_mode(info.router_id).is_err());
}

#[tokio::test]
async fn test_start_router_tablet_goes_basic() {
    let dir = tempfile::tempdir().unwrap();
    let storage = dir.path().join("router.json");
    let tablet = DeviceProfile {
        idiom: DeviceIdiom::Tablet,
        ..DeviceProfile::phone()
    };

    let info = start_router(
        config_json(r#"{"type":"classic_no_token"}"#, "http://127.0.0.1:9/never"),
        storage.to_str().unwrap().to_string(),
        tablet,
    )
    .await
    .unwrap();

    assert_eq!(info.source_url, "http://127.0.0.1:9/never");
    assert_eq!(
        wait_for_decision(info.router_id.clone()).await.unwrap(),
        DisplayMode::Basic
    );
    stop_router(info.router_id);
}

#[tokio::test]
async fn test_start_router_rejects_bad_config() {
    let dir = tempfile::tempdir().unwrap();
    let storage = dir.path().join("router.json");
    let result = start_router(
        "{}".to_string(),
        storage.to_str().unwrap().to_string(),
        DeviceProfile::phone(),
    )
    .await;
    assert!(result.is_err());
}

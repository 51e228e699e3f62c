//! Status server routes against a live listener

use std::net::SocketAddr;
use std::sync::Arc;

use app::{create_router, monitor::check_backend, AppState};
use overlay_engine::{BackendStatus, FaceStats, OverlaySnapshot};
use serde_json::Value;
use tokio::sync::watch;
use vision_client::{ClientConfig, VisionClient};

async fn serve(snapshot: watch::Receiver<OverlaySnapshot>) -> SocketAddr {
    let state = Arc::new(AppState::new(snapshot, "http://localhost:5001"));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_overlay_route_serves_latest_snapshot() {
    let (tx, rx) = watch::channel(OverlaySnapshot::default());
    let addr = serve(rx).await;

    tx.send_replace(OverlaySnapshot {
        backend: BackendStatus::Online,
        continuous: true,
        cycles_completed: 7,
        stats: FaceStats {
            total: 2,
            recognized: 1,
            unknown: 1,
        },
        ..Default::default()
    });

    let body: Value = reqwest::get(format!("http://{}/api/v1/overlay", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["cycles_completed"], 7);
    assert_eq!(body["continuous"], true);
    assert_eq!(body["stats"]["unknown"], 1);
}

#[tokio::test]
async fn test_health_reflects_backend_status() {
    let (tx, rx) = watch::channel(OverlaySnapshot::default());
    let addr = serve(rx).await;
    let url = format!("http://{}/api/v1/health", addr);

    let body: Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert_eq!(body["status"], "starting");
    assert_eq!(body["backend"], "checking");

    tx.send_modify(|s| s.backend = BackendStatus::Offline);
    let body: Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["backend_url"], "http://localhost:5001");
}

#[tokio::test]
async fn test_unreachable_backend_reports_offline() {
    let client = VisionClient::new(&ClientConfig {
        url: "http://127.0.0.1:9".into(),
        timeout_ms: 500,
    })
    .unwrap();
    assert_eq!(check_backend(&client).await, BackendStatus::Offline);
}

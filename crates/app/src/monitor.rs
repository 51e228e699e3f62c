//! Backend health monitor

use std::time::Duration;

use overlay_engine::{BackendStatus, LoopHandle};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use vision_client::VisionClient;

/// Check the vision service once
pub async fn check_backend(client: &VisionClient) -> BackendStatus {
    match client.health_check().await {
        Ok(health) => {
            info!(
                "Vision service online: {} (detector {})",
                health.status,
                health.detector.as_deref().unwrap_or("unknown")
            );
            BackendStatus::Online
        }
        Err(e) => {
            warn!("Vision service offline: {}", e);
            BackendStatus::Offline
        }
    }
}

/// Poll the vision service and feed its status into the detection loop until
/// the loop shuts down
pub fn spawn_health_monitor(
    client: VisionClient,
    handle: LoopHandle,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut last = None;
        loop {
            ticker.tick().await;
            let status = check_backend(&client).await;
            if last == Some(status) {
                continue;
            }
            last = Some(status);
            if handle.set_backend_status(status).await.is_err() {
                break;
            }
        }
    })
}

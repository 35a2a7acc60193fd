use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ApiClient, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Checking,
    Online,
    Offline,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Checking => write!(f, "checking"),
            ConnectionStatus::Online => write!(f, "online"),
            ConnectionStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Body of `GET /api-status`. A 2xx without a `status` field counts as online.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiStatusResponse {
    #[serde(default = "online")]
    pub status: ConnectionStatus,
}

fn online() -> ConnectionStatus {
    ConnectionStatus::Online
}

/// Shared connectivity observable. The poller and the live channel both
/// write to it without coordinating, so it converges rather than agrees.
#[derive(Debug, Clone)]
pub struct StatusMonitor {
    tx: Arc<watch::Sender<ConnectionStatus>>,
}

impl StatusMonitor {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ConnectionStatus::Checking);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> ConnectionStatus {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.tx.subscribe()
    }

    pub fn mark_online(&self) {
        self.transition(ConnectionStatus::Online);
    }

    pub fn mark_offline(&self) {
        self.transition(ConnectionStatus::Offline);
    }

    /// Applies the outcome of one `/api-status` probe.
    pub fn record_probe(&self, result: &ClientResult<ApiStatusResponse>) {
        match result {
            Ok(resp) if resp.status == ConnectionStatus::Offline => self.mark_offline(),
            Ok(_) => self.mark_online(),
            Err(e) => {
                debug!("API status check failed: {}", e);
                self.mark_offline();
            }
        }
    }

    fn transition(&self, next: ConnectionStatus) {
        self.tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            info!("API status: {} -> {}", current, next);
            *current = next;
            true
        });
    }
}

impl Default for StatusMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn probe(&self) -> ClientResult<ApiStatusResponse>;
}

#[async_trait]
impl StatusProbe for ApiClient {
    async fn probe(&self) -> ClientResult<ApiStatusResponse> {
        self.check_status().await
    }
}

/// Periodic `/api-status` check. Probes immediately, then every `every`.
/// Stops when dropped.
pub struct StatusPoller {
    handle: JoinHandle<()>,
}

impl StatusPoller {
    pub fn spawn(probe: Arc<dyn StatusProbe>, monitor: StatusMonitor, every: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let result = probe.probe().await;
                if let Err(e) = &result {
                    warn!("API status check failed: {}", e);
                }
                monitor.record_probe(&result);
            }
        });
        Self { handle }
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ClientError;

    async fn wait_for(monitor: &StatusMonitor, target: ConnectionStatus) {
        let mut rx = monitor.subscribe();
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| *s == target))
            .await
            .expect("status transition timed out")
            .unwrap();
    }

    #[test]
    fn test_starts_checking_then_online_after_probe() {
        let monitor = StatusMonitor::new();
        assert_eq!(monitor.current(), ConnectionStatus::Checking);

        monitor.record_probe(&Ok(ApiStatusResponse { status: ConnectionStatus::Online }));
        assert_eq!(monitor.current(), ConnectionStatus::Online);
    }

    #[test]
    fn test_failed_probe_goes_offline() {
        let monitor = StatusMonitor::new();
        monitor.mark_online();
        monitor.record_probe(&Err(ClientError::Timeout(Duration::from_secs(8))));
        assert_eq!(monitor.current(), ConnectionStatus::Offline);

        monitor.record_probe(&Ok(ApiStatusResponse { status: ConnectionStatus::Offline }));
        assert_eq!(monitor.current(), ConnectionStatus::Offline);

        monitor.record_probe(&Ok(ApiStatusResponse { status: ConnectionStatus::Online }));
        assert_eq!(monitor.current(), ConnectionStatus::Online);
    }

    #[test]
    fn test_status_body_defaults_to_online() {
        let resp: ApiStatusResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp.status, ConnectionStatus::Online);
        let resp: ApiStatusResponse = serde_json::from_str(r#"{"status":"offline"}"#).unwrap();
        assert_eq!(resp.status, ConnectionStatus::Offline);
    }

    #[tokio::test]
    async fn test_poller_drives_monitor() {
        let mut probe = MockStatusProbe::new();
        probe
            .expect_probe()
            .returning(|| Ok(ApiStatusResponse { status: ConnectionStatus::Online }));

        let monitor = StatusMonitor::new();
        let poller = StatusPoller::spawn(Arc::new(probe), monitor.clone(), Duration::from_millis(20));
        wait_for(&monitor, ConnectionStatus::Online).await;
        poller.stop();
    }

    #[tokio::test]
    async fn test_poller_reports_unreachable_server() {
        let mut probe = MockStatusProbe::new();
        probe
            .expect_probe()
            .returning(|| Err(ClientError::Timeout(Duration::from_millis(5))));

        let monitor = StatusMonitor::new();
        monitor.mark_online();
        let _poller = StatusPoller::spawn(Arc::new(probe), monitor.clone(), Duration::from_millis(20));
        wait_for(&monitor, ConnectionStatus::Offline).await;
    }
}

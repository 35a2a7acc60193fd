//! In-process stand-in for the trading API server.

use axum::Router;
use std::time::Duration;

use super::{ApiClient, ConnectionConfig};

/// Serves `router` on an ephemeral port, returns its `http://` base URL.
pub(crate) async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

pub(crate) fn connection(base_url: &str, timeout: Duration) -> ConnectionConfig {
    ConnectionConfig::new(base_url, timeout).unwrap()
}

pub(crate) fn client(base_url: &str, timeout: Duration) -> ApiClient {
    ApiClient::new(connection(base_url, timeout)).unwrap()
}

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

use super::{ClientError, ClientResult, ConnectionConfig, StatusMonitor};
use crate::config::ReconnectPolicy;
use crate::types::{MarketStatus, StatusSnapshot, StrategyState, TradingState};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatePayload {
    strategy: StrategyState,
    trading: TradingState,
    market_status: Option<MarketStatus>,
}

/// Decodes one text frame. `Ok(None)` for frame types that carry no state.
pub fn parse_frame(text: &str) -> Result<Option<StatusSnapshot>, serde_json::Error> {
    let frame: Frame = serde_json::from_str(text)?;
    match frame.kind.as_str() {
        "initial_state" | "status_update" => {
            let payload: StatePayload = if frame.data.is_null() {
                StatePayload::default()
            } else {
                serde_json::from_value(frame.data)?
            };
            let mut trading = payload.trading;
            if let Some(status) = payload.market_status {
                trading.market_status = status;
            }
            Ok(Some(StatusSnapshot {
                strategy: payload.strategy,
                trading,
            }))
        }
        _ => Ok(None),
    }
}

/// The page's single push connection to `/ws`. Holds the latest snapshot
/// the server sent; the socket is released when this is dropped.
pub struct LiveChannel {
    snapshot: watch::Receiver<Option<StatusSnapshot>>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl LiveChannel {
    /// Connects to `/ws`. A failed first connect is retried the same way
    /// as a dropped socket, so `Manual` fails straight away.
    pub async fn open(
        config: &ConnectionConfig,
        monitor: StatusMonitor,
        policy: ReconnectPolicy,
    ) -> ClientResult<Self> {
        let url = config.ws_url().clone();
        let timeout = config.timeout();
        info!("Connecting to WebSocket: {}", url);

        let mut attempt = 0;
        let stream = loop {
            match connect(&url, timeout).await {
                Ok(stream) => break stream,
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    monitor.mark_offline();
                    let Some(delay) = policy.delay_for(attempt) else {
                        return Err(e);
                    };
                    attempt += 1;
                    debug!("Retrying WebSocket connect in {:?} (attempt {})", delay, attempt);
                    tokio::time::sleep(delay).await;
                }
            }
        };
        info!("WebSocket connected");
        monitor.mark_online();

        let (snapshot_tx, snapshot) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run_channel(
            url,
            timeout,
            stream,
            snapshot_tx,
            monitor,
            policy,
            shutdown_rx,
        ));

        Ok(Self {
            snapshot,
            shutdown: Some(shutdown_tx),
            handle,
        })
    }

    /// Latest server-pushed state, `None` until the first state frame. Fires
    /// on every state frame and errors once the channel has stopped.
    pub fn updates(&self) -> watch::Receiver<Option<StatusSnapshot>> {
        self.snapshot.clone()
    }

    /// Sends a close frame and waits for the socket task to wind down.
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            if !e.is_cancelled() {
                warn!("Live channel task failed: {}", e);
            }
        }
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn connect(url: &Url, timeout: Duration) -> ClientResult<WsStream> {
    match tokio::time::timeout(timeout, connect_async(url.as_str())).await {
        Ok(Ok((stream, _))) => Ok(stream),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(ClientError::Timeout(timeout)),
    }
}

enum SessionEnd {
    Shutdown,
    Closed,
    Failed(ClientError),
}

async fn run_channel(
    url: Url,
    timeout: Duration,
    mut stream: WsStream,
    snapshot: watch::Sender<Option<StatusSnapshot>>,
    monitor: StatusMonitor,
    policy: ReconnectPolicy,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        match run_session(stream, &snapshot, &mut shutdown).await {
            SessionEnd::Shutdown => {
                debug!("Live channel closed");
                return;
            }
            SessionEnd::Closed => warn!("WebSocket closed by server"),
            SessionEnd::Failed(e) => error!("WebSocket error: {}", e),
        }
        monitor.mark_offline();

        let mut attempt = 0;
        stream = loop {
            let Some(delay) = policy.delay_for(attempt) else {
                info!("Live channel stays closed after {} reconnect attempt(s)", attempt);
                return;
            };
            attempt += 1;
            debug!("Reconnecting in {:?} (attempt {})", delay, attempt);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut shutdown => return,
            }

            match connect(&url, timeout).await {
                Ok(stream) => {
                    info!("WebSocket reconnected");
                    monitor.mark_online();
                    break stream;
                }
                Err(e) => warn!("Reconnect attempt {} failed: {}", attempt, e),
            }
        };
    }
}

async fn run_session(
    stream: WsStream,
    snapshot: &watch::Sender<Option<StatusSnapshot>>,
    shutdown: &mut oneshot::Receiver<()>,
) -> SessionEnd {
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            _ = &mut *shutdown => {
                let _ = write.send(Message::Close(None)).await;
                return SessionEnd::Shutdown;
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => apply_frame(&text, snapshot),
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = write.send(Message::Pong(data)).await {
                        return SessionEnd::Failed(e.into());
                    }
                }
                Some(Ok(Message::Close(_))) | None => return SessionEnd::Closed,
                Some(Err(e)) => return SessionEnd::Failed(e.into()),
                Some(Ok(_)) => {}
            }
        }
    }
}

fn apply_frame(text: &str, snapshot: &watch::Sender<Option<StatusSnapshot>>) {
    match parse_frame(text) {
        Ok(Some(next)) => {
            debug!(
                "Live update: running={}, price={:?}, position={}",
                next.strategy.is_running, next.trading.current_price, next.trading.current_position
            );
            snapshot.send_replace(Some(next));
        }
        Ok(None) => debug!("Ignoring live frame: {}", text),
        Err(e) => warn!("Dropping malformed live frame: {}", e),
    }
}

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use super::dashboard::print_snapshot;
use super::Page;
use crate::api::{LiveChannel, StatusPoller, StatusProbe};

/// Live breakout page: the push channel and the status poller run side by
/// side until Ctrl-C or until the channel gives up.
pub async fn watch(page: &Page) -> Result<()> {
    let live = &page.settings().live;

    match page.client().get_strategy_status().await {
        Ok(snapshot) => print_snapshot(&snapshot),
        Err(e) => warn!("Initial status unavailable: {}", e),
    }

    let probe: Arc<dyn StatusProbe> = Arc::new(page.client().clone());
    let poller = StatusPoller::spawn(probe, page.monitor().clone(), live.status_poll());
    let channel = LiveChannel::open(page.client().connection(), page.monitor().clone(), live.reconnect).await?;
    info!("Watching live updates (reconnect: {}), Ctrl-C to stop", live.reconnect.name());

    let mut updates = channel.updates();
    let mut status = page.monitor().subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Stopping live watch");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    warn!("Live channel closed");
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if let Some(snapshot) = snapshot {
                    print_snapshot(&snapshot);
                }
            }
            Ok(()) = status.changed() => {
                let current = *status.borrow_and_update();
                println!("API status: {}", current);
            }
        }
    }

    channel.close().await;
    poller.stop();
    Ok(())
}

use anyhow::{bail, Result};
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::{price, Page};
use crate::types::{Exchange, StatusSnapshot, StrategyConfig, TimeOfDay, TradeRecord};

/// Fields left `None` keep the value the server currently holds.
#[derive(Debug, Clone, Default)]
pub struct ConfigPatch {
    pub x_time: Option<TimeOfDay>,
    pub y_time: Option<TimeOfDay>,
    pub entry_time: Option<TimeOfDay>,
    pub stop_loss: Option<Decimal>,
    pub target: Option<Decimal>,
    pub lot_size: Option<u32>,
}

impl ConfigPatch {
    pub fn apply(&self, base: StrategyConfig) -> StrategyConfig {
        StrategyConfig {
            x_time: self.x_time.unwrap_or(base.x_time),
            y_time: self.y_time.unwrap_or(base.y_time),
            entry_time: self.entry_time.unwrap_or(base.entry_time),
            stop_loss: self.stop_loss.unwrap_or(base.stop_loss),
            target: self.target.unwrap_or(base.target),
            lot_size: self.lot_size.unwrap_or(base.lot_size),
        }
    }
}

pub fn validate_config(config: &StrategyConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    if config.stop_loss <= Decimal::ZERO {
        errors.push("stop_loss must be > 0".to_string());
    }
    if config.target <= Decimal::ZERO {
        errors.push("target must be > 0".to_string());
    }
    if config.lot_size == 0 {
        errors.push("lot_size must be >= 1".to_string());
    }
    if config.x_time >= config.y_time {
        errors.push(format!("x_time {} must be before y_time {}", config.x_time, config.y_time));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub async fn status(page: &Page) -> Result<()> {
    let probe = page.client().check_status().await;
    page.monitor().record_probe(&probe);
    println!("\n=== API Status ===");
    println!("Server: {}", page.client().connection().base_url());
    println!("Status: {}", page.monitor().current());

    if let Err(e) = probe {
        if e.is_timeout() {
            warn!("API server did not answer within {:?}", page.client().connection().timeout());
        } else if e.is_network() {
            warn!("API server unreachable: {}", e);
        } else {
            warn!("Skipping strategy status: {}", e);
        }
        return Ok(());
    }

    let snapshot = page.client().get_strategy_status().await?;
    print_snapshot(&snapshot);
    Ok(())
}

pub async fn show_config(page: &Page) -> Result<()> {
    let snapshot = page.client().get_strategy_status().await?;
    print_config(&snapshot.strategy.config());
    Ok(())
}

pub async fn set_config(page: &Page, patch: ConfigPatch) -> Result<()> {
    let current = page.client().get_strategy_status().await?;
    let config = patch.apply(current.strategy.config());

    if let Err(errors) = validate_config(&config) {
        for e in &errors {
            warn!("Invalid strategy config: {}", e);
        }
        bail!("strategy config rejected: {}", errors.join("; "));
    }

    page.client().update_config(&config).await?;
    info!("Strategy config updated");
    print_config(&config);
    Ok(())
}

pub async fn set_exchange(page: &Page, exchange: Exchange) -> Result<()> {
    page.client().update_exchange(exchange).await?;
    println!("Exchange set to {} ({})", exchange, exchange.name());
    Ok(())
}

pub async fn set_running(page: &Page, is_running: bool, exchange: Exchange) -> Result<()> {
    page.client().update_status(is_running, exchange).await?;
    let snapshot = page.client().get_strategy_status().await?;
    println!(
        "Strategy {} on {}",
        if snapshot.strategy.is_running { "RUNNING" } else { "STOPPED" },
        exchange
    );
    if snapshot.strategy.is_running != is_running {
        warn!("Server still reports is_running={}", snapshot.strategy.is_running);
    }
    Ok(())
}

pub async fn trades(page: &Page) -> Result<()> {
    let trades = page.client().get_trades().await?;
    print_trades(&trades);
    Ok(())
}

pub(crate) fn print_snapshot(snapshot: &StatusSnapshot) {
    let strategy = &snapshot.strategy;
    let trading = &snapshot.trading;

    println!("\n=== Strategy ===");
    println!(
        "State: {}{}",
        if strategy.is_running { "RUNNING" } else { "STOPPED" },
        strategy
            .exchange
            .as_deref()
            .map(|e| format!(" on {}", e))
            .unwrap_or_default()
    );
    println!(
        "Entry: {} | Range until: {} | Square-off: {}",
        strategy.entry_time, strategy.x_time, strategy.y_time
    );
    println!(
        "Stop Loss: {} | Target: {} | Lots: {}",
        strategy.stop_loss, strategy.target, strategy.lot_size
    );

    println!("\n=== Market ===");
    println!("Market: {}", trading.market_status);
    println!(
        "High: {} | Low: {} | Range: {}",
        price(trading.highest_high),
        price(trading.lowest_low),
        price(trading.range())
    );
    println!(
        "Price: {} | Position: {}",
        price(trading.current_price),
        trading.current_position
    );
}

fn print_config(config: &StrategyConfig) {
    println!("\n=== Strategy Config ===");
    println!("x_time:     {}", config.x_time);
    println!("y_time:     {}", config.y_time);
    println!("entry_time: {}", config.entry_time);
    println!("stop_loss:  {}", config.stop_loss);
    println!("target:     {}", config.target);
    println!("lot_size:   {}", config.lot_size);
}

fn print_trades(trades: &[TradeRecord]) {
    println!("\n=== Trade History ===");
    if trades.is_empty() {
        println!("No trades recorded");
        return;
    }

    println!(
        "{:<8} {:<20} {:>10} {:<20} {:>10} {:<6} {:>10}",
        "ID", "Entry Time", "Entry", "Exit Time", "Exit", "Side", "P&L"
    );
    println!("{}", "-".repeat(90));
    for trade in trades {
        println!(
            "{:<8} {:<20} {:>10.2} {:<20} {:>10} {:<6} {:>10.2}",
            trade.id.to_string(),
            trade.entry_time,
            trade.entry_price,
            trade.exit_time.as_deref().unwrap_or("open"),
            price(trade.exit_price),
            trade.position_type.as_str(),
            trade.profit_loss
        );
    }
    println!("{}", "-".repeat(90));

    let total: Decimal = trades.iter().map(|t| t.profit_loss).sum();
    let open = trades.iter().filter(|t| t.is_open()).count();
    println!("Trades: {} ({} open) | Net P&L: {:.2}", trades.len(), open, total);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock;
    use axum::routing::{get, put};
    use axum::{Json, Router};
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn test_patch_keeps_unset_fields() {
        let base = StrategyConfig {
            lot_size: 4,
            ..StrategyConfig::default()
        };
        let patch = ConfigPatch {
            stop_loss: Some(dec!(35)),
            y_time: Some(TimeOfDay::new(15, 0).unwrap()),
            ..ConfigPatch::default()
        };
        let config = patch.apply(base);
        assert_eq!(config.stop_loss, dec!(35));
        assert_eq!(config.y_time.to_string(), "15:00");
        assert_eq!(config.lot_size, 4);
        assert_eq!(config.target, dec!(100));
    }

    #[test]
    fn test_config_validation() {
        assert!(validate_config(&StrategyConfig::default()).is_ok());

        let bad = StrategyConfig {
            stop_loss: Decimal::ZERO,
            lot_size: 0,
            x_time: TimeOfDay::new(15, 0).unwrap(),
            ..StrategyConfig::default()
        };
        assert_eq!(validate_config(&bad).unwrap_err().len(), 3);
    }

    #[tokio::test]
    async fn test_set_config_merges_with_server_state() {
        let received: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
        let sink = received.clone();
        let router = Router::new()
            .route(
                "/status",
                get(|| async {
                    Json(json!({
                        "strategy": {"is_running": false, "x_time": "10:45", "y_time": "14:30",
                                     "entry_time": "09:15", "stop_loss": 50, "target": 100, "lot_size": 3},
                        "trading": {"market_status": "CLOSED"}
                    }))
                }),
            )
            .route(
                "/config",
                put(move |Json(body): Json<Value>| {
                    let sink = sink.clone();
                    async move {
                        *sink.lock().unwrap() = Some(body);
                        Json(json!({"success": true}))
                    }
                }),
            );
        let base = mock::serve(router).await;
        let page = Page::for_client(mock::client(&base, Duration::from_secs(2)));

        let patch = ConfigPatch {
            target: Some(dec!(120)),
            ..ConfigPatch::default()
        };
        set_config(&page, patch).await.unwrap();

        let body = received.lock().unwrap().clone().unwrap();
        assert_eq!(body["x_time"], "10:45");
        assert_eq!(body["lot_size"], 3);
        assert_eq!(body["target"], 120.0);
    }

    #[tokio::test]
    async fn test_status_page_marks_offline_on_failed_probe() {
        let router = Router::new().route("/api-status", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let base = mock::serve(router).await;
        let page = Page::for_client(mock::client(&base, Duration::from_secs(2)));

        status(&page).await.unwrap();
        assert_eq!(page.monitor().current(), crate::api::ConnectionStatus::Offline);
    }
}

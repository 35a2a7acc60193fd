use anyhow::Result;
use tracing::warn;

use super::{price, sample, Page};
use crate::types::{
    BacktestRequest, BacktestResponse, BacktestSummary, FiveMinBacktestRequest, FiveMinBacktestResponse,
};

pub async fn run(page: &Page, params: BacktestRequest, sample_fallback: bool) -> Result<()> {
    let response = fetch(page, &params, sample_fallback).await?;
    print_backtest(&response);
    Ok(())
}

/// The server's backtest, or a synthetic one when `sample_fallback` is set
/// and the request failed.
pub async fn fetch(page: &Page, params: &BacktestRequest, sample_fallback: bool) -> Result<BacktestResponse> {
    match page.client().run_backtest(params).await {
        Ok(response) => Ok(response),
        Err(e) if sample_fallback => {
            warn!("Backtest request failed, using sample data: {}", e);
            Ok(sample::backtest(&mut rand::rng(), params))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn run_five_min(page: &Page, params: FiveMinBacktestRequest) -> Result<()> {
    let response = page.client().run_backtest_5min(&params).await?;
    print_five_min(&response);
    Ok(())
}

fn print_summary(summary: &BacktestSummary) {
    println!("\n=== Backtest Summary ===");
    println!(
        "Trades: {} | Wins: {} | Losses: {} | Break-even: {}",
        summary.total_trades, summary.winning_trades, summary.losing_trades, summary.break_even_trades
    );
    println!("Win Rate: {:.1}%", summary.win_rate_pct());
    println!(
        "Total P&L: {:.2} | Avg P&L: {:.2}",
        summary.total_profit_loss, summary.avg_profit_loss
    );
    println!("Max Profit: {:.2} | Max Loss: {:.2}", summary.max_profit, summary.max_loss);
}

fn print_backtest(response: &BacktestResponse) {
    let p = &response.parameters;
    println!("\n=== Backtest: {} ({} to {}) ===", p.instrument, p.start_date, p.end_date);
    println!(
        "Entry: {} | Range until: {} | Square-off: {} | SL: {} | Target: {} | Lots: {}",
        p.entry_time, p.x_time, p.y_time, p.stop_loss, p.target, p.lot_size
    );
    print_summary(&response.summary);

    if response.results.is_empty() {
        println!("\nNo trading days in range");
        return;
    }

    println!(
        "\n{:<12} {:>10} {:>10} {:<6} {:>10} {:>10} {:>10} {:<6}",
        "Date", "High", "Low", "Side", "Entry", "Exit", "P&L", "Hit"
    );
    println!("{}", "-".repeat(84));
    for day in &response.results {
        let hit = if day.target_hit {
            "TGT"
        } else if day.stop_loss_hit {
            "SL"
        } else {
            ""
        };
        println!(
            "{:<12} {:>10.2} {:>10.2} {:<6} {:>10.2} {:>10.2} {:>10.2} {:<6}",
            day.date,
            day.high,
            day.low,
            day.position.as_str(),
            day.entry_price,
            day.exit_price,
            day.profit_loss,
            hit
        );
        if let (Some(change), Some(pct)) = (day.day_change, day.day_change_percent) {
            println!("{:<12} day change {:.2} ({:.2}%) close {}", "", change, pct, price(day.close));
        }
    }
}

fn print_five_min(response: &FiveMinBacktestResponse) {
    let p = &response.parameters;
    println!(
        "\n=== 5-min Breakout: {} on {} from {} ===",
        p.instrument, p.exchange, p.start_date
    );
    println!(
        "Square-off: {} | Min Move: {} | Target Multiplier: {} | Lots: {}",
        p.y_time, p.min_move, p.multiplier, p.lot_size
    );
    print_summary(&response.summary);

    println!(
        "\n{:<12} {:>21} {:>21} {:>8} {:>10}",
        "Date", "First H/L", "Fourth H/L", "Range", "P&L"
    );
    println!("{}", "-".repeat(76));
    for day in &response.results {
        println!(
            "{:<12} {:>10.2}/{:<10.2} {:>10.2}/{:<10.2} {:>8.2} {:>10.2}",
            day.date, day.first_high, day.first_low, day.fourth_high, day.fourth_low, day.range, day.profit_loss
        );
        if day.trades.is_empty() {
            println!("{:<12} No trades", "");
        }
        for trade in &day.trades {
            println!(
                "{:<12} {:<5} {} -> {} x{} ({:+.2} pts)",
                "",
                trade.pos.as_str(),
                trade.entry,
                trade.exit,
                trade.lots,
                trade.points()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use chrono::NaiveDate;
    use std::time::Duration;

    #[tokio::test]
    async fn test_failed_backtest_falls_back_to_sample() {
        let router = Router::new().route("/backtest", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let page = Page::for_client(mock::client(&mock::serve(router).await, Duration::from_secs(2)));
        let params = BacktestRequest::for_day(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());

        let err = fetch(&page, &params, false).await.unwrap_err();
        assert!(err.to_string().contains("status 500"));

        let response = fetch(&page, &params, true).await.unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.summary.total_trades, 1);
        assert_eq!(response.parameters, params);
    }
}

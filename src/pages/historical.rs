use anyhow::Result;
use rust_decimal::Decimal;
use tracing::warn;

use super::{sample, Page};
use crate::types::{HistoricalCandle, HistoricalDataRequest};

pub async fn run(page: &Page, params: HistoricalDataRequest, sample_fallback: bool) -> Result<()> {
    let candles = match page.client().get_historical_data(&params).await {
        Ok(candles) => candles,
        Err(e) if sample_fallback => {
            warn!("Historical data request failed, using sample data: {}", e);
            sample::historical(&mut rand::rng(), params.start_date, params.end_date)
        }
        Err(e) => return Err(e.into()),
    };

    println!(
        "\n=== Historical Data: {} ({} to {}, {}) ===",
        params.instrument, params.start_date, params.end_date, params.interval
    );
    print_candles(&candles);
    Ok(())
}

fn print_candles(candles: &[HistoricalCandle]) {
    if candles.is_empty() {
        println!("No data for this range");
        return;
    }

    println!(
        "{:<20} {:>10} {:>10} {:>10} {:>10} {:>10} {:>12}",
        "Date", "Open", "High", "Low", "Close", "Change", "Volume"
    );
    println!("{}", "-".repeat(88));
    for c in candles {
        println!(
            "{:<20} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>+10.2} {:>12}",
            c.date,
            c.open,
            c.high,
            c.low,
            c.close,
            c.change(),
            c.volume
        );
    }

    let bullish = candles.iter().filter(|c| c.is_bullish()).count();
    let widest = candles.iter().map(|c| c.range()).max().unwrap_or(Decimal::ZERO);
    println!(
        "{} candle(s) | {} up, {} down | widest range {:.2}",
        candles.len(),
        bullish,
        candles.len() - bullish,
        widest
    );
}

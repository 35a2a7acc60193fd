//! Synthetic data shown when the API server cannot be reached and the user
//! asked for a sample instead of an error. Weekdays only, prices around the
//! NIFTY 22000 level.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::Rng;
use rust_decimal::Decimal;

use crate::types::{
    BacktestDay, BacktestRequest, BacktestResponse, BacktestSummary, HistoricalCandle, Position,
};

const BASE_PRICE: i64 = 22_000;
const WIN_PROBABILITY: f64 = 0.7;

fn trading_days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start
        .iter_days()
        .take_while(move |day| *day <= end)
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
}

fn below<R: Rng + ?Sized>(rng: &mut R, bound: Decimal) -> i64 {
    let bound = i64::try_from(bound.trunc()).unwrap_or(0);
    if bound > 0 {
        rng.random_range(0..bound)
    } else {
        0
    }
}

pub fn backtest<R: Rng + ?Sized>(rng: &mut R, params: &BacktestRequest) -> BacktestResponse {
    let results: Vec<BacktestDay> = trading_days(params.start_date, params.end_date)
        .map(|day| sample_day(&mut *rng, day, params))
        .collect();

    BacktestResponse {
        summary: BacktestSummary::from_days(&results),
        parameters: params.clone(),
        results,
    }
}

fn sample_day<R: Rng + ?Sized>(rng: &mut R, day: NaiveDate, params: &BacktestRequest) -> BacktestDay {
    let base = BASE_PRICE + rng.random_range(0..400) - 200;
    let high = base + rng.random_range(0..100) + 50;
    let low = base - rng.random_range(0..100) - 50;
    let position = if rng.random_bool(0.5) { Position::Long } else { Position::Short };
    let wins = rng.random_bool(WIN_PROBABILITY);

    let move_points = if wins {
        below(rng, params.target) + 10
    } else {
        -(below(rng, params.stop_loss) + 10)
    };
    let (entry, exit) = match position {
        Position::Short => (low, low - move_points),
        _ => (high, high + move_points),
    };
    let profit_loss = Decimal::from(move_points);
    let date = day.format("%Y-%m-%d").to_string();

    BacktestDay {
        entry_time: format!("{} {}", date, params.entry_time),
        exit_time: format!("{} {}", date, params.y_time),
        date,
        open: None,
        high: Decimal::from(high),
        low: Decimal::from(low),
        close: None,
        volume: None,
        day_change: None,
        day_change_percent: None,
        entry_price: Decimal::from(entry),
        exit_price: Decimal::from(exit),
        position,
        profit_loss,
        stop_loss_hit: profit_loss < Decimal::ZERO,
        target_hit: profit_loss > Decimal::ZERO,
    }
}

pub fn historical<R: Rng + ?Sized>(rng: &mut R, start: NaiveDate, end: NaiveDate) -> Vec<HistoricalCandle> {
    trading_days(start, end)
        .map(|day| {
            let open = BASE_PRICE + rng.random_range(0..2_000) - 1_000;
            let high = open + rng.random_range(0..150) + 50;
            let low = open - rng.random_range(0..150) - 50;
            let close = open + rng.random_range(0..200) - 100;
            let volume = rng.random_range(1_000_000i64..10_000_000);
            HistoricalCandle {
                date: day.format("%Y-%m-%d").to_string(),
                open: Decimal::from(open),
                high: Decimal::from(high),
                low: Decimal::from(low),
                close: Decimal::from(close),
                volume: Decimal::from(volume),
            }
        })
        .collect()
}

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{Position, TimeOfDay, NIFTY_50_TOKEN};

/// Body of `POST /backtest`; echoed back as `parameters`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub instrument: u64,
    pub x_time: TimeOfDay,
    pub y_time: TimeOfDay,
    pub entry_time: TimeOfDay,
    pub stop_loss: Decimal,
    pub target: Decimal,
    pub lot_size: u32,
}

impl BacktestRequest {
    /// Single-day run on NIFTY 50 with the default breakout parameters.
    pub fn for_day(date: NaiveDate) -> Self {
        Self {
            start_date: date,
            end_date: date,
            instrument: NIFTY_50_TOKEN,
            x_time: TimeOfDay::at(11, 0),
            y_time: TimeOfDay::at(14, 30),
            entry_time: TimeOfDay::at(9, 15),
            stop_loss: dec!(50),
            target: dec!(100),
            lot_size: 1,
        }
    }
}

/// One trading day of a breakout backtest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestDay {
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,
    pub high: Decimal,
    pub low: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_change: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_change_percent: Option<Decimal>,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub position: Position,
    pub entry_time: String,
    pub exit_time: String,
    pub profit_loss: Decimal,
    pub stop_loss_hit: bool,
    pub target_hit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    /// Not reported by the 5-minute backtest.
    #[serde(default)]
    pub break_even_trades: u32,
    /// Fraction in `0..=1`.
    pub win_rate: Decimal,
    pub total_profit_loss: Decimal,
    pub avg_profit_loss: Decimal,
    pub max_profit: Decimal,
    pub max_loss: Decimal,
}

impl BacktestSummary {
    pub fn from_profits<I>(profits: I) -> Self
    where
        I: IntoIterator<Item = Decimal>,
    {
        let mut summary = Self::default();
        let mut max_profit: Option<Decimal> = None;
        let mut max_loss: Option<Decimal> = None;

        for pnl in profits {
            summary.total_trades += 1;
            if pnl > Decimal::ZERO {
                summary.winning_trades += 1;
            } else if pnl < Decimal::ZERO {
                summary.losing_trades += 1;
            } else {
                summary.break_even_trades += 1;
            }
            summary.total_profit_loss += pnl;
            max_profit = Some(max_profit.map_or(pnl, |m| m.max(pnl)));
            max_loss = Some(max_loss.map_or(pnl, |m| m.min(pnl)));
        }

        if summary.total_trades > 0 {
            let total = Decimal::from(summary.total_trades);
            summary.win_rate = Decimal::from(summary.winning_trades) / total;
            summary.avg_profit_loss = summary.total_profit_loss / total;
        }
        summary.max_profit = max_profit.unwrap_or(Decimal::ZERO);
        summary.max_loss = max_loss.unwrap_or(Decimal::ZERO);
        summary
    }

    pub fn from_days(days: &[BacktestDay]) -> Self {
        Self::from_profits(days.iter().map(|d| d.profit_loss))
    }

    pub fn win_rate_pct(&self) -> Decimal {
        self.win_rate * dec!(100)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestResponse {
    pub summary: BacktestSummary,
    pub parameters: BacktestRequest,
    pub results: Vec<BacktestDay>,
}

/// Body of `POST /backtest_5min`. The range comes from the first and fourth
/// five-minute candles; `y_time` is the square-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiveMinBacktestRequest {
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub instrument: u64,
    pub lot_size: u32,
    pub multiplier: Decimal,
    pub min_move: Decimal,
    pub exchange: String,
    pub y_time: TimeOfDay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiveMinTrade {
    pub pos: Position,
    pub entry: Decimal,
    pub exit: Decimal,
    pub lots: u32,
}

impl FiveMinTrade {
    pub fn points(&self) -> Decimal {
        match self.pos {
            Position::Short => self.entry - self.exit,
            _ => self.exit - self.entry,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiveMinDay {
    pub date: String,
    pub first_high: Decimal,
    pub first_low: Decimal,
    pub fourth_high: Decimal,
    pub fourth_low: Decimal,
    pub range: Decimal,
    #[serde(default)]
    pub trades: Vec<FiveMinTrade>,
    pub profit_loss: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiveMinBacktestResponse {
    pub summary: BacktestSummary,
    pub parameters: FiveMinBacktestRequest,
    pub results: Vec<FiveMinDay>,
}

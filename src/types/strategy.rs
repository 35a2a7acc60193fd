use chrono::NaiveTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Wall-clock time used by the strategy cutoffs. Accepts `HH:MM` or
/// `HH:MM:SS`, always written back as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Literal times only.
    pub(crate) fn at(hour: u32, minute: u32) -> Self {
        Self::new(hour, minute).expect("literal time of day is valid")
    }
}

impl FromStr for TimeOfDay {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .map(Self)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    #[default]
    None,
    Long,
    Short,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::None => "NONE",
            Position::Long => "LONG",
            Position::Short => "SHORT",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketStatus {
    Open,
    #[default]
    Closed,
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketStatus::Open => write!(f, "OPEN"),
            MarketStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Editable breakout parameters, the body of `PUT /config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Range observation ends.
    pub x_time: TimeOfDay,
    /// Square-off.
    pub y_time: TimeOfDay,
    pub entry_time: TimeOfDay,
    pub stop_loss: Decimal,
    pub target: Decimal,
    pub lot_size: u32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            x_time: TimeOfDay::at(11, 0),
            y_time: TimeOfDay::at(14, 30),
            entry_time: TimeOfDay::at(9, 15),
            stop_loss: dec!(50),
            target: dec!(100),
            lot_size: 1,
        }
    }
}

/// Strategy state as reported by the server. Never merged: each report
/// replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyState {
    pub is_running: bool,
    pub x_time: TimeOfDay,
    pub y_time: TimeOfDay,
    pub entry_time: TimeOfDay,
    pub stop_loss: Decimal,
    pub target: Decimal,
    pub lot_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
}

impl StrategyState {
    pub fn config(&self) -> StrategyConfig {
        StrategyConfig {
            x_time: self.x_time,
            y_time: self.y_time,
            entry_time: self.entry_time,
            stop_loss: self.stop_loss,
            target: self.target,
            lot_size: self.lot_size,
        }
    }
}

impl Default for StrategyState {
    fn default() -> Self {
        let config = StrategyConfig::default();
        Self {
            is_running: false,
            x_time: config.x_time,
            y_time: config.y_time,
            entry_time: config.entry_time,
            stop_loss: config.stop_loss,
            target: config.target,
            lot_size: config.lot_size,
            exchange: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingState {
    pub highest_high: Option<Decimal>,
    pub lowest_low: Option<Decimal>,
    pub current_price: Option<Decimal>,
    pub current_position: Position,
    pub market_status: MarketStatus,
}

impl TradingState {
    /// Width of the observed breakout range, once both sides are known.
    pub fn range(&self) -> Option<Decimal> {
        match (self.highest_high, self.lowest_low) {
            (Some(high), Some(low)) => Some(high - low),
            _ => None,
        }
    }
}

/// Body of `GET /status` and the payload cached from live frames.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub strategy: StrategyState,
    pub trading: TradingState,
}

/// `PUT /status`
#[derive(Debug, Clone, Serialize)]
pub struct RunStateUpdate {
    pub is_running: bool,
    pub exchange: String,
}

/// `POST /update-config`
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeUpdate {
    pub exchange: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_of_day_formats() {
        let short: TimeOfDay = "09:15".parse().unwrap();
        let long: TimeOfDay = "09:15:00".parse().unwrap();
        assert_eq!(short, long);
        assert_eq!(long.to_string(), "09:15");
        assert!("25:00".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_strategy_state_defaults_missing_fields() {
        let state: StrategyState = serde_json::from_str(r#"{"is_running": true}"#).unwrap();
        assert!(state.is_running);
        assert_eq!(state.x_time, TimeOfDay::new(11, 0).unwrap());
        assert_eq!(state.stop_loss, dec!(50));
        assert_eq!(state.lot_size, 1);
    }

    #[test]
    fn test_trading_state_nulls_and_range() {
        let json = r#"{
            "highest_high": 22150.5,
            "lowest_low": 22010,
            "current_price": null,
            "current_position": "SHORT",
            "market_status": "OPEN"
        }"#;
        let state: TradingState = serde_json::from_str(json).unwrap();
        assert_eq!(state.current_price, None);
        assert_eq!(state.current_position, Position::Short);
        assert_eq!(state.market_status, MarketStatus::Open);
        assert_eq!(state.range(), Some(dec!(140.5)));
    }

    #[test]
    fn test_run_state_update_body() {
        let body = serde_json::to_value(RunStateUpdate {
            is_running: true,
            exchange: "NFO".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"is_running": true, "exchange": "NFO"}));
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Position;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TradeId {
    Number(u64),
    Text(String),
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeId::Number(n) => write!(f, "{}", n),
            TradeId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Row of `GET /trades`. The server emits camelCase here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub id: TradeId,
    pub entry_time: String,
    pub entry_price: Decimal,
    #[serde(default)]
    pub exit_time: Option<String>,
    #[serde(default)]
    pub exit_price: Option<Decimal>,
    pub position_type: Position,
    #[serde(default)]
    pub profit_loss: Decimal,
}

impl TradeRecord {
    pub fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_trade_record_wire_names() {
        let json = r#"[
            {"id": 7, "entryTime": "09:31", "entryPrice": 22150, "exitTime": "14:30",
             "exitPrice": 22230, "positionType": "LONG", "profitLoss": 80},
            {"id": "t-8", "entryTime": "11:02", "entryPrice": 22010, "positionType": "SHORT"}
        ]"#;
        let trades: Vec<TradeRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(trades[0].id, TradeId::Number(7));
        assert_eq!(trades[0].profit_loss, dec!(80));
        assert!(!trades[0].is_open());
        assert_eq!(trades[1].id.to_string(), "t-8");
        assert!(trades[1].is_open());
        assert_eq!(trades[1].position_type, Position::Short);
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// NIFTY 50 index, the default instrument on every form.
pub const NIFTY_50_TOKEN: u64 = 256265;

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Exchange {
    #[default]
    NFO,
    NSE,
    BFO,
    BSE,
}

impl Exchange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::NFO => "NFO",
            Exchange::NSE => "NSE",
            Exchange::BFO => "BFO",
            Exchange::BSE => "BSE",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Exchange::NFO => "NSE Futures & Options",
            Exchange::NSE => "NSE Cash",
            Exchange::BFO => "BSE Futures & Options",
            Exchange::BSE => "BSE Cash",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown exchange code: {0} (expected NFO, NSE, BFO or BSE)")]
pub struct UnknownExchange(pub String);

impl FromStr for Exchange {
    type Err = UnknownExchange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NFO" => Ok(Exchange::NFO),
            "NSE" => Ok(Exchange::NSE),
            "BFO" => Ok(Exchange::BFO),
            "BSE" => Ok(Exchange::BSE),
            _ => Err(UnknownExchange(s.to_string())),
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Instrument from the market-data master. Fields the client does not know
/// about are kept in `extra` so a search result is passed on untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub instrument_token: u64,
    pub tradingsymbol: String,
    #[serde(default)]
    pub name: String,
    pub exchange: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strike: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Symbol {
    pub fn kind(&self) -> &str {
        self.instrument_type.as_deref().unwrap_or("Index")
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) {} | {} | token {}",
            self.tradingsymbol,
            self.name,
            self.exchange,
            self.kind(),
            self.instrument_token
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exchange_parsing() {
        assert_eq!("nfo".parse::<Exchange>().unwrap(), Exchange::NFO);
        assert_eq!(Exchange::default(), Exchange::NFO);
        assert!("MCX".parse::<Exchange>().is_err());
        assert_eq!(Exchange::BFO.name(), "BSE Futures & Options");
    }

    #[test]
    fn test_symbol_keeps_unknown_fields() {
        let raw = json!({
            "instrument_token": 256265,
            "tradingsymbol": "NIFTY 50",
            "name": "NIFTY 50",
            "exchange": "NSE",
            "segment": "INDICES",
            "tick_size": 0.05
        });
        let symbol: Symbol = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(symbol.instrument_token, NIFTY_50_TOKEN);
        assert_eq!(symbol.kind(), "Index");
        assert_eq!(symbol.extra.get("tick_size"), Some(&json!(0.05)));
        assert_eq!(serde_json::to_value(&symbol).unwrap(), raw);
    }
}

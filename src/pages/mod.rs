//! One module per dashboard route. Each subcommand builds a [`Page`] once
//! and drops it when it returns, which releases whatever the page opened.

pub mod auth;
pub mod backtest;
pub mod breakout;
pub mod dashboard;
pub mod historical;
pub mod sample;
pub mod symbols;

use anyhow::Result;

use crate::api::{ApiClient, ConnectionConfig, StatusMonitor};
use crate::config::Settings;

pub struct Page {
    client: ApiClient,
    monitor: StatusMonitor,
    settings: Settings,
}

impl Page {
    pub fn load(settings: Settings, host: &str) -> Result<Self> {
        let connection = ConnectionConfig::resolve(host, &settings.api)?;
        let client = ApiClient::new(connection)?;
        Ok(Self {
            client,
            monitor: StatusMonitor::new(),
            settings,
        })
    }

    #[cfg(test)]
    pub(crate) fn for_client(client: ApiClient) -> Self {
        Self {
            client,
            monitor: StatusMonitor::new(),
            settings: Settings::default(),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn monitor(&self) -> &StatusMonitor {
        &self.monitor
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

/// `22150.5` → `22150.50`; missing values render as `-`.
pub(crate) fn price(value: Option<rust_decimal::Decimal>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_page_resolves_connection_from_host() {
        let page = Page::load(Settings::default(), "localhost").unwrap();
        assert_eq!(page.client().connection().base_url(), "http://localhost:3001");

        let page = Page::load(Settings::default(), "admin.example.in").unwrap();
        assert_eq!(page.client().connection().base_url(), "https://algo-api.evoqins.dev");
    }

    #[test]
    fn test_price_formatting() {
        assert_eq!(price(Some(dec!(22150.5))), "22150.50");
        assert_eq!(price(None), "-");
    }
}

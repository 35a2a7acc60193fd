use std::time::Duration;
use tracing::info;
use url::Url;

use super::{ClientError, ClientResult};
use crate::config::ApiSettings;

/// Where the API server lives for the current page load. Built once per
/// command and handed to whoever needs it; nothing here is global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    base_url: String,
    ws_url: Url,
    timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let parsed = Url::parse(base_url).map_err(|e| ClientError::invalid_url(base_url, e))?;
        let base_url = parsed.as_str().trim_end_matches('/').to_string();

        let ws_raw = if let Some(rest) = base_url.strip_prefix("https://") {
            format!("wss://{}/ws", rest)
        } else if let Some(rest) = base_url.strip_prefix("http://") {
            format!("ws://{}/ws", rest)
        } else {
            format!("{}/ws", base_url)
        };
        let ws_url = Url::parse(&ws_raw).map_err(|e| ClientError::invalid_url(&ws_raw, e))?;

        Ok(Self {
            base_url,
            ws_url,
            timeout,
        })
    }

    /// Picks the API server for a dashboard viewed from `hostname`: the local
    /// server for `localhost`, the production server otherwise. An explicit
    /// `api_base_url` overrides both.
    pub fn resolve(hostname: &str, settings: &ApiSettings) -> ClientResult<Self> {
        let base = match &settings.api_base_url {
            Some(url) => url.as_str(),
            None if hostname.trim().eq_ignore_ascii_case("localhost") => settings.local_url.as_str(),
            None => settings.production_url.as_str(),
        };
        let config = Self::new(base, settings.timeout())?;
        info!("API client initialized with URL: {}", config.base_url);
        Ok(config)
    }

    /// `http(s)://host:port` without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `ws(s)://host:port/ws`
    pub fn ws_url(&self) -> &Url {
        &self.ws_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn url_for(&self, path: &str) -> ClientResult<Url> {
        let raw = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Url::parse(&raw).map_err(|e| ClientError::invalid_url(&raw, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localhost_resolves_to_local_server() {
        let settings = ApiSettings::default();
        let config = ConnectionConfig::resolve("localhost", &settings).unwrap();
        assert_eq!(config.base_url(), "http://localhost:3001");
        assert_eq!(config.ws_url().as_str(), "ws://localhost:3001/ws");
        assert_eq!(config.timeout(), Duration::from_secs(8));
    }

    #[test]
    fn test_other_hosts_resolve_to_production() {
        let settings = ApiSettings {
            production_url: "https://algo.example.in".to_string(),
            ..ApiSettings::default()
        };
        for host in ["admin.example.in", "127.0.0.1", "localhost.example.in"] {
            let config = ConnectionConfig::resolve(host, &settings).unwrap();
            assert_eq!(config.base_url(), "https://algo.example.in");
            assert_eq!(config.ws_url().as_str(), "wss://algo.example.in/ws");
        }
    }

    #[test]
    fn test_explicit_base_url_wins() {
        let settings = ApiSettings {
            api_base_url: Some("http://10.0.0.5:8000/".to_string()),
            ..ApiSettings::default()
        };
        let config = ConnectionConfig::resolve("localhost", &settings).unwrap();
        assert_eq!(config.base_url(), "http://10.0.0.5:8000");
        assert_eq!(config.ws_url().as_str(), "ws://10.0.0.5:8000/ws");
    }

    #[test]
    fn test_url_for_normalizes_leading_slash() {
        let config = ConnectionConfig::new("http://localhost:3001", Duration::from_secs(8)).unwrap();
        assert_eq!(config.url_for("status").unwrap().as_str(), "http://localhost:3001/status");
        assert_eq!(config.url_for("/trades").unwrap().as_str(), "http://localhost:3001/trades");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ConnectionConfig::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl { .. }));
    }
}

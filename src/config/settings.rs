use ::config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_LOCAL_URL: &str = "http://localhost:3001";
pub const DEFAULT_PRODUCTION_URL: &str = "https://algo-api.evoqins.dev";
pub const DEFAULT_TIMEOUT_MS: u64 = 8_000;
pub const DEFAULT_STATUS_POLL_SECS: u64 = 30;
pub const ENV_PREFIX: &str = "ALGO_ADMIN";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub live: LiveSettings,
    pub broker: BrokerSettings,
}

impl Settings {
    /// Defaults, then the optional TOML file, then `ALGO_ADMIN__SECTION__KEY`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Settings::default())?);

        if let Some(path) = path {
            debug!("Reading settings from {}", path.display());
            builder = builder.add_source(File::from(path).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        info!(
            "Settings loaded: local={}, production={}, timeout={}ms, reconnect={}",
            settings.api.local_url,
            settings.api.production_url,
            settings.api.timeout_ms,
            settings.live.reconnect.name()
        );
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("api.local_url", Some(&self.api.local_url)),
            ("api.production_url", Some(&self.api.production_url)),
            ("api.api_base_url", self.api.api_base_url.as_ref()),
            ("broker.login_url", Some(&self.broker.login_url)),
        ] {
            let Some(value) = value else { continue };
            match url::Url::parse(value) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => errors.push(format!("{} must be http or https, got {}", field, url.scheme())),
                Err(e) => errors.push(format!("{} is not a valid URL: {}", field, e)),
            }
        }

        if self.api.timeout_ms == 0 {
            errors.push("api.timeout_ms must be > 0".to_string());
        }
        if self.live.status_poll_secs == 0 {
            errors.push("live.status_poll_secs must be > 0".to_string());
        }
        if let ReconnectPolicy::Backoff { initial_delay_ms, max_delay_ms, .. } = self.live.reconnect {
            if initial_delay_ms == 0 {
                errors.push("live.reconnect.initial_delay_ms must be > 0".to_string());
            }
            if initial_delay_ms > max_delay_ms {
                errors.push("live.reconnect.initial_delay_ms must be <= max_delay_ms".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Used when the dashboard host is `localhost`.
    pub local_url: String,
    pub production_url: String,
    /// Wins over both of the above when set.
    pub api_base_url: Option<String>,
    pub timeout_ms: u64,
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            local_url: DEFAULT_LOCAL_URL.to_string(),
            production_url: DEFAULT_PRODUCTION_URL.to_string(),
            api_base_url: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSettings {
    pub status_poll_secs: u64,
    pub reconnect: ReconnectPolicy,
}

impl LiveSettings {
    pub fn status_poll(&self) -> Duration {
        Duration::from_secs(self.status_poll_secs)
    }
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            status_poll_secs: DEFAULT_STATUS_POLL_SECS,
            reconnect: ReconnectPolicy::Manual,
        }
    }
}

/// What the live channel does once its socket closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ReconnectPolicy {
    /// Stay closed; the caller reopens if it wants to.
    #[default]
    Manual,
    Backoff {
        initial_delay_ms: u64,
        max_delay_ms: u64,
        max_attempts: u32,
    },
}

impl ReconnectPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            ReconnectPolicy::Manual => "manual",
            ReconnectPolicy::Backoff { .. } => "backoff",
        }
    }

    /// Delay before reconnect attempt number `attempt` (0-based), or `None`
    /// when no further attempt should be made.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        match *self {
            ReconnectPolicy::Manual => None,
            ReconnectPolicy::Backoff { initial_delay_ms, max_delay_ms, max_attempts } => {
                if attempt >= max_attempts {
                    return None;
                }
                let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
                let delay = initial_delay_ms.saturating_mul(factor).min(max_delay_ms);
                Some(Duration::from_millis(delay))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    pub login_url: String,
    pub kite_api_key: Option<String>,
    /// Where the broker sends the user back with `request_token`.
    pub redirect_url: Option<String>,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            login_url: crate::api::KITE_LOGIN_URL.to_string(),
            kite_api_key: None,
            redirect_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.api.timeout(), Duration::from_secs(8));
        assert_eq!(settings.live.status_poll(), Duration::from_secs(30));
        assert_eq!(settings.live.reconnect, ReconnectPolicy::Manual);
    }

    #[test]
    fn test_validation_collects_errors() {
        let mut settings = Settings::default();
        settings.api.timeout_ms = 0;
        settings.api.production_url = "ftp://example.com".to_string();
        settings.live.reconnect = ReconnectPolicy::Backoff {
            initial_delay_ms: 5_000,
            max_delay_ms: 1_000,
            max_attempts: 3,
        };
        let errors = settings.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_manual_policy_never_retries() {
        assert_eq!(ReconnectPolicy::Manual.delay_for(0), None);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = ReconnectPolicy::Backoff {
            initial_delay_ms: 500,
            max_delay_ms: 3_000,
            max_attempts: 5,
        };
        let delays: Vec<_> = (0..6).map(|n| policy.delay_for(n)).collect();
        assert_eq!(
            delays,
            vec![
                Some(Duration::from_millis(500)),
                Some(Duration::from_millis(1_000)),
                Some(Duration::from_millis(2_000)),
                Some(Duration::from_millis(3_000)),
                Some(Duration::from_millis(3_000)),
                None,
            ]
        );
        assert_eq!(
            ReconnectPolicy::Backoff { initial_delay_ms: 1, max_delay_ms: 10, max_attempts: u32::MAX }
                .delay_for(200),
            Some(Duration::from_millis(10))
        );
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!("algo-admin-settings-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[api]
production_url = "https://api.example.in"
timeout_ms = 2500

[live.reconnect]
mode = "backoff"
initial_delay_ms = 250
max_delay_ms = 4000
max_attempts = 6
"#
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.api.production_url, "https://api.example.in");
        assert_eq!(settings.api.local_url, DEFAULT_LOCAL_URL);
        assert_eq!(settings.api.timeout_ms, 2500);
        assert_eq!(
            settings.live.reconnect,
            ReconnectPolicy::Backoff { initial_delay_ms: 250, max_delay_ms: 4000, max_attempts: 6 }
        );
    }
}

use std::time::Duration;

pub type ClientResult<T> = Result<T, ClientError>;

/// Everything a call to the trading API server can fail with. The client
/// never retries; pages decide what to show.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("API request failed with status {status}: {status_text}")]
    Api { status: u16, status_text: String },

    #[error("malformed JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("redirect URL has no request_token parameter")]
    MissingToken,

    #[error("token exchange failed: {0}")]
    Broker(String),
}

impl ClientError {
    pub(crate) fn transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(timeout)
        } else {
            ClientError::Network(err)
        }
    }

    /// `reason` is the phrase the server sent; the standard one for the
    /// code is used when it sent none.
    pub(crate) fn api(status: reqwest::StatusCode, reason: Option<&str>) -> Self {
        let status_text = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .or_else(|| status.canonical_reason())
            .unwrap_or_default()
            .to_string();
        ClientError::Api {
            status: status.as_u16(),
            status_text,
        }
    }

    pub(crate) fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        ClientError::InvalidUrl {
            url: url.into(),
            source,
        }
    }

    /// Server unreachable or silent.
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network(_) | ClientError::Timeout(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let timeout = ClientError::Timeout(Duration::from_secs(8));
        assert!(timeout.is_network());
        assert!(timeout.is_timeout());

        let api = ClientError::Api {
            status: 503,
            status_text: "Service Unavailable".to_string(),
        };
        assert!(!api.is_network());
        assert!(matches!(
            ClientError::api(reqwest::StatusCode::BAD_GATEWAY, None),
            ClientError::Api { status: 502, ref status_text } if status_text == "Bad Gateway"
        ));
        assert!(matches!(
            ClientError::api(reqwest::StatusCode::BAD_GATEWAY, Some("Upstream Down")),
            ClientError::Api { ref status_text, .. } if status_text == "Upstream Down"
        ));
        assert_eq!(
            api.to_string(),
            "API request failed with status 503: Service Unavailable"
        );
    }
}

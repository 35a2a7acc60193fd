//! Kite Connect login: build the broker login URL, pick `request_token` off
//! the redirect, trade it for an access token through the API server.

use reqwest::Method;
use tracing::info;
use url::Url;

use super::{ApiClient, ClientError, ClientResult};
use crate::types::auth::ErrorBody;
use crate::types::{TokenRequest, TokenResponse};

pub const KITE_LOGIN_URL: &str = "https://kite.zerodha.com/connect/login";
pub const KITE_API_VERSION: &str = "3";

pub fn kite_login_url(login_url: &str, api_key: &str, redirect_url: &str) -> ClientResult<Url> {
    let mut url = Url::parse(login_url).map_err(|e| ClientError::invalid_url(login_url, e))?;
    url.query_pairs_mut()
        .append_pair("api_key", api_key)
        .append_pair("v", KITE_API_VERSION)
        .append_pair("redirect_url", redirect_url);
    Ok(url)
}

pub fn extract_request_token(redirect: &str) -> ClientResult<String> {
    let url = Url::parse(redirect).map_err(|e| ClientError::invalid_url(redirect, e))?;
    url.query_pairs()
        .find(|(key, _)| key == "request_token")
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
        .ok_or(ClientError::MissingToken)
}

impl ApiClient {
    pub async fn exchange_request_token(&self, request_token: &str) -> ClientResult<TokenResponse> {
        let url = self.connection().url_for("/api/token-generate")?;
        let body = TokenRequest {
            request_token: request_token.to_string(),
        };
        let resp = self.execute(Method::POST, url, Some(&body)).await?;

        if !resp.status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&resp.body)
                .ok()
                .and_then(|body| body.message);
            return Err(match message {
                Some(message) => ClientError::Broker(message),
                None => resp.api_error(),
            });
        }

        let token: TokenResponse = serde_json::from_slice(&resp.body)?;
        info!("Access token generated");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::time::Duration;

    #[test]
    fn test_login_url_encodes_redirect() {
        let url = kite_login_url(KITE_LOGIN_URL, "abc123", "https://admin.example.in/redirect?from=kite").unwrap();
        assert_eq!(
            url.as_str(),
            "https://kite.zerodha.com/connect/login?api_key=abc123&v=3&redirect_url=https%3A%2F%2Fadmin.example.in%2Fredirect%3Ffrom%3Dkite"
        );
    }

    #[test]
    fn test_extract_request_token() {
        let token = extract_request_token("http://localhost:3000/redirect?action=login&status=success&request_token=tok_42").unwrap();
        assert_eq!(token, "tok_42");

        let err = extract_request_token("http://localhost:3000/redirect?status=success").unwrap_err();
        assert!(matches!(err, ClientError::MissingToken));
        let err = extract_request_token("http://localhost:3000/redirect?request_token=").unwrap_err();
        assert!(matches!(err, ClientError::MissingToken));
    }

    #[tokio::test]
    async fn test_token_exchange() {
        let router = Router::new().route(
            "/api/token-generate",
            post(|Json(body): Json<Value>| async move {
                match body["requestToken"].as_str() {
                    Some("good") => (StatusCode::OK, Json(json!({"accessToken": "acc_1"}))),
                    _ => (StatusCode::BAD_REQUEST, Json(json!({"message": "Token is invalid or has expired"}))),
                }
            }),
        );
        let client = mock::client(&mock::serve(router).await, Duration::from_secs(2));

        let token = client.exchange_request_token("good").await.unwrap();
        assert_eq!(token.access_token, "acc_1");

        let err = client.exchange_request_token("stale").await.unwrap_err();
        match err {
            ClientError::Broker(message) => assert_eq!(message, "Token is invalid or has expired"),
            other => panic!("expected Broker error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_token_exchange_without_message() {
        let router = Router::new().route("/api/token-generate", post(|| async { StatusCode::BAD_GATEWAY }));
        let client = mock::client(&mock::serve(router).await, Duration::from_secs(2));

        let err = client.exchange_request_token("any").await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 502, .. }));
    }
}

use anyhow::{anyhow, bail, Result};

use super::Page;
use crate::api::{extract_request_token, kite_login_url};

pub async fn login(page: &Page, email: &str, password: &str) -> Result<()> {
    let session = page.client().login(email, password).await?;
    println!(
        "Logged in{}",
        session
            .user_id
            .as_deref()
            .map(|id| format!(" as {}", id))
            .unwrap_or_default()
    );
    if let Some(token) = &session.token {
        println!("Session token: {}", token);
    }
    Ok(())
}

pub fn token_url(page: &Page, api_key: Option<&str>, redirect_url: Option<&str>) -> Result<()> {
    let broker = &page.settings().broker;
    let api_key = api_key
        .or(broker.kite_api_key.as_deref())
        .ok_or_else(|| anyhow!("no Kite API key: pass --api-key or set broker.kite_api_key"))?;
    let redirect_url = redirect_url
        .or(broker.redirect_url.as_deref())
        .ok_or_else(|| anyhow!("no redirect URL: pass --redirect-url or set broker.redirect_url"))?;

    let url = kite_login_url(&broker.login_url, api_key, redirect_url)?;
    println!("Open this URL to log in with Kite:\n{}", url);
    Ok(())
}

/// Accepts either the full redirect URL the broker sent the user to, or the
/// bare `request_token`.
pub async fn token_exchange(page: &Page, redirect_or_token: &str) -> Result<()> {
    let input = redirect_or_token.trim();
    if input.is_empty() {
        bail!("no request token given");
    }
    let request_token = if input.contains("://") {
        extract_request_token(input)?
    } else {
        input.to_string()
    };

    let token = page.client().exchange_request_token(&request_token).await?;
    println!("Access token: {}", token.access_token);
    Ok(())
}

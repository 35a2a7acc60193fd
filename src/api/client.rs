use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use super::{ApiStatusResponse, ClientError, ClientResult, ConnectionConfig, ConnectionStatus};
use crate::types::{
    AuthSession, BacktestRequest, BacktestResponse, Exchange, ExchangeUpdate,
    FiveMinBacktestRequest, FiveMinBacktestResponse, HistoricalCandle, HistoricalDataRequest,
    LoginRequest, RunStateUpdate, StatusSnapshot, StrategyConfig, Symbol, TradeRecord,
};

/// Status line and body of a finished exchange.
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub reason: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn api_error(&self) -> ClientError {
        ClientError::api(self.status, self.reason.as_deref())
    }
}

/// Every page talks to the API server through this.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    connection: ConnectionConfig,
}

impl ApiClient {
    pub fn new(connection: ConnectionConfig) -> ClientResult<Self> {
        let client = Client::builder().build().map_err(ClientError::Network)?;
        Ok(Self { client, connection })
    }

    pub fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }

    /// JSON request against `base + path`, bounded by the connection timeout.
    pub async fn request<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.connection.url_for(path)?;
        self.request_url(method, url, body).await
    }

    pub(crate) async fn request_url<B, T>(&self, method: Method, url: Url, body: Option<&B>) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self.execute(method, url, body).await?;
        if !resp.status.is_success() {
            return Err(resp.api_error());
        }
        Ok(serde_json::from_slice(&resp.body)?)
    }

    /// Sends the request and reads the whole body, any status included.
    pub(crate) async fn execute<B>(&self, method: Method, url: Url, body: Option<&B>) -> ClientResult<RawResponse>
    where
        B: Serialize + ?Sized,
    {
        let timeout = self.connection.timeout();
        debug!("Fetching: {} {}", method, url);

        let mut builder = self
            .client
            .request(method.clone(), url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let exchange = async {
            let resp = builder
                .send()
                .await
                .map_err(|e| ClientError::transport(e, timeout))?;
            let status = resp.status();
            let reason = resp
                .extensions()
                .get::<hyper::ext::ReasonPhrase>()
                .and_then(|r| std::str::from_utf8(r.as_bytes()).ok())
                .map(str::to_string);
            let bytes = resp
                .bytes()
                .await
                .map_err(|e| ClientError::transport(e, timeout))?;
            Ok::<_, ClientError>(RawResponse {
                status,
                reason,
                body: bytes.to_vec(),
            })
        };

        let result = match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout(timeout)),
        };

        match &result {
            Ok(resp) if !resp.status.is_success() => {
                warn!("API request failed: {} {} -> {}", method, url.path(), resp.status)
            }
            Err(e) => warn!("API request failed: {} {}: {}", method, url.path(), e),
            _ => {}
        }
        result
    }

    // === Strategy ===

    /// Any 2xx counts; the body is only consulted for an explicit status.
    pub async fn check_status(&self) -> ClientResult<ApiStatusResponse> {
        let url = self.connection.url_for("/api-status")?;
        let resp = self.execute::<()>(Method::GET, url, None).await?;
        if !resp.status.is_success() {
            return Err(resp.api_error());
        }
        Ok(serde_json::from_slice(&resp.body).unwrap_or(ApiStatusResponse {
            status: ConnectionStatus::Online,
        }))
    }

    pub async fn get_strategy_status(&self) -> ClientResult<StatusSnapshot> {
        self.request::<(), _>(Method::GET, "/status", None).await
    }

    pub async fn update_config(&self, config: &StrategyConfig) -> ClientResult<serde_json::Value> {
        info!(
            "Updating strategy config: x={}, y={}, entry={}, sl={}, target={}, lots={}",
            config.x_time, config.y_time, config.entry_time, config.stop_loss, config.target, config.lot_size
        );
        self.request(Method::PUT, "/config", Some(config)).await
    }

    pub async fn update_exchange(&self, exchange: Exchange) -> ClientResult<serde_json::Value> {
        info!("Switching strategy exchange to {}", exchange);
        let body = ExchangeUpdate {
            exchange: exchange.as_str().to_string(),
        };
        self.request(Method::POST, "/update-config", Some(&body)).await
    }

    pub async fn update_status(&self, is_running: bool, exchange: Exchange) -> ClientResult<serde_json::Value> {
        info!(
            "{} strategy on {}",
            if is_running { "Starting" } else { "Stopping" },
            exchange
        );
        let body = RunStateUpdate {
            is_running,
            exchange: exchange.as_str().to_string(),
        };
        self.request(Method::PUT, "/status", Some(&body)).await
    }

    pub async fn get_trades(&self) -> ClientResult<Vec<TradeRecord>> {
        self.request::<(), _>(Method::GET, "/trades", None).await
    }

    // === Symbols ===

    pub async fn search_symbols(&self, query: &str, exchange: Exchange) -> ClientResult<Vec<Symbol>> {
        let mut url = self.connection.url_for("/symbols")?;
        url.query_pairs_mut()
            .append_pair("search", query)
            .append_pair("exchange", exchange.as_str());
        self.request_url::<(), _>(Method::GET, url, None).await
    }

    pub async fn get_symbol(&self, instrument_token: u64) -> ClientResult<Symbol> {
        let path = format!("/symbols/{}", instrument_token);
        self.request::<(), _>(Method::GET, &path, None).await
    }

    // === Backtests and market data ===

    pub async fn run_backtest(&self, params: &BacktestRequest) -> ClientResult<BacktestResponse> {
        info!(
            "Running backtest for {} from {} to {}",
            params.instrument, params.start_date, params.end_date
        );
        self.request(Method::POST, "/backtest", Some(params)).await
    }

    pub async fn run_backtest_5min(&self, params: &FiveMinBacktestRequest) -> ClientResult<FiveMinBacktestResponse> {
        info!(
            "Running 5-minute backtest for {} from {}",
            params.instrument, params.start_date
        );
        self.request(Method::POST, "/backtest_5min", Some(params)).await
    }

    pub async fn get_historical_data(&self, params: &HistoricalDataRequest) -> ClientResult<Vec<HistoricalCandle>> {
        self.request(Method::POST, "/historical-data", Some(params)).await
    }

    // === Session ===

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<AuthSession> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.request(Method::POST, "/auth/login", Some(&body)).await
    }
}

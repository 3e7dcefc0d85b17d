use std::time::Duration;

use rand::Rng;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::fetch_meta::FetchMeta;

/// Back-off window before the single GET retry, in milliseconds.
const RETRY_JITTER_MS: std::ops::RangeInclusive<u64> = 100..=400;

/// Shared HTTP client for every upstream provider.
///
/// GET queries are retried once; JSON-RPC POSTs are not. Each outcome is
/// recorded against the provider host in [`FetchMeta`].
///
/// `call_budget` is the time a caller allows for one logical call. A GET
/// attempt gets [`attempt_timeout`] of it so the retry still fits.
#[derive(Clone)]
pub struct HttpClient {
    http: Client,
    attempt_timeout: Duration,
    meta: FetchMeta,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl HttpClient {
    pub fn new(call_budget: Duration, meta: FetchMeta) -> Self {
        let http = Client::builder()
            .timeout(call_budget)
            .user_agent(concat!("multichain-fee-tracker/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!("Falling back to default HTTP client: {}", err);
                Client::new()
            });

        Self {
            http,
            attempt_timeout: attempt_timeout(call_budget),
            meta,
        }
    }

    pub fn meta(&self) -> &FetchMeta {
        &self.meta
    }

    /// GET `url` and decode the JSON body, retrying once on a retryable
    /// failure.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        let result = match self.get_json_once(url).await {
            Ok(value) => Ok(value),
            Err(err) if is_retryable(&err) => {
                let delay = rand::thread_rng().gen_range(RETRY_JITTER_MS);
                tracing::debug!("Retrying {} in {}ms after: {}", provider_id(url), delay, err);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                self.get_json_once(url).await
            }
            Err(err) => Err(err),
        };
        self.record(url, &result);
        result
    }

    async fn get_json_once<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        let response = self
            .http
            .get(url)
            .timeout(self.attempt_timeout)
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            return Err(ProviderError::Status {
                status: response.status().as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|err| ProviderError::format(err.to_string()))
    }

    /// Issue one JSON-RPC 2.0 call and decode its `result`.
    pub async fn rpc_call<T: DeserializeOwned>(
        &self,
        url: &str,
        method: &str,
        params: Value,
    ) -> Result<T, ProviderError> {
        let result = self.rpc_call_inner(url, method, params).await;
        self.record(url, &result);
        result
    }

    async fn rpc_call_inner<T: DeserializeOwned>(
        &self,
        url: &str,
        method: &str,
        params: Value,
    ) -> Result<T, ProviderError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            return Err(ProviderError::Status {
                status: response.status().as_u16(),
            });
        }

        let decoded = response
            .json::<RpcResponse<T>>()
            .await
            .map_err(|err| ProviderError::format(err.to_string()))?;

        if let Some(error) = decoded.error {
            return Err(ProviderError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        decoded
            .result
            .ok_or_else(|| ProviderError::format(format!("{} returned no result", method)))
    }

    fn record<T>(&self, url: &str, result: &Result<T, ProviderError>) {
        let provider = provider_id(url);
        match result {
            Ok(_) => self.meta.record_success(&provider),
            Err(err) => self.meta.record_failure(&provider, &err.to_string()),
        }
    }
}

/// Per-attempt GET timeout: two attempts plus the longest back-off fit in
/// `call_budget`.
pub fn attempt_timeout(call_budget: Duration) -> Duration {
    let jitter = Duration::from_millis(*RETRY_JITTER_MS.end());
    (call_budget.saturating_sub(jitter) / 2).max(call_budget / 4)
}

fn map_transport(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::unavailable(err.to_string())
    }
}

fn is_retryable(err: &ProviderError) -> bool {
    match err {
        ProviderError::Unavailable { .. } | ProviderError::Timeout => true,
        ProviderError::Status { status } => *status == 429 || *status >= 500,
        _ => false,
    }
}

/// Provider identifier for a URL: its host, or the raw string if it does
/// not parse.
pub fn provider_id(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn client() -> HttpClient {
        HttpClient::new(Duration::from_secs(2), FetchMeta::new(Duration::from_secs(60)))
    }

    #[test]
    fn provider_id_is_the_host() {
        assert_eq!(provider_id("https://mempool.space/api/v1/fees"), "mempool.space");
        assert_eq!(provider_id("https://s1.ripple.com:51234"), "s1.ripple.com");
        assert_eq!(provider_id("not a url"), "not a url");
    }

    #[tokio::test]
    async fn get_json_retries_once_after_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fees"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fees"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "fee": 7 })))
            .mount(&server)
            .await;

        let value: Value = client().get_json(&format!("{}/fees", server.uri())).await.unwrap();
        assert_eq!(value["fee"], json!(7));
    }

    #[tokio::test]
    async fn get_json_gives_up_after_second_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let http = client();
        let err = http
            .get_json::<Value>(&format!("{}/fees", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::Status { status: 500 });
        assert_eq!(http.meta().stats("127.0.0.1").unwrap().failures, 1);
    }

    #[test]
    fn two_attempts_and_backoff_fit_the_call_budget() {
        let budget = Duration::from_secs(2);
        let attempt = attempt_timeout(budget);
        assert_eq!(attempt, Duration::from_millis(800));
        assert!(attempt * 2 + Duration::from_millis(*RETRY_JITTER_MS.end()) <= budget);
        assert!(attempt_timeout(Duration::from_millis(200)) > Duration::ZERO);
    }

    #[tokio::test]
    async fn get_json_retries_after_a_slow_first_attempt_within_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fees"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "fee": 1 }))
                    .set_delay(Duration::from_secs(3)),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fees"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "fee": 9 })))
            .mount(&server)
            .await;

        let budget = Duration::from_secs(2);
        let http = HttpClient::new(budget, FetchMeta::new(Duration::from_secs(60)));
        let value: Value = tokio::time::timeout(budget, http.get_json(&format!("{}/fees", server.uri())))
            .await
            .expect("retry should finish inside the call budget")
            .unwrap();

        assert_eq!(value["fee"], json!(9));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rpc_call_surfaces_json_rpc_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32601, "message": "method not found" }
            })))
            .mount(&server)
            .await;

        let err = client()
            .rpc_call::<String>(&server.uri(), "eth_gasPrice", json!([]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Rpc { code: -32601, .. }));
    }

    #[tokio::test]
    async fn rpc_call_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let result = client()
            .rpc_call::<String>(&server.uri(), "eth_gasPrice", json!([]))
            .await;
        assert!(result.is_err());
    }
}

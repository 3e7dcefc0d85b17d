//! EVM gas-price provider.
//!
//! `eth_gasPrice` is asked of the RPC list in order until one answers; a
//! block-explorer gas oracle is queried alongside it as an independent
//! source.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{json, Value};

use super::{gas_fee_native, measured_candidate, GasCandidateProvider, ProviderSettings};
use crate::chains::{ChainConfig, EndpointApi};
use crate::error::ProviderError;
use crate::services::fallback::{gather_settled, race_or_fallback, ProviderThunk};
use crate::services::http::HttpClient;
use crate::types::{FeeCandidate, RawUnits};

const WEI_PER_GWEI: f64 = 1e9;

/// Parse a JSON-RPC hex quantity (`0x...`). Values wider than 128 bits are
/// rejected.
pub(crate) fn parse_hex_quantity(raw: &str) -> Result<u128, ProviderError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| ProviderError::format(format!("not a hex quantity: {}", raw)))?;
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|err| ProviderError::implausible(format!("hex quantity {}: {}", raw, err)))
}

/// Reject gas prices that are non-positive or above the chain's ceiling.
pub(crate) fn check_gas_price(chain: &ChainConfig, gwei: f64) -> Result<f64, ProviderError> {
    if !gwei.is_finite() || gwei <= 0.0 {
        return Err(ProviderError::implausible(format!("gas price {} gwei", gwei)));
    }
    if gwei > chain.aux.max_gas_price_gwei {
        return Err(ProviderError::implausible(format!(
            "gas price {} gwei above ceiling {}",
            gwei, chain.aux.max_gas_price_gwei
        )));
    }
    Ok(gwei)
}

pub(crate) async fn rpc_gas_price_gwei(http: &HttpClient, url: &str) -> Result<f64, ProviderError> {
    let raw: String = http.rpc_call(url, "eth_gasPrice", json!([])).await?;
    Ok(parse_hex_quantity(&raw)? as f64 / WEI_PER_GWEI)
}

/// Ordered `eth_gasPrice` attempts across the chain's RPC endpoints. Each
/// thunk yields `(url, gwei)` and fails on implausible prices so the next
/// endpoint gets a turn.
pub(crate) fn rpc_gas_price_thunks<'a>(
    http: &'a HttpClient,
    chain: &'a ChainConfig,
) -> Vec<ProviderThunk<'a, (String, f64)>> {
    chain
        .endpoints_for(EndpointApi::EvmRpc)
        .map(|endpoint| {
            let url = endpoint.url.as_str();
            let thunk: ProviderThunk<'a, (String, f64)> = Box::new(move || {
                async move {
                    let gwei = rpc_gas_price_gwei(http, url).await?;
                    Ok((url.to_string(), check_gas_price(chain, gwei)?))
                }
                .boxed()
            });
            thunk
        })
        .collect()
}

pub struct EvmProvider {
    http: HttpClient,
    settings: ProviderSettings,
}

impl EvmProvider {
    pub fn new(http: HttpClient, settings: ProviderSettings) -> Self {
        Self { http, settings }
    }

    fn oracle_url(&self, base: &str) -> String {
        let mut url = format!("{}?module=gastracker&action=gasoracle", base);
        if let Some(key) = &self.settings.etherscan_api_key {
            url.push_str("&apikey=");
            url.push_str(key);
        }
        url
    }

    /// Proposed gas price from an Etherscan-style gas oracle, in gwei.
    async fn oracle_gas_price(&self, base: &str) -> Result<f64, ProviderError> {
        let body: Value = self.http.get_json(&self.oracle_url(base)).await?;

        if body["status"].as_str() != Some("1") {
            return Err(ProviderError::unavailable(format!(
                "gas oracle rejected request: {}",
                body["result"].as_str().unwrap_or("unknown reason")
            )));
        }

        let proposed = &body["result"]["ProposeGasPrice"];
        proposed
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .or_else(|| proposed.as_f64())
            .ok_or_else(|| ProviderError::format("gas oracle response missing ProposeGasPrice"))
    }
}

#[async_trait]
impl GasCandidateProvider for EvmProvider {
    fn name(&self) -> &str {
        "evm-gas-price"
    }

    async fn fetch_candidates(
        &self,
        chain: &ChainConfig,
        _l1_gas_price_gwei: Option<f64>,
    ) -> Vec<FeeCandidate> {
        let gas_limit = chain.aux.gas_limit;
        let to_candidate = |url: &str, gwei: f64| {
            measured_candidate(
                chain,
                url,
                gas_fee_native(chain, gwei, gas_limit),
                RawUnits::GasPriceGwei(gwei),
            )
        };

        let rpc = async {
            let thunks = rpc_gas_price_thunks(&self.http, chain);
            if thunks.is_empty() {
                return None;
            }
            match race_or_fallback(thunks, self.settings.per_call_timeout, self.settings.total_timeout).await {
                Ok((url, gwei)) => Some(to_candidate(&url, gwei)),
                Err(err) => {
                    tracing::warn!("{}: every gas price RPC failed: {}", chain.key, err);
                    None
                }
            }
        };

        let oracle_calls: Vec<(String, BoxFuture<'_, Result<FeeCandidate, ProviderError>>)> = chain
            .endpoints_for(EndpointApi::GasOracle)
            .map(|endpoint| {
                let url = endpoint.url.as_str();
                let call = async move {
                    let gwei = check_gas_price(chain, self.oracle_gas_price(url).await?)?;
                    Ok(to_candidate(url, gwei))
                }
                .boxed();
                (endpoint.url.clone(), call)
            })
            .collect();
        let oracle = gather_settled(oracle_calls, self.settings.per_call_timeout);

        let (rpc_candidate, oracle_candidates) = tokio::join!(rpc, oracle);

        rpc_candidate.into_iter().chain(oracle_candidates).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::{ChainType, Endpoint};
    use crate::gas::test_support::{chain, http, settings};
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn gas_price_response(hex: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": hex }))
    }

    #[test]
    fn parses_hex_quantities() {
        assert_eq!(parse_hex_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_hex_quantity("0x3b9aca00").unwrap(), 1_000_000_000);
        assert_eq!(parse_hex_quantity("0x000000000000000000000000000000000000000000000000000000003b9aca00").unwrap(), 1_000_000_000);
        assert!(parse_hex_quantity("1234").is_err());
        assert!(parse_hex_quantity(&format!("0x1{}", "0".repeat(40))).is_err());
    }

    #[test]
    fn gas_price_ceiling_is_enforced() {
        let eth = chain("ethereum", ChainType::Evm, 18, vec![]);
        assert!(check_gas_price(&eth, 0.0).is_err());
        assert!(check_gas_price(&eth, -1.0).is_err());
        assert!(check_gas_price(&eth, 20_000.0).is_err());
        assert_eq!(check_gas_price(&eth, 25.0).unwrap(), 25.0);
    }

    #[tokio::test]
    async fn falls_back_to_next_rpc_and_queries_oracle() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rpc-down"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        // 20 gwei
        Mock::given(method("POST"))
            .and(path("/rpc-up"))
            .respond_with(gas_price_response("0x4a817c800"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/oracle"))
            .and(query_param("module", "gastracker"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "1",
                "message": "OK",
                "result": { "SafeGasPrice": "9", "ProposeGasPrice": "10", "FastGasPrice": "12" }
            })))
            .mount(&server)
            .await;

        let eth = chain(
            "ethereum",
            ChainType::Evm,
            18,
            vec![
                Endpoint::new(format!("{}/rpc-down", server.uri()), EndpointApi::EvmRpc),
                Endpoint::new(format!("{}/rpc-up", server.uri()), EndpointApi::EvmRpc),
                Endpoint::new(format!("{}/oracle", server.uri()), EndpointApi::GasOracle),
            ],
        );

        let candidates = EvmProvider::new(http(), settings()).fetch_candidates(&eth, None).await;

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].raw_units, RawUnits::GasPriceGwei(20.0));
        // 20 gwei * 21000 gas = 0.00042 ETH
        assert!((candidates[0].fee_native - 0.000_42).abs() < 1e-12);
        assert_eq!(candidates[1].raw_units, RawUnits::GasPriceGwei(10.0));
    }

    #[tokio::test]
    async fn implausible_rpc_price_falls_through_to_next_endpoint() {
        let server = MockServer::start().await;
        // 1e15 gwei, far above the ceiling
        Mock::given(method("POST"))
            .and(path("/absurd"))
            .respond_with(gas_price_response("0xde0b6b3a7640000000000"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/sane"))
            .respond_with(gas_price_response("0x3b9aca00"))
            .mount(&server)
            .await;

        let eth = chain(
            "ethereum",
            ChainType::Evm,
            18,
            vec![
                Endpoint::new(format!("{}/absurd", server.uri()), EndpointApi::EvmRpc),
                Endpoint::new(format!("{}/sane", server.uri()), EndpointApi::EvmRpc),
            ],
        );

        let candidates = EvmProvider::new(http(), settings()).fetch_candidates(&eth, None).await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].raw_units, RawUnits::GasPriceGwei(1.0));
    }

    #[tokio::test]
    async fn oracle_error_status_yields_no_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "0", "message": "NOTOK", "result": "Invalid API Key"
            })))
            .mount(&server)
            .await;

        let eth = chain(
            "ethereum",
            ChainType::Evm,
            18,
            vec![Endpoint::new(server.uri(), EndpointApi::GasOracle)],
        );
        let candidates = EvmProvider::new(http(), settings()).fetch_candidates(&eth, None).await;
        assert!(candidates.is_empty());
    }
}

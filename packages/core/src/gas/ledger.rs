//! Ledger-fee provider: rippled `fee` and Stellar Horizon `/fee_stats`.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Deserialize;
use serde_json::json;

use super::{measured_candidate, GasCandidateProvider, ProviderSettings};
use crate::chains::{ChainConfig, Endpoint, EndpointApi};
use crate::error::ProviderError;
use crate::services::fallback::gather_settled;
use crate::services::http::HttpClient;
use crate::types::{FeeCandidate, RawUnits};

/// Reference transaction cost on the XRP ledger.
pub const DEFAULT_XRP_FEE_DROPS: f64 = 12.0;

/// Stellar minimum base fee per operation.
pub const DEFAULT_STELLAR_FEE_STROOPS: f64 = 100.0;

#[derive(Debug, Deserialize)]
struct RippledFeeResult {
    drops: RippledDrops,
}

#[derive(Debug, Deserialize)]
struct RippledDrops {
    open_ledger_fee: String,
    base_fee: String,
}

#[derive(Debug, Deserialize)]
pub struct HorizonFeeStats {
    pub last_ledger_base_fee: String,
    pub fee_charged: FeeCharged,
}

#[derive(Debug, Deserialize)]
pub struct FeeCharged {
    pub p50: String,
}

fn parse_units(raw: &str, what: &str) -> Result<f64, ProviderError> {
    let value = raw
        .parse::<f64>()
        .map_err(|err| ProviderError::format(format!("invalid {} '{}': {}", what, raw, err)))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(ProviderError::implausible(format!("{} {}", what, value)));
    }
    Ok(value)
}

pub struct LedgerProvider {
    http: HttpClient,
    settings: ProviderSettings,
}

impl LedgerProvider {
    pub fn new(http: HttpClient, settings: ProviderSettings) -> Self {
        Self { http, settings }
    }

    async fn rippled_drops(&self, url: &str) -> Result<f64, ProviderError> {
        let result: RippledFeeResult = self.http.rpc_call(url, "fee", json!([{}])).await?;
        parse_units(&result.drops.open_ledger_fee, "open_ledger_fee")
            .or_else(|_| parse_units(&result.drops.base_fee, "base_fee"))
    }

    async fn horizon_stroops(&self, url: &str) -> Result<f64, ProviderError> {
        let stats: HorizonFeeStats = self
            .http
            .get_json(&format!("{}/fee_stats", url.trim_end_matches('/')))
            .await?;
        parse_units(&stats.fee_charged.p50, "fee_charged.p50")
            .or_else(|_| parse_units(&stats.last_ledger_base_fee, "last_ledger_base_fee"))
    }

    async fn candidate(&self, chain: &ChainConfig, endpoint: &Endpoint) -> Result<FeeCandidate, ProviderError> {
        let url = endpoint.url.as_str();
        let (smallest, raw_units) = match endpoint.api {
            EndpointApi::Rippled => {
                let drops = self.rippled_drops(url).await?;
                (drops, RawUnits::Drops(drops))
            }
            EndpointApi::Horizon => {
                let stroops = self.horizon_stroops(url).await?;
                (stroops, RawUnits::Stroops(stroops))
            }
            other => {
                return Err(ProviderError::format(format!(
                    "{:?} is not a ledger fee endpoint",
                    other
                )))
            }
        };
        Ok(measured_candidate(chain, url, chain.to_native(smallest), raw_units))
    }

    fn heuristic(&self, chain: &ChainConfig) -> Option<FeeCandidate> {
        let (smallest, raw_units) = if chain.endpoints_for(EndpointApi::Horizon).next().is_some() {
            (DEFAULT_STELLAR_FEE_STROOPS, RawUnits::Stroops(DEFAULT_STELLAR_FEE_STROOPS))
        } else if chain.endpoints_for(EndpointApi::Rippled).next().is_some() {
            (DEFAULT_XRP_FEE_DROPS, RawUnits::Drops(DEFAULT_XRP_FEE_DROPS))
        } else {
            return None;
        };
        Some(FeeCandidate::fallback(
            chain.key.clone(),
            "heuristic",
            chain.to_native(smallest),
            raw_units,
        ))
    }
}

#[async_trait]
impl GasCandidateProvider for LedgerProvider {
    fn name(&self) -> &str {
        "ledger-fee"
    }

    async fn fetch_candidates(
        &self,
        chain: &ChainConfig,
        _l1_gas_price_gwei: Option<f64>,
    ) -> Vec<FeeCandidate> {
        let calls: Vec<(String, BoxFuture<'_, Result<FeeCandidate, ProviderError>>)> = chain
            .endpoints
            .iter()
            .filter(|e| matches!(e.api, EndpointApi::Rippled | EndpointApi::Horizon))
            .map(|endpoint| (endpoint.url.clone(), self.candidate(chain, endpoint).boxed()))
            .collect();

        let candidates = gather_settled(calls, self.settings.per_call_timeout).await;
        if !candidates.is_empty() {
            return candidates;
        }

        let fallback = self.heuristic(chain);
        if fallback.is_some() {
            tracing::warn!("{}: ledger fee endpoints unreachable, using heuristic fee", chain.key);
        }
        fallback.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::ChainType;
    use crate::gas::test_support::{chain, http, settings};
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn reads_open_ledger_fee_from_rippled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "drops": {
                        "base_fee": "10",
                        "median_fee": "5000",
                        "minimum_fee": "10",
                        "open_ledger_fee": "15"
                    },
                    "status": "success"
                }
            })))
            .mount(&server)
            .await;

        let xrp = chain("xrp", ChainType::Ledger, 6, vec![Endpoint::new(server.uri(), EndpointApi::Rippled)]);
        let candidates = LedgerProvider::new(http(), settings()).fetch_candidates(&xrp, None).await;

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].raw_units, RawUnits::Drops(15.0));
        assert!((candidates[0].fee_native - 0.000_015).abs() < 1e-15);
    }

    #[tokio::test]
    async fn reads_median_fee_from_horizon() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fee_stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "last_ledger": "1000",
                "last_ledger_base_fee": "100",
                "fee_charged": { "max": "5000", "min": "100", "p50": "150", "p95": "800" }
            })))
            .mount(&server)
            .await;

        let xlm = chain("stellar", ChainType::Ledger, 7, vec![Endpoint::new(server.uri(), EndpointApi::Horizon)]);
        let candidates = LedgerProvider::new(http(), settings()).fetch_candidates(&xlm, None).await;

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].raw_units, RawUnits::Stroops(150.0));
        assert!((candidates[0].fee_native - 0.000_015).abs() < 1e-15);
    }

    #[tokio::test]
    async fn unreachable_horizon_yields_heuristic_stroops() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let xlm = chain("stellar", ChainType::Ledger, 7, vec![Endpoint::new(server.uri(), EndpointApi::Horizon)]);
        let candidates = LedgerProvider::new(http(), settings()).fetch_candidates(&xlm, None).await;

        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].is_fallback);
        assert_eq!(candidates[0].raw_units, RawUnits::Stroops(DEFAULT_STELLAR_FEE_STROOPS));
    }

    #[tokio::test]
    async fn chain_without_ledger_endpoints_yields_nothing() {
        let xrp = chain("xrp", ChainType::Ledger, 6, vec![]);
        let candidates = LedgerProvider::new(http(), settings()).fetch_candidates(&xrp, None).await;
        assert!(candidates.is_empty());
    }
}

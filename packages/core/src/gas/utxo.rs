//! UTXO fee-rate provider (mempool.space, Esplora, BlockCypher).

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Deserialize;

use super::{measured_candidate, GasCandidateProvider, ProviderSettings};
use crate::chains::{ChainConfig, Endpoint, EndpointApi};
use crate::error::ProviderError;
use crate::services::fallback::gather_settled;
use crate::services::http::HttpClient;
use crate::types::{FeeCandidate, RawUnits};

/// Confirmation target, in blocks, read from Esplora estimates.
const ESPLORA_TARGET_BLOCKS: u32 = 3;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MempoolRecommended {
    half_hour_fee: f64,
}

#[derive(Debug, Deserialize)]
struct BlockCypherChain {
    medium_fee_per_kb: f64,
}

pub struct UtxoProvider {
    http: HttpClient,
    settings: ProviderSettings,
}

impl UtxoProvider {
    pub fn new(http: HttpClient, settings: ProviderSettings) -> Self {
        Self { http, settings }
    }

    /// Recommended fee-rate in smallest units per virtual byte.
    async fn fee_rate(&self, endpoint: &Endpoint) -> Result<f64, ProviderError> {
        let base = endpoint.url.trim_end_matches('/');
        let rate = match endpoint.api {
            EndpointApi::MempoolSpace => {
                let url = format!("{}/api/v1/fees/recommended", base);
                self.http.get_json::<MempoolRecommended>(&url).await?.half_hour_fee
            }
            EndpointApi::Esplora => {
                let url = format!("{}/fee-estimates", base);
                let estimates = self.http.get_json::<HashMap<String, f64>>(&url).await?;
                esplora_rate(&estimates, ESPLORA_TARGET_BLOCKS)?
            }
            EndpointApi::BlockCypher => {
                self.http.get_json::<BlockCypherChain>(base).await?.medium_fee_per_kb / 1000.0
            }
            other => {
                return Err(ProviderError::format(format!(
                    "{:?} is not a fee-rate endpoint",
                    other
                )))
            }
        };

        if !rate.is_finite() || rate <= 0.0 {
            return Err(ProviderError::implausible(format!("fee-rate {}", rate)));
        }
        Ok(rate)
    }
}

/// Rate for the smallest target at or above `target`; if none, the
/// slowest target available.
fn esplora_rate(estimates: &HashMap<String, f64>, target: u32) -> Result<f64, ProviderError> {
    let mut by_target: Vec<(u32, f64)> = estimates
        .iter()
        .filter_map(|(k, v)| k.parse::<u32>().ok().map(|t| (t, *v)))
        .collect();
    by_target.sort_by_key(|(t, _)| *t);

    by_target
        .iter()
        .find(|(t, _)| *t >= target)
        .or_else(|| by_target.last())
        .map(|(_, rate)| *rate)
        .ok_or_else(|| ProviderError::format("empty fee-estimates response"))
}

#[async_trait]
impl GasCandidateProvider for UtxoProvider {
    fn name(&self) -> &str {
        "utxo-fee-rate"
    }

    async fn fetch_candidates(
        &self,
        chain: &ChainConfig,
        _l1_gas_price_gwei: Option<f64>,
    ) -> Vec<FeeCandidate> {
        let calls: Vec<(String, BoxFuture<'_, Result<FeeCandidate, ProviderError>>)> = chain
            .endpoints
            .iter()
            .filter(|e| {
                matches!(
                    e.api,
                    EndpointApi::MempoolSpace | EndpointApi::Esplora | EndpointApi::BlockCypher
                )
            })
            .map(|endpoint| {
                let call = async move {
                    let rate = self.fee_rate(endpoint).await?;
                    let native = chain.to_native(rate * chain.aux.tx_vbytes);
                    Ok(measured_candidate(chain, &endpoint.url, native, RawUnits::FeeRate(rate)))
                }
                .boxed();
                (endpoint.url.clone(), call)
            })
            .collect();

        gather_settled(calls, self.settings.per_call_timeout).await
    }
}

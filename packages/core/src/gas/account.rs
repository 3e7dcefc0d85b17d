//! Account-model (non-EVM) provider: Solana-style lamport fees.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Deserialize;
use serde_json::json;

use super::{measured_candidate, GasCandidateProvider, ProviderSettings};
use crate::chains::{ChainConfig, EndpointApi};
use crate::consensus::median::lower_median;
use crate::error::ProviderError;
use crate::services::fallback::gather_settled;
use crate::services::http::HttpClient;
use crate::types::{FeeCandidate, RawUnits};

/// Base fee charged per signature. Also the fallback when every RPC is
/// unreachable.
pub const DEFAULT_LAMPORTS_PER_SIGNATURE: f64 = 5_000.0;

/// Compute units assumed for a simple transfer when pricing the priority fee.
pub const DEFAULT_COMPUTE_UNITS: f64 = 200_000.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrioritizationFee {
    prioritization_fee: u64,
}

pub struct AccountModelProvider {
    http: HttpClient,
    settings: ProviderSettings,
}

impl AccountModelProvider {
    pub fn new(http: HttpClient, settings: ProviderSettings) -> Self {
        Self { http, settings }
    }

    /// Total lamports for a one-signature transfer at the median recent
    /// priority fee.
    async fn transfer_lamports(&self, url: &str) -> Result<f64, ProviderError> {
        let fees: Vec<PrioritizationFee> = self
            .http
            .rpc_call(url, "getRecentPrioritizationFees", json!([]))
            .await?;

        let micro_lamports: Vec<f64> = fees.iter().map(|f| f.prioritization_fee as f64).collect();
        let median_micro = lower_median(&micro_lamports).unwrap_or(0.0);

        Ok(DEFAULT_LAMPORTS_PER_SIGNATURE + median_micro * DEFAULT_COMPUTE_UNITS / 1_000_000.0)
    }
}

#[async_trait]
impl GasCandidateProvider for AccountModelProvider {
    fn name(&self) -> &str {
        "account-model-fee"
    }

    async fn fetch_candidates(
        &self,
        chain: &ChainConfig,
        _l1_gas_price_gwei: Option<f64>,
    ) -> Vec<FeeCandidate> {
        let calls: Vec<(String, BoxFuture<'_, Result<FeeCandidate, ProviderError>>)> = chain
            .endpoints_for(EndpointApi::SolanaRpc)
            .map(|endpoint| {
                let url = endpoint.url.as_str();
                let call = async move {
                    let lamports = self.transfer_lamports(url).await?;
                    Ok(measured_candidate(
                        chain,
                        url,
                        chain.to_native(lamports),
                        RawUnits::Lamports(lamports),
                    ))
                }
                .boxed();
                (endpoint.url.clone(), call)
            })
            .collect();

        let candidates = gather_settled(calls, self.settings.per_call_timeout).await;
        if !candidates.is_empty() {
            return candidates;
        }

        tracing::warn!(
            "{}: fee RPC unreachable, assuming {} lamports per signature",
            chain.key,
            DEFAULT_LAMPORTS_PER_SIGNATURE
        );
        vec![FeeCandidate::fallback(
            chain.key.clone(),
            "heuristic",
            chain.to_native(DEFAULT_LAMPORTS_PER_SIGNATURE),
            RawUnits::Lamports(DEFAULT_LAMPORTS_PER_SIGNATURE),
        )]
    }
}

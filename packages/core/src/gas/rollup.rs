//! Rollup (L2) provider.
//!
//! fee = L2 gas price × L2 gas limit + L1 gas price × L1 data gas
//!
//! The L1 gas price comes from the base-layer phase of the snapshot when
//! available, else from the rollup's own OP-stack `GasPriceOracle`. With
//! neither, `DEFAULT_L1_GAS_PRICE_GWEI` is used and the candidate is marked
//! as a fallback.

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::json;

use super::evm::{parse_hex_quantity, rpc_gas_price_thunks};
use super::{gas_fee_native, GasCandidateProvider, ProviderSettings};
use crate::chains::{ChainConfig, EndpointApi};
use crate::error::ProviderError;
use crate::services::fallback::{race_or_fallback, ProviderThunk};
use crate::services::http::{provider_id, HttpClient};
use crate::types::{FeeCandidate, RawUnits};

/// L1 gas price assumed when neither the base-layer phase nor an on-chain
/// oracle supplies one. Heuristic; recalibrate periodically.
pub const DEFAULT_L1_GAS_PRICE_GWEI: f64 = 15.0;

/// OP-stack `GasPriceOracle` predeploy.
pub const OP_GAS_PRICE_ORACLE_ADDRESS: &str = "0x420000000000000000000000000000000000000F";

/// bytes4(keccak256("l1BaseFee()"))
const L1_BASE_FEE_SELECTOR: &str = "0x519b4bd3";

pub struct RollupProvider {
    http: HttpClient,
    settings: ProviderSettings,
}

impl RollupProvider {
    pub fn new(http: HttpClient, settings: ProviderSettings) -> Self {
        Self { http, settings }
    }

    async fn oracle_l1_base_fee_gwei(&self, url: &str) -> Result<f64, ProviderError> {
        let call = json!({ "to": OP_GAS_PRICE_ORACLE_ADDRESS, "data": L1_BASE_FEE_SELECTOR });
        let raw: String = self.http.rpc_call(url, "eth_call", json!([call, "latest"])).await?;
        let gwei = parse_hex_quantity(&raw)? as f64 / 1e9;
        if !gwei.is_finite() || gwei <= 0.0 {
            return Err(ProviderError::implausible(format!("l1BaseFee {} gwei", gwei)));
        }
        Ok(gwei)
    }

    /// L1 gas price from the rollup's own oracle endpoints, if any answers.
    async fn l1_from_oracle(&self, chain: &ChainConfig) -> Option<f64> {
        let thunks: Vec<ProviderThunk<'_, f64>> = chain
            .endpoints_for(EndpointApi::OpGasPriceOracle)
            .map(|endpoint| {
                let url = endpoint.url.as_str();
                let thunk: ProviderThunk<'_, f64> =
                    Box::new(move || self.oracle_l1_base_fee_gwei(url).boxed());
                thunk
            })
            .collect();

        if thunks.is_empty() {
            return None;
        }

        match race_or_fallback(thunks, self.settings.per_call_timeout, self.settings.total_timeout).await {
            Ok(gwei) => Some(gwei),
            Err(err) => {
                tracing::warn!("{}: gas price oracle unavailable: {}", chain.key, err);
                None
            }
        }
    }
}

#[async_trait]
impl GasCandidateProvider for RollupProvider {
    fn name(&self) -> &str {
        "rollup-layered-gas"
    }

    async fn fetch_candidates(
        &self,
        chain: &ChainConfig,
        l1_gas_price_gwei: Option<f64>,
    ) -> Vec<FeeCandidate> {
        let thunks = rpc_gas_price_thunks(&self.http, chain);
        let (url, l2_gwei) =
            match race_or_fallback(thunks, self.settings.per_call_timeout, self.settings.total_timeout).await {
                Ok(found) => found,
                Err(err) => {
                    tracing::warn!("{}: no L2 gas price available: {}", chain.key, err);
                    return Vec::new();
                }
            };

        let shared_l1 = l1_gas_price_gwei.filter(|g| g.is_finite() && *g > 0.0);
        let (l1_gwei, measured) = match shared_l1 {
            Some(gwei) => (gwei, true),
            None => match self.l1_from_oracle(chain).await {
                Some(gwei) => (gwei, true),
                None => {
                    tracing::warn!(
                        "{}: using default L1 gas price {} gwei",
                        chain.key,
                        DEFAULT_L1_GAS_PRICE_GWEI
                    );
                    (DEFAULT_L1_GAS_PRICE_GWEI, false)
                }
            },
        };

        let fee_native = gas_fee_native(chain, l2_gwei, chain.aux.gas_limit)
            + gas_fee_native(chain, l1_gwei, chain.aux.l1_data_gas);
        let raw_units = RawUnits::Layered { l2_gwei, l1_gwei };

        let candidate = if measured {
            FeeCandidate::measured(chain.key.clone(), provider_id(&url), fee_native, raw_units)
        } else {
            FeeCandidate::fallback(chain.key.clone(), provider_id(&url), fee_native, raw_units)
        };
        vec![candidate]
    }
}

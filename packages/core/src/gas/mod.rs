//! Gas candidate providers
//!
//! One strategy per chain type. A provider never fails as a whole: every
//! upstream error is caught and logged, and simply yields fewer candidates.

pub mod account;
pub mod evm;
pub mod ledger;
pub mod rollup;
pub mod utxo;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::chains::{ChainConfig, ChainType};
use crate::services::http::{provider_id, HttpClient};
use crate::types::{FeeCandidate, RawUnits};

pub use account::AccountModelProvider;
pub use evm::EvmProvider;
pub use ledger::LedgerProvider;
pub use rollup::RollupProvider;
pub use utxo::UtxoProvider;

/// Trait for per-chain-type fee candidate sources.
#[async_trait]
pub trait GasCandidateProvider: Send + Sync {
    /// Name of this strategy for logging.
    fn name(&self) -> &str;

    /// Query every configured endpoint for `chain`. `l1_gas_price_gwei` is
    /// only consulted by rollup providers.
    async fn fetch_candidates(
        &self,
        chain: &ChainConfig,
        l1_gas_price_gwei: Option<f64>,
    ) -> Vec<FeeCandidate>;
}

/// Timeouts and credentials shared by all providers.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub per_call_timeout: Duration,
    pub total_timeout: Duration,
    pub etherscan_api_key: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            per_call_timeout: Duration::from_secs(8),
            total_timeout: Duration::from_secs(15),
            etherscan_api_key: None,
        }
    }
}

/// Pick the strategy for a chain type.
pub fn provider_for(
    chain_type: ChainType,
    http: HttpClient,
    settings: ProviderSettings,
) -> Arc<dyn GasCandidateProvider> {
    match chain_type {
        ChainType::Utxo => Arc::new(UtxoProvider::new(http, settings)),
        ChainType::Evm => Arc::new(EvmProvider::new(http, settings)),
        ChainType::Rollup => Arc::new(RollupProvider::new(http, settings)),
        ChainType::AccountModel => Arc::new(AccountModelProvider::new(http, settings)),
        ChainType::Ledger => Arc::new(LedgerProvider::new(http, settings)),
    }
}

/// Candidate stamped with the host of the endpoint that produced it.
pub(crate) fn measured_candidate(
    chain: &ChainConfig,
    url: &str,
    fee_native: f64,
    raw_units: RawUnits,
) -> FeeCandidate {
    FeeCandidate::measured(chain.key.clone(), provider_id(url), fee_native, raw_units)
}

/// Fee in native units for `gas` at `gwei`.
pub(crate) fn gas_fee_native(chain: &ChainConfig, gwei: f64, gas: f64) -> f64 {
    chain.to_native(gwei * 1e9 * gas)
}

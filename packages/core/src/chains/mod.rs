//! Chain registry
//!
//! Static per-chain configuration, plus the gas candidate provider chosen
//! for each chain once at build time.

pub mod defaults;
pub mod file;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::gas::{provider_for, GasCandidateProvider, ProviderSettings};
use crate::services::http::HttpClient;

/// Fee model family of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainType {
    /// Base-layer UTXO chain priced by fee-rate per virtual byte.
    Utxo,
    /// EVM account model priced by gas.
    Evm,
    /// Rollup whose fee is L2 execution plus an L1 data-posting share.
    Rollup,
    /// Non-EVM account model (lamports).
    AccountModel,
    /// Ledger-based chains with a network base fee (drops, stroops).
    Ledger,
}

impl FromStr for ChainType {
    type Err = SnapshotError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "utxo" => Ok(ChainType::Utxo),
            "evm" => Ok(ChainType::Evm),
            "rollup" | "l2" => Ok(ChainType::Rollup),
            "account" | "account-model" => Ok(ChainType::AccountModel),
            "ledger" => Ok(ChainType::Ledger),
            other => Err(SnapshotError::UnsupportedChainType {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChainType::Utxo => "utxo",
            ChainType::Evm => "evm",
            ChainType::Rollup => "rollup",
            ChainType::AccountModel => "account-model",
            ChainType::Ledger => "ledger",
        };
        f.write_str(name)
    }
}

/// Wire flavour spoken by a provider endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointApi {
    MempoolSpace,
    Esplora,
    BlockCypher,
    EvmRpc,
    GasOracle,
    OpGasPriceOracle,
    SolanaRpc,
    Rippled,
    Horizon,
}

impl FromStr for EndpointApi {
    type Err = SnapshotError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mempool-space" => Ok(EndpointApi::MempoolSpace),
            "esplora" => Ok(EndpointApi::Esplora),
            "blockcypher" => Ok(EndpointApi::BlockCypher),
            "evm-rpc" => Ok(EndpointApi::EvmRpc),
            "gas-oracle" => Ok(EndpointApi::GasOracle),
            "op-gas-price-oracle" => Ok(EndpointApi::OpGasPriceOracle),
            "solana-rpc" => Ok(EndpointApi::SolanaRpc),
            "rippled" => Ok(EndpointApi::Rippled),
            "horizon" => Ok(EndpointApi::Horizon),
            other => Err(SnapshotError::Config {
                message: format!("unknown endpoint api '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub url: String,
    pub api: EndpointApi,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, api: EndpointApi) -> Self {
        Self { url: url.into(), api }
    }
}

/// Acceptable USD fee band for a chain.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct UsdRange {
    pub min: f64,
    pub max: f64,
}

impl UsdRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Snap a finite value to the nearer boundary. Non-finite input has no
    /// clamped value.
    pub fn clamp(&self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        Some(value.max(self.min).min(self.max))
    }
}

/// Per-chain tunables and the heuristic constants used when live data is
/// missing. These are hand-picked and should be recalibrated periodically.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuxLimits {
    /// Assumed size of a standard transfer, in virtual bytes.
    pub tx_vbytes: f64,
    /// Gas used by a plain transfer (L2 execution gas for rollups).
    pub gas_limit: f64,
    /// Gas charged on L1 for posting one rollup transfer.
    pub l1_data_gas: f64,
    /// Gas prices above this are rejected as implausible.
    pub max_gas_price_gwei: f64,
    pub block_time_secs: u64,
    /// Fee-rate at or above which a UTXO transfer lands in the next block.
    pub fast_fee_rate: f64,
    /// Fee-rate at or above which a UTXO transfer lands within a few blocks.
    pub mid_fee_rate: f64,
    /// Native fee used when no provider produced anything. Has no usable
    /// default; every chain must set a positive value.
    pub fallback_fee_native: f64,
}

impl Default for AuxLimits {
    fn default() -> Self {
        Self {
            tx_vbytes: 140.0,
            gas_limit: 21_000.0,
            l1_data_gas: 1_600.0,
            max_gas_price_gwei: 10_000.0,
            block_time_secs: 12,
            fast_fee_rate: 20.0,
            mid_fee_rate: 5.0,
            fallback_fee_native: 0.0,
        }
    }
}

/// Immutable configuration for one supported chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainConfig {
    pub key: String,
    pub symbol: String,
    pub chain_type: ChainType,
    pub usd_range: UsdRange,
    pub endpoints: Vec<Endpoint>,
    pub native_decimals: u32,
    pub aux: AuxLimits,
}

impl ChainConfig {
    pub fn endpoints_for(&self, api: EndpointApi) -> impl Iterator<Item = &Endpoint> + '_ {
        self.endpoints.iter().filter(move |e| e.api == api)
    }

    /// Convert an amount of the chain's smallest unit into whole native
    /// units.
    pub fn to_native(&self, smallest_units: f64) -> f64 {
        smallest_units / 10f64.powi(self.native_decimals as i32)
    }

    fn validate(&self) -> Result<(), SnapshotError> {
        let range = &self.usd_range;
        if !(range.min.is_finite() && range.max.is_finite()) || range.min < 0.0 || range.min > range.max {
            return Err(SnapshotError::Config {
                message: format!(
                    "chain {} has invalid usd range [{}, {}]",
                    self.key, range.min, range.max
                ),
            });
        }
        if self.key.is_empty() || self.symbol.is_empty() {
            return Err(SnapshotError::Config {
                message: "chain key and symbol must be non-empty".to_string(),
            });
        }
        let fallback = self.aux.fallback_fee_native;
        if !fallback.is_finite() || fallback <= 0.0 {
            return Err(SnapshotError::Config {
                message: format!(
                    "chain {} needs a positive aux.fallbackFeeNative, got {}",
                    self.key, fallback
                ),
            });
        }
        Ok(())
    }
}

/// A chain's configuration together with its gas candidate strategy.
#[derive(Clone)]
pub struct ChainEntry {
    pub config: Arc<ChainConfig>,
    pub provider: Arc<dyn GasCandidateProvider>,
}

/// Lookup table of every configured chain.
#[derive(Clone, Default)]
pub struct ChainRegistry {
    entries: BTreeMap<String, ChainEntry>,
}

impl fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainRegistry")
            .field("chains", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ChainRegistry {
    /// Build the registry, choosing one gas provider per chain from its type.
    pub fn new(
        configs: Vec<ChainConfig>,
        http: HttpClient,
        settings: ProviderSettings,
    ) -> Result<Self, SnapshotError> {
        let entries = configs
            .into_iter()
            .map(|config| {
                let provider = provider_for(config.chain_type, http.clone(), settings.clone());
                (config, provider)
            })
            .collect();
        Self::with_providers(entries)
    }

    /// Build from explicit (config, provider) pairs.
    pub fn with_providers(
        entries: Vec<(ChainConfig, Arc<dyn GasCandidateProvider>)>,
    ) -> Result<Self, SnapshotError> {
        let mut map = BTreeMap::new();
        for (config, provider) in entries {
            config.validate()?;
            let key = config.key.clone();
            let entry = ChainEntry {
                config: Arc::new(config),
                provider,
            };
            if map.insert(key.clone(), entry).is_some() {
                return Err(SnapshotError::Config {
                    message: format!("duplicate chain key {}", key),
                });
            }
        }
        Ok(Self { entries: map })
    }

    pub fn get(&self, key: &str) -> Result<&ChainConfig, SnapshotError> {
        self.entry(key).map(|entry| entry.config.as_ref())
    }

    pub fn entry(&self, key: &str) -> Result<&ChainEntry, SnapshotError> {
        self.entries.get(key).ok_or_else(|| SnapshotError::UnknownChain {
            key: key.to_string(),
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChainEntry> + '_ {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Core data types for fee snapshots

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chain-specific native unit a provider reported, before conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "kebab-case")]
pub enum RawUnits {
    /// Satoshi-style smallest units per virtual byte.
    FeeRate(f64),
    /// Gas price in gwei.
    GasPriceGwei(f64),
    /// Rollup fee parts: L2 execution gas price and the L1 gas price used
    /// for the data-posting share.
    Layered { l2_gwei: f64, l1_gwei: f64 },
    /// Lamports per transaction.
    Lamports(f64),
    /// XRP drops per transaction.
    Drops(f64),
    /// Stellar stroops per operation.
    Stroops(f64),
    /// No measurement behind this value.
    Synthesized,
}

/// One provider's raw fee observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeCandidate {
    pub chain_key: String,
    pub provider: String,
    pub fee_native: f64,
    pub raw_units: RawUnits,
    pub timestamp: DateTime<Utc>,
    pub is_fallback: bool,
}

impl FeeCandidate {
    pub fn measured(
        chain_key: impl Into<String>,
        provider: impl Into<String>,
        fee_native: f64,
        raw_units: RawUnits,
    ) -> Self {
        Self {
            chain_key: chain_key.into(),
            provider: provider.into(),
            fee_native,
            raw_units,
            timestamp: Utc::now(),
            is_fallback: false,
        }
    }

    pub fn fallback(
        chain_key: impl Into<String>,
        provider: impl Into<String>,
        fee_native: f64,
        raw_units: RawUnits,
    ) -> Self {
        Self {
            is_fallback: true,
            ..Self::measured(chain_key, provider, fee_native, raw_units)
        }
    }
}

/// A candidate with its USD valuation attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedCandidate {
    pub candidate: FeeCandidate,
    pub price_usd: Option<f64>,
    pub fee_usd: Option<f64>,
}

impl PricedCandidate {
    /// USD value, only when it is a finite number.
    pub fn usd(&self) -> Option<f64> {
        self.fee_usd.filter(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeeStatus {
    Ok,
    Estimated,
    ApiFailed,
}

impl FeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeStatus::Ok => "ok",
            FeeStatus::Estimated => "estimated",
            FeeStatus::ApiFailed => "api-failed",
        }
    }
}

/// The published fee for one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedFee {
    #[serde(rename = "chainKey")]
    pub chain_key: String,
    #[serde(rename = "feeNative")]
    pub fee_native: Option<f64>,
    #[serde(rename = "feeUSD")]
    pub fee_usd: Option<f64>,
    #[serde(rename = "priceUSD")]
    pub price_usd: Option<f64>,
    pub status: FeeStatus,
    #[serde(rename = "speedSec")]
    pub speed_sec: Option<u64>,
    pub updated: DateTime<Utc>,
    pub provider: Option<String>,
}

impl ValidatedFee {
    /// Entry for a chain whose fee could not be established.
    pub fn api_failed(chain_key: impl Into<String>, price_usd: Option<f64>) -> Self {
        Self {
            chain_key: chain_key.into(),
            fee_native: None,
            fee_usd: None,
            price_usd,
            status: FeeStatus::ApiFailed,
            speed_sec: None,
            updated: Utc::now(),
            provider: None,
        }
    }
}

/// Multi-chain fee snapshot. Built fresh on every invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
    pub chains: BTreeMap<String, ValidatedFee>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            generated_at: Utc::now(),
            chains: BTreeMap::new(),
        }
    }

    pub fn count_with_status(&self, status: FeeStatus) -> usize {
        self.chains.values().filter(|fee| fee.status == status).count()
    }
}

//! Snapshot pipeline.
//!
//! Phase 1 queries the base-layer chain once for its gas price. Phase 2
//! builds every chain concurrently, each in its own task and under its own
//! deadline; the base-layer chain reuses its phase 1 candidates.
//!
//! price (retried once) -> gas candidates -> fallback synthesis -> consensus
//! -> speed -> `ValidatedFee`
//!
//! Errors are recovered at the chain boundary. A chain that fails, panics
//! or overruns its deadline is published as `api-failed`; the others are
//! unaffected.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::timeout;

use crate::chains::{ChainConfig, ChainEntry, ChainRegistry, ChainType};
use crate::consensus::median::lower_median;
use crate::consensus::validator::{fresh_native_median, freshness_window, normalize_candidates, ConsensusOutcome};
use crate::error::SnapshotError;
use crate::price::PriceGatherer;
use crate::speed::calc_speed;
use crate::types::{FeeCandidate, FeeStatus, RawUnits, Snapshot, ValidatedFee};

/// Provider name stamped on synthesized fallback candidates.
pub const FALLBACK_PROVIDER: &str = "fallback";

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Chain whose gas price feeds the rollup L1 data fee.
    pub l1_chain_key: String,
    pub l1_timeout: Duration,
    pub chain_build_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            l1_chain_key: "ethereum".to_string(),
            l1_timeout: Duration::from_secs(15),
            chain_build_timeout: Duration::from_secs(25),
        }
    }
}

#[derive(Clone)]
pub struct SnapshotOrchestrator {
    registry: Arc<ChainRegistry>,
    prices: Arc<PriceGatherer>,
    settings: OrchestratorSettings,
}

impl SnapshotOrchestrator {
    pub fn new(registry: Arc<ChainRegistry>, prices: Arc<PriceGatherer>, settings: OrchestratorSettings) -> Self {
        Self {
            registry,
            prices,
            settings,
        }
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    /// Build a snapshot. Never fails: a pipeline-level error yields an
    /// empty snapshot.
    pub async fn generate_snapshot(&self) -> Snapshot {
        match self.try_generate().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::error!("Snapshot generation failed, publishing empty snapshot: {}", err);
                Snapshot::empty()
            }
        }
    }

    pub async fn try_generate(&self) -> Result<Snapshot, SnapshotError> {
        if self.registry.is_empty() {
            return Err(SnapshotError::Config {
                message: "no chains configured".to_string(),
            });
        }

        let l1_candidates = self.fetch_l1_candidates().await;
        let l1_gas_price_gwei = self.l1_gas_price_from(l1_candidates.as_deref());

        let tasks: Vec<(String, tokio::task::JoinHandle<_>)> = self
            .registry
            .entries()
            .map(|entry| {
                let key = entry.config.key.clone();
                let prefetched = if key == self.settings.l1_chain_key {
                    l1_candidates.clone()
                } else {
                    None
                };
                let build = build_chain(entry.clone(), self.prices.clone(), l1_gas_price_gwei, prefetched);
                let task = tokio::spawn(timeout(self.settings.chain_build_timeout, build));
                (key, task)
            })
            .collect();

        let mut snapshot = Snapshot::empty();
        for (key, task) in tasks {
            let fee = match task.await {
                Ok(Ok(fee)) => fee,
                Ok(Err(_)) => {
                    tracing::warn!(
                        "{}: build exceeded {:?}, marking api-failed",
                        key,
                        self.settings.chain_build_timeout
                    );
                    ValidatedFee::api_failed(key.clone(), None)
                }
                Err(join_err) => {
                    let err = SnapshotError::ChainBuildPanicked { chain: key.clone() };
                    tracing::error!("{}: {}", err, join_err);
                    ValidatedFee::api_failed(key.clone(), None)
                }
            };
            snapshot.chains.insert(key, fee);
        }

        snapshot.generated_at = Utc::now();
        tracing::info!(
            "Snapshot built: {} chains ({} ok, {} estimated, {} api-failed)",
            snapshot.chains.len(),
            snapshot.count_with_status(FeeStatus::Ok),
            snapshot.count_with_status(FeeStatus::Estimated),
            snapshot.count_with_status(FeeStatus::ApiFailed),
        );
        Ok(snapshot)
    }

    /// Lower-median gas price of the base-layer chain's fresh, measured
    /// candidates. `None` when the chain is absent or nothing answered.
    pub async fn resolve_l1_gas_price(&self) -> Option<f64> {
        let candidates = self.fetch_l1_candidates().await;
        self.l1_gas_price_from(candidates.as_deref())
    }

    fn l1_gas_price_from(&self, candidates: Option<&[FeeCandidate]>) -> Option<f64> {
        let gwei = l1_gwei_median(candidates?, Utc::now());
        if gwei.is_none() {
            tracing::warn!("{}: no base-layer gas price measured", self.settings.l1_chain_key);
        }
        gwei
    }

    /// Candidates of the base-layer chain, or `None` when the chain is
    /// absent or its lookup panicked or timed out.
    async fn fetch_l1_candidates(&self) -> Option<Vec<FeeCandidate>> {
        let entry = match self.registry.entry(&self.settings.l1_chain_key) {
            Ok(entry) => entry.clone(),
            Err(err) => {
                tracing::debug!("No base-layer gas price: {}", err);
                return None;
            }
        };

        let fetch = tokio::spawn(async move { entry.provider.fetch_candidates(&entry.config, None).await });

        match timeout(self.settings.l1_timeout, fetch).await {
            Ok(Ok(candidates)) => Some(candidates),
            Ok(Err(join_err)) => {
                tracing::error!("{}: base-layer gas lookup aborted: {}", self.settings.l1_chain_key, join_err);
                None
            }
            Err(_) => {
                tracing::warn!("{}: base-layer gas lookup timed out", self.settings.l1_chain_key);
                None
            }
        }
    }
}

fn l1_gwei_median(candidates: &[FeeCandidate], now: DateTime<Utc>) -> Option<f64> {
    let gwei: Vec<f64> = candidates
        .iter()
        .filter(|c| !c.is_fallback && now - c.timestamp <= freshness_window())
        .filter_map(|c| match c.raw_units {
            RawUnits::GasPriceGwei(g) if g.is_finite() && g > 0.0 => Some(g),
            _ => None,
        })
        .collect();
    lower_median(&gwei)
}

/// The documented per-chain fallback fee as a synthesized candidate.
pub fn fallback_candidate(chain: &ChainConfig) -> FeeCandidate {
    FeeCandidate::fallback(
        chain.key.clone(),
        FALLBACK_PROVIDER,
        chain.aux.fallback_fee_native,
        RawUnits::Synthesized,
    )
}

async fn price_with_retry(prices: &PriceGatherer, symbol: &str) -> Option<f64> {
    match prices.fetch_price_usd(symbol).await {
        Ok(price) => Some(price),
        Err(first) => {
            tracing::debug!("{}, retrying once", first);
            match prices.fetch_price_usd(symbol).await {
                Ok(price) => Some(price),
                Err(err) => {
                    tracing::warn!("{}", err);
                    None
                }
            }
        }
    }
}

async fn build_chain(
    entry: ChainEntry,
    prices: Arc<PriceGatherer>,
    l1_gas_price_gwei: Option<f64>,
    prefetched: Option<Vec<FeeCandidate>>,
) -> ValidatedFee {
    let chain = entry.config.as_ref();
    let price_usd = price_with_retry(&prices, &chain.symbol).await;

    let measured = match prefetched {
        Some(candidates) => candidates,
        None => {
            let l1 = l1_gas_price_gwei.filter(|_| chain.chain_type == ChainType::Rollup);
            entry.provider.fetch_candidates(chain, l1).await
        }
    };
    tracing::debug!("{}: {} candidates from {}", chain.key, measured.len(), entry.provider.name());

    let now = Utc::now();
    let Some(price) = price_usd else {
        let mut fee = ValidatedFee::api_failed(chain.key.clone(), None);
        fee.fee_native = fresh_native_median(&measured, now);
        fee.updated = now;
        tracing::warn!("{}: no USD price, publishing api-failed", chain.key);
        return fee;
    };

    let raw = if measured.is_empty() {
        tracing::warn!("{}: no provider returned data, using fallback fee", chain.key);
        vec![fallback_candidate(chain)]
    } else {
        measured
    };

    let outcome = match normalize_candidates(chain, raw, Some(price), now) {
        Ok(outcome) => Ok(outcome),
        Err(SnapshotError::ValidationFailed { .. }) => {
            tracing::warn!("{}: no candidate survived validation, using fallback fee", chain.key);
            normalize_candidates(chain, vec![fallback_candidate(chain)], Some(price), now)
        }
        Err(err) => Err(err),
    };

    match outcome {
        Ok(outcome) => assemble(chain, outcome, price, now),
        Err(err) => {
            tracing::warn!("{}: {}", chain.key, err);
            ValidatedFee {
                updated: now,
                ..ValidatedFee::api_failed(chain.key.clone(), Some(price))
            }
        }
    }
}

fn assemble(chain: &ChainConfig, outcome: ConsensusOutcome, price_usd: f64, now: DateTime<Utc>) -> ValidatedFee {
    let primary = outcome.primary;
    if outcome.status != FeeStatus::Ok {
        tracing::warn!(
            "{}: publishing {} fee from {}",
            chain.key,
            outcome.status.as_str(),
            primary.candidate.provider
        );
    }

    ValidatedFee {
        chain_key: chain.key.clone(),
        fee_native: Some(primary.candidate.fee_native),
        fee_usd: primary.usd(),
        price_usd: Some(price_usd),
        status: outcome.status,
        speed_sec: Some(calc_speed(chain, &primary.candidate)),
        updated: now,
        provider: Some(primary.candidate.provider),
    }
}

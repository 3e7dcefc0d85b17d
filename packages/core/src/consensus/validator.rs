//! Consensus over priced fee candidates.
//!
//! Candidates are filtered by freshness and sanity, split by the chain's
//! USD range, and reduced to one primary candidate with a status:
//!
//! - `Ok`: the median of measured, in-range candidates.
//! - `Estimated`: only fallback or out-of-range data was usable; the median
//!   of the best pool is clamped into range.
//!
//! When nothing survives filtering the caller gets `ValidationFailed`.

use chrono::{DateTime, Duration, Utc};

use super::median::median_by;
use super::normalizer::attach_usd;
use crate::chains::ChainConfig;
use crate::error::SnapshotError;
use crate::types::{FeeCandidate, FeeStatus, PricedCandidate};

/// Candidates older than this are ignored outright.
pub const FRESHNESS_WINDOW_HOURS: i64 = 3;

pub fn freshness_window() -> Duration {
    Duration::hours(FRESHNESS_WINDOW_HOURS)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusOutcome {
    /// Every candidate that passed freshness and sanity filtering.
    pub candidates: Vec<PricedCandidate>,
    pub primary: PricedCandidate,
    pub status: FeeStatus,
}

/// Clamp a USD fee into the chain's range. Non-finite input yields `None`.
pub fn enforce_range(chain: &ChainConfig, fee_usd: f64) -> Option<f64> {
    chain.usd_range.clamp(fee_usd)
}

fn is_fresh(candidate: &FeeCandidate, now: DateTime<Utc>) -> bool {
    now - candidate.timestamp <= freshness_window()
}

fn is_sane(candidate: &FeeCandidate) -> bool {
    candidate.fee_native.is_finite() && candidate.fee_native > 0.0
}

/// Lower-median native fee of the fresh, positive candidates. Used when no
/// price is available and only the native figure can be published.
pub fn fresh_native_median(raw: &[FeeCandidate], now: DateTime<Utc>) -> Option<f64> {
    let usable: Vec<&FeeCandidate> = raw
        .iter()
        .filter(|c| is_sane(c) && is_fresh(c, now))
        .collect();
    median_by(&usable, |c| c.fee_native).map(|c| c.fee_native)
}

/// Build a clamped primary from the median member of a pool.
fn synthesize_primary(member: &PricedCandidate, clamped_usd: f64, now: DateTime<Utc>) -> PricedCandidate {
    let mut candidate = member.candidate.clone();
    if let Some(price) = member.price_usd {
        candidate.fee_native = clamped_usd / price;
    }
    candidate.is_fallback = true;
    candidate.timestamp = now;

    PricedCandidate {
        candidate,
        price_usd: member.price_usd,
        fee_usd: Some(clamped_usd),
    }
}

pub fn normalize_candidates(
    chain: &ChainConfig,
    raw: Vec<FeeCandidate>,
    price_usd: Option<f64>,
    now: DateTime<Utc>,
) -> Result<ConsensusOutcome, SnapshotError> {
    let total = raw.len();

    let valid: Vec<PricedCandidate> = raw
        .into_iter()
        .filter(|c| is_sane(c) && is_fresh(c, now))
        .map(|c| attach_usd(c, price_usd))
        .filter(|p| p.usd().is_some())
        .collect();

    tracing::debug!(
        "{}: {} of {} candidates usable for consensus",
        chain.key,
        valid.len(),
        total
    );

    if valid.is_empty() {
        return Err(SnapshotError::ValidationFailed {
            chain: chain.key.clone(),
        });
    }

    let range = chain.usd_range;
    let usd = |p: &PricedCandidate| p.usd().unwrap_or(f64::NAN);

    let (in_range, out_of_range): (Vec<&PricedCandidate>, Vec<&PricedCandidate>) =
        valid.iter().partition(|p| range.contains(usd(*p)));

    let measured_in_range: Vec<&PricedCandidate> = in_range
        .iter()
        .copied()
        .filter(|p| !p.candidate.is_fallback)
        .collect();

    let (mut primary, mut status) = if let Some(median) = median_by(&measured_in_range, |p| usd(*p)) {
        ((*median).clone(), FeeStatus::Ok)
    } else {
        let pool: Vec<&PricedCandidate> = if in_range.is_empty() {
            valid.iter().collect()
        } else {
            in_range.clone()
        };
        let median = *median_by(&pool, |p| usd(*p)).ok_or_else(|| SnapshotError::ValidationFailed {
            chain: chain.key.clone(),
        })?;
        let clamped = enforce_range(chain, usd(median)).ok_or_else(|| SnapshotError::ValidationFailed {
            chain: chain.key.clone(),
        })?;
        tracing::debug!(
            "{}: no measured in-range candidate ({} out of range), estimating {:.6} USD",
            chain.key,
            out_of_range.len(),
            clamped
        );
        (synthesize_primary(median, clamped, now), FeeStatus::Estimated)
    };

    let primary_usd = usd(&primary);
    if !range.contains(primary_usd) {
        let clamped = enforce_range(chain, primary_usd).ok_or_else(|| SnapshotError::ValidationFailed {
            chain: chain.key.clone(),
        })?;
        primary = synthesize_primary(&primary, clamped, now);
        status = FeeStatus::Estimated;
    }

    Ok(ConsensusOutcome {
        candidates: valid,
        primary,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::{AuxLimits, ChainType, UsdRange};
    use crate::types::RawUnits;
    use proptest::prelude::*;

    fn chain(min: f64, max: f64) -> ChainConfig {
        ChainConfig {
            key: "ethereum".into(),
            symbol: "ETH".into(),
            chain_type: ChainType::Evm,
            usd_range: UsdRange::new(min, max),
            endpoints: vec![],
            native_decimals: 18,
            aux: AuxLimits::default(),
        }
    }

    fn at(fee_native: f64, provider: &str, timestamp: DateTime<Utc>) -> FeeCandidate {
        FeeCandidate {
            timestamp,
            ..FeeCandidate::measured("ethereum", provider, fee_native, RawUnits::GasPriceGwei(10.0))
        }
    }

    fn usd_of(outcome: &ConsensusOutcome) -> f64 {
        outcome.primary.fee_usd.unwrap()
    }

    #[test]
    fn two_in_range_candidates_choose_lower_middle() {
        let now = Utc::now();
        // $3 and $5 at $2000/ETH
        let raw = vec![at(0.0025, "b", now), at(0.0015, "a", now)];
        let outcome = normalize_candidates(&chain(0.01, 200.0), raw, Some(2000.0), now).unwrap();

        assert_eq!(outcome.status, FeeStatus::Ok);
        assert!((usd_of(&outcome) - 3.0).abs() < 1e-9);
        assert_eq!(outcome.primary.candidate.provider, "a");
        assert_eq!(outcome.candidates.len(), 2);
    }

    #[test]
    fn median_of_four_and_three() {
        let now = Utc::now();
        let four = vec![at(4.0, "d", now), at(1.0, "a", now), at(3.0, "c", now), at(2.0, "b", now)];
        let outcome = normalize_candidates(&chain(0.0, 10.0), four, Some(1.0), now).unwrap();
        assert_eq!(usd_of(&outcome), 2.0);

        let three = vec![at(3.0, "c", now), at(1.0, "a", now), at(2.0, "b", now)];
        let outcome = normalize_candidates(&chain(0.0, 10.0), three, Some(1.0), now).unwrap();
        assert_eq!(usd_of(&outcome), 2.0);
    }

    #[test]
    fn stale_candidates_alone_fail_validation() {
        let now = Utc::now();
        let stale = now - Duration::hours(4);
        let raw = vec![at(0.001, "a", stale), at(0.002, "b", stale)];
        let err = normalize_candidates(&chain(0.01, 200.0), raw, Some(2000.0), now).unwrap_err();
        assert_eq!(err, SnapshotError::ValidationFailed { chain: "ethereum".into() });
    }

    #[test]
    fn stale_candidates_are_excluded_next_to_fresh_ones() {
        let now = Utc::now();
        let raw = vec![
            at(0.001, "fresh", now - Duration::minutes(30)),
            at(0.05, "stale", now - Duration::hours(3) - Duration::seconds(1)),
        ];
        let outcome = normalize_candidates(&chain(0.01, 200.0), raw, Some(2000.0), now).unwrap();
        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.primary.candidate.provider, "fresh");
    }

    #[test]
    fn out_of_range_candidate_loses_to_in_range() {
        let now = Utc::now();
        let raw = vec![at(0.5, "in", now), at(500.0, "hi1", now), at(600.0, "hi2", now)];
        let outcome = normalize_candidates(&chain(0.1, 10.0), raw, Some(1.0), now).unwrap();
        assert_eq!(outcome.status, FeeStatus::Ok);
        assert_eq!(outcome.primary.candidate.provider, "in");
        assert_eq!(outcome.candidates.len(), 3);
    }

    #[test]
    fn all_above_range_clamps_to_max() {
        let now = Utc::now();
        let raw = vec![at(50.0, "a", now), at(70.0, "b", now)];
        let outcome = normalize_candidates(&chain(0.1, 10.0), raw, Some(1.0), now).unwrap();
        assert_eq!(outcome.status, FeeStatus::Estimated);
        assert_eq!(usd_of(&outcome), 10.0);
        assert!((outcome.primary.candidate.fee_native - 10.0).abs() < 1e-12);
        assert!(outcome.primary.candidate.is_fallback);
    }

    #[test]
    fn all_below_range_clamps_to_min() {
        let now = Utc::now();
        let raw = vec![at(0.001, "a", now)];
        let outcome = normalize_candidates(&chain(0.1, 10.0), raw, Some(1.0), now).unwrap();
        assert_eq!(outcome.status, FeeStatus::Estimated);
        assert_eq!(usd_of(&outcome), 0.1);
    }

    #[test]
    fn fallback_candidate_in_range_is_estimated() {
        let now = Utc::now();
        let raw = vec![FeeCandidate::fallback("ethereum", "fallback", 0.00042, RawUnits::Synthesized)];
        let outcome = normalize_candidates(&chain(0.01, 200.0), raw, Some(2000.0), now).unwrap();
        assert_eq!(outcome.status, FeeStatus::Estimated);
        assert!((usd_of(&outcome) - 0.84).abs() < 1e-9);
    }

    #[test]
    fn measured_in_range_beats_fallback() {
        let now = Utc::now();
        let raw = vec![
            FeeCandidate::fallback("ethereum", "fallback", 0.001, RawUnits::Synthesized),
            at(0.002, "rpc", now),
        ];
        let outcome = normalize_candidates(&chain(0.01, 200.0), raw, Some(2000.0), now).unwrap();
        assert_eq!(outcome.status, FeeStatus::Ok);
        assert_eq!(outcome.primary.candidate.provider, "rpc");
    }

    #[test]
    fn missing_price_fails_validation() {
        let now = Utc::now();
        let raw = vec![at(0.001, "a", now)];
        let err = normalize_candidates(&chain(0.01, 200.0), raw, None, now).unwrap_err();
        assert!(matches!(err, SnapshotError::ValidationFailed { .. }));
    }

    #[test]
    fn non_positive_native_fees_are_dropped() {
        let now = Utc::now();
        let raw = vec![at(0.0, "zero", now), at(-1.0, "neg", now), at(f64::NAN, "nan", now)];
        assert!(normalize_candidates(&chain(0.01, 200.0), raw, Some(2000.0), now).is_err());
    }

    #[test]
    fn fresh_native_median_ignores_stale_and_zero() {
        let now = Utc::now();
        let raw = vec![
            at(0.0, "zero", now),
            at(5.0, "stale", now - Duration::hours(5)),
            at(2.0, "a", now),
            at(1.0, "b", now),
        ];
        assert_eq!(fresh_native_median(&raw, now), Some(1.0));
        assert_eq!(fresh_native_median(&[], now), None);
    }

    #[test]
    fn enforce_range_is_idempotent_and_rejects_nan() {
        let c = chain(0.1, 10.0);
        let once = enforce_range(&c, 42.0).unwrap();
        assert_eq!(enforce_range(&c, once), Some(once));
        assert_eq!(enforce_range(&c, f64::NAN), None);
        assert_eq!(enforce_range(&c, f64::NEG_INFINITY), None);
    }

    proptest! {
        #[test]
        fn published_value_always_within_range(
            fees in prop::collection::vec((1e-6f64..1e3f64, any::<bool>(), 0i64..6), 1..12),
            price in 0.5f64..5_000f64,
            min in 0.001f64..1.0,
            width in 0.01f64..100.0,
        ) {
            let now = Utc::now();
            let raw: Vec<FeeCandidate> = fees
                .iter()
                .enumerate()
                .map(|(i, (fee, fallback, hours_ago))| FeeCandidate {
                    is_fallback: *fallback,
                    ..at(*fee, &format!("p{}", i), now - Duration::hours(*hours_ago))
                })
                .collect();
            let c = chain(min, min + width);

            if let Ok(outcome) = normalize_candidates(&c, raw, Some(price), now) {
                let usd = outcome.primary.fee_usd.unwrap();
                prop_assert!(usd >= c.usd_range.min && usd <= c.usd_range.max);
                if outcome.status == FeeStatus::Ok {
                    prop_assert!(!outcome.primary.candidate.is_fallback);
                    prop_assert!(now - outcome.primary.candidate.timestamp <= freshness_window());
                }
            }
        }

        #[test]
        fn enforce_range_never_drifts(value in -1e6f64..1e6f64, min in 0.0f64..10.0, width in 0.0f64..10.0) {
            let c = chain(min, min + width);
            let once = enforce_range(&c, value).unwrap();
            prop_assert_eq!(enforce_range(&c, once), Some(once));
        }
    }
}

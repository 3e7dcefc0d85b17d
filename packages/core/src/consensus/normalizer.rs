use crate::types::{FeeCandidate, PricedCandidate};

/// Attach a USD valuation to a raw candidate.
///
/// A missing or unusable price leaves `fee_usd` empty; that is a normal
/// degraded state handled by the validator, not an error.
pub fn attach_usd(candidate: FeeCandidate, price_usd: Option<f64>) -> PricedCandidate {
    let price = price_usd.filter(|p| p.is_finite() && *p > 0.0);
    let fee_usd = price
        .map(|p| candidate.fee_native * p)
        .filter(|v| v.is_finite());

    PricedCandidate {
        candidate,
        price_usd: price,
        fee_usd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawUnits;

    fn candidate(fee_native: f64) -> FeeCandidate {
        FeeCandidate::measured("ethereum", "rpc.example", fee_native, RawUnits::GasPriceGwei(20.0))
    }

    #[test]
    fn multiplies_native_fee_by_price() {
        let priced = attach_usd(candidate(0.0015), Some(2000.0));
        assert_eq!(priced.price_usd, Some(2000.0));
        assert!((priced.fee_usd.unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn missing_price_leaves_usd_empty() {
        let priced = attach_usd(candidate(0.0015), None);
        assert_eq!(priced.fee_usd, None);
        assert_eq!(priced.price_usd, None);
    }

    #[test]
    fn non_positive_or_non_finite_price_is_treated_as_missing() {
        for price in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let priced = attach_usd(candidate(0.0015), Some(price));
            assert_eq!(priced.fee_usd, None, "price {}", price);
        }
    }
}

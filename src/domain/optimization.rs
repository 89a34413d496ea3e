//! Optimisation results shared by the allocation model and its adapters.

use crate::domain::error::SharpefolioError;
use std::collections::BTreeMap;

/// Weights below this magnitude are treated as zero.
pub const WEIGHT_CUTOFF: f64 = 1e-4;
pub const WEIGHT_DECIMALS: i32 = 5;

/// Realised statistics of a weight vector, annualised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Performance {
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
}

/// Whole-share positions and the cash left unspent.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteAllocation {
    /// Only tickers with a non-zero share count appear.
    pub shares: BTreeMap<String, i64>,
    pub leftover: f64,
}

impl DiscreteAllocation {
    pub fn position_count(&self) -> usize {
        self.shares.values().filter(|&&n| n != 0).count()
    }
}

/// Zero out negligible weights and round the rest.
pub fn clean_weights(tickers: &[String], raw: &[f64]) -> Vec<(String, f64)> {
    let scale = 10f64.powi(WEIGHT_DECIMALS);
    tickers
        .iter()
        .zip(raw)
        .map(|(t, &w)| {
            let w = if w.abs() < WEIGHT_CUTOFF { 0.0 } else { w };
            (t.clone(), (w * scale).round() / scale)
        })
        .collect()
}

/// Reject any negative weight; the portfolio holds long positions only.
pub fn ensure_long_only(weights: &[(String, f64)]) -> Result<(), SharpefolioError> {
    match weights.iter().find(|(_, w)| *w < 0.0 || w.is_nan()) {
        Some((ticker, weight)) => Err(SharpefolioError::ShortPosition {
            ticker: ticker.clone(),
            weight: *weight,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn clean_weights_cuts_and_rounds() {
        let cleaned = clean_weights(&names(&["a", "b", "c"]), &[0.333333333, 0.00005, 0.666661]);
        assert_eq!(
            cleaned,
            vec![
                ("a".to_string(), 0.33333),
                ("b".to_string(), 0.0),
                ("c".to_string(), 0.66666)
            ]
        );
    }

    #[test]
    fn tiny_negative_weight_is_cleaned_to_zero() {
        let cleaned = clean_weights(&names(&["a", "b"]), &[1.0, -0.00001]);
        assert!(ensure_long_only(&cleaned).is_ok());
    }

    #[test]
    fn negative_weight_is_fatal() {
        let weights = vec![("voo".to_string(), 1.2), ("aapl".to_string(), -0.2)];
        let err = ensure_long_only(&weights).unwrap_err();
        assert!(matches!(
            err,
            SharpefolioError::ShortPosition { ref ticker, weight } if ticker == "aapl" && weight == -0.2
        ));
    }

    #[test]
    fn position_count_ignores_zero_entries() {
        let mut shares = BTreeMap::new();
        shares.insert("voo".to_string(), 3);
        shares.insert("aapl".to_string(), 0);
        shares.insert("icln".to_string(), 12);
        let allocation = DiscreteAllocation {
            shares,
            leftover: 4.5,
        };
        assert_eq!(allocation.position_count(), 2);
    }
}

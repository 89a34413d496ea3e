//! Greedy whole-share allocator.
//!
//! Round one buys `floor(weight * budget / price)` shares of every ticker,
//! largest weight first. Round two spends what is left one share at a time on
//! the affordable ticker furthest below its target weight.

use crate::domain::error::SharpefolioError;
use crate::domain::optimization::DiscreteAllocation;
use crate::ports::optimizer_port::DiscreteAllocator;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct GreedyAllocator;

struct Position {
    ticker: String,
    weight: f64,
    price: f64,
    shares: i64,
}

impl DiscreteAllocator for GreedyAllocator {
    fn allocate(
        &self,
        weights: &[(String, f64)],
        latest_prices: &[(String, f64)],
        total_value: f64,
    ) -> Result<DiscreteAllocation, SharpefolioError> {
        if total_value <= 0.0 {
            return Err(SharpefolioError::Optimization {
                reason: "portfolio value must be positive".into(),
            });
        }

        let mut positions = Vec::new();
        for (ticker, weight) in weights.iter().filter(|(_, w)| *w > 0.0) {
            let price = latest_prices
                .iter()
                .find(|(t, _)| t == ticker)
                .map(|(_, p)| *p)
                .ok_or_else(|| SharpefolioError::Optimization {
                    reason: format!("no latest price for {ticker}"),
                })?;
            if !(price > 0.0) {
                return Err(SharpefolioError::Optimization {
                    reason: format!("latest price for {ticker} is not positive: {price}"),
                });
            }
            positions.push(Position {
                ticker: ticker.clone(),
                weight: *weight,
                price,
                shares: 0,
            });
        }
        positions.sort_by(|l, r| r.weight.total_cmp(&l.weight));

        let weight_total: f64 = positions.iter().map(|p| p.weight).sum();
        for p in &mut positions {
            p.weight /= weight_total;
        }

        let mut available = total_value;
        for p in &mut positions {
            let n = (p.weight * total_value / p.price).floor();
            let cost = n * p.price;
            if n > 0.0 && cost <= available {
                p.shares = n as i64;
                available -= cost;
            }
        }

        loop {
            let invested: f64 = positions.iter().map(|p| p.shares as f64 * p.price).sum();
            let deficit = |p: &Position| {
                let current = if invested > 0.0 {
                    p.shares as f64 * p.price / invested
                } else {
                    0.0
                };
                p.weight - current
            };

            let next = positions
                .iter()
                .enumerate()
                .filter(|(_, p)| p.price <= available && deficit(p) > 0.0)
                .max_by(|(_, l), (_, r)| deficit(l).total_cmp(&deficit(r)))
                .map(|(i, _)| i);

            match next {
                Some(i) => {
                    positions[i].shares += 1;
                    available -= positions[i].price;
                }
                None => break,
            }
        }

        let shares: BTreeMap<String, i64> = positions
            .into_iter()
            .filter(|p| p.shares > 0)
            .map(|p| (p.ticker, p.shares))
            .collect();

        Ok(DiscreteAllocation {
            shares,
            leftover: available,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pairs(items: &[(&str, f64)]) -> Vec<(String, f64)> {
        items.iter().map(|(t, v)| (t.to_string(), *v)).collect()
    }

    #[test]
    fn floor_pass_then_leftover() {
        let weights = pairs(&[("voo", 0.5), ("aapl", 0.5)]);
        let prices = pairs(&[("voo", 100.0), ("aapl", 30.0)]);
        let result = GreedyAllocator.allocate(&weights, &prices, 1000.0).unwrap();

        assert_eq!(result.shares.get("voo"), Some(&5));
        assert_eq!(result.shares.get("aapl"), Some(&16));
        assert_relative_eq!(result.leftover, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn second_pass_buys_underweight_ticker() {
        let weights = pairs(&[("a", 0.7), ("b", 0.3)]);
        let prices = pairs(&[("a", 60.0), ("b", 25.0)]);
        let result = GreedyAllocator.allocate(&weights, &prices, 200.0).unwrap();

        assert_eq!(result.shares.get("a"), Some(&2));
        assert_eq!(result.shares.get("b"), Some(&3));
        assert_relative_eq!(result.leftover, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_weights_and_unaffordable_tickers_are_omitted() {
        let weights = pairs(&[("voo", 0.98), ("btc_usd", 0.02), ("icln", 0.0)]);
        let prices = pairs(&[("voo", 400.0), ("btc_usd", 60_000.0), ("icln", 15.0)]);
        let result = GreedyAllocator.allocate(&weights, &prices, 10_000.0).unwrap();

        assert_eq!(result.shares.len(), 1);
        assert_eq!(result.shares.get("voo"), Some(&24));
        assert_eq!(result.position_count(), 1);
        assert_relative_eq!(result.leftover, 400.0, epsilon = 1e-9);
    }

    #[test]
    fn never_spends_more_than_budget() {
        let weights = pairs(&[("a", 0.4), ("b", 0.35), ("c", 0.25)]);
        let prices = pairs(&[("a", 13.7), ("b", 41.2), ("c", 7.9)]);
        let result = GreedyAllocator.allocate(&weights, &prices, 1_000.0).unwrap();

        let spent: f64 = result
            .shares
            .iter()
            .map(|(t, n)| *n as f64 * prices.iter().find(|(p, _)| p == t).unwrap().1)
            .sum();
        assert_eq!(result.shares.get("a"), Some(&29));
        assert_eq!(result.shares.get("b"), Some(&8));
        assert_eq!(result.shares.get("c"), Some(&31));
        // b is the only underweight ticker and costs more than what is left
        assert_relative_eq!(result.leftover, 28.2, epsilon = 1e-9);
        assert_relative_eq!(spent + result.leftover, 1_000.0, epsilon = 1e-6);
    }

    #[test]
    fn missing_price_is_error() {
        let weights = pairs(&[("voo", 1.0)]);
        let result = GreedyAllocator.allocate(&weights, &[], 1000.0);
        assert!(matches!(result, Err(SharpefolioError::Optimization { .. })));
    }
}

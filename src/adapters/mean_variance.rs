//! Mean-variance optimiser over historical close prices.
//!
//! Expected returns are compounded mean historical returns, risk is the
//! annualised sample covariance of daily returns. The long-only max-Sharpe
//! portfolio is searched with argmin's Nelder-Mead over `w = x^2 / |x|^2`,
//! which keeps every weight non-negative and lets assets drop out entirely.
//! The weights are then refined on the support the search settled on by
//! solving `S_F y = (mu - rf)_F` exactly.

use crate::domain::error::SharpefolioError;
use crate::domain::optimization::Performance;
use crate::domain::price_frame::PriceFrame;
use crate::domain::settings::DEFAULT_RISK_FREE_RATE;
use crate::ports::optimizer_port::PortfolioOptimizer;
use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::solver::neldermead::NelderMead;
use nalgebra::{DMatrix, DVector};
use tracing::debug;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

const MAX_ITERS: u64 = 5_000;
const SD_TOLERANCE: f64 = 1e-12;
/// Weights below this after the search are treated as excluded.
const SUPPORT_CUTOFF: f64 = 1e-4;

pub struct MeanVarianceOptimizer {
    risk_free_rate: f64,
    frequency: f64,
}

impl Default for MeanVarianceOptimizer {
    fn default() -> Self {
        Self::new(DEFAULT_RISK_FREE_RATE)
    }
}

impl MeanVarianceOptimizer {
    pub fn new(risk_free_rate: f64) -> Self {
        Self {
            risk_free_rate,
            frequency: TRADING_DAYS_PER_YEAR,
        }
    }

    /// Periods per year used to annualise.
    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    fn returns(&self, frame: &PriceFrame) -> Result<DMatrix<f64>, SharpefolioError> {
        let returns = frame.daily_returns();
        if returns.nrows() < 2 {
            return Err(SharpefolioError::InsufficientData {
                reason: format!("need at least 3 price rows, have {}", frame.len()),
            });
        }
        let non_finite =
            (0..returns.ncols()).find(|&c| returns.column(c).iter().any(|r| !r.is_finite()));
        if let Some(col) = non_finite {
            return Err(SharpefolioError::Optimization {
                reason: format!("non-finite return for {}", frame.tickers[col]),
            });
        }
        Ok(returns)
    }
}

impl PortfolioOptimizer for MeanVarianceOptimizer {
    fn expected_returns(&self, frame: &PriceFrame) -> Result<DVector<f64>, SharpefolioError> {
        let returns = self.returns(frame)?;
        let periods = returns.nrows() as f64;
        Ok(DVector::from_fn(returns.ncols(), |c, _| {
            let growth: f64 = returns.column(c).iter().map(|r| 1.0 + r).product();
            growth.powf(self.frequency / periods) - 1.0
        }))
    }

    fn sample_covariance(&self, frame: &PriceFrame) -> Result<DMatrix<f64>, SharpefolioError> {
        let returns = self.returns(frame)?;
        let n = returns.nrows();
        let means = returns.row_mean();
        let centered = DMatrix::from_fn(n, returns.ncols(), |r, c| returns[(r, c)] - means[c]);
        Ok(centered.transpose() * &centered * (self.frequency / (n as f64 - 1.0)))
    }

    fn max_sharpe(
        &self,
        expected_returns: &DVector<f64>,
        covariance: &DMatrix<f64>,
    ) -> Result<DVector<f64>, SharpefolioError> {
        let n = expected_returns.len();
        if n == 0 || covariance.shape() != (n, n) {
            return Err(SharpefolioError::Optimization {
                reason: format!(
                    "{} expected returns against a {}x{} covariance matrix",
                    n,
                    covariance.nrows(),
                    covariance.ncols()
                ),
            });
        }

        let excess = expected_returns.map(|m| m - self.risk_free_rate);
        if excess.max() <= 0.0 {
            return Err(SharpefolioError::Optimization {
                reason: "at least one asset must have an expected return exceeding the \
                         risk-free rate"
                    .into(),
            });
        }
        if covariance.clone().cholesky().is_none() {
            return Err(SharpefolioError::Optimization {
                reason: "covariance matrix is not positive definite".into(),
            });
        }

        let searched = search_max_sharpe(&excess, covariance)?;
        Ok(refine_on_support(&excess, covariance, &searched).unwrap_or(searched))
    }

    fn portfolio_performance(
        &self,
        weights: &DVector<f64>,
        expected_returns: &DVector<f64>,
        covariance: &DMatrix<f64>,
    ) -> Performance {
        let expected_return = weights.dot(expected_returns);
        let variance = (weights.transpose() * covariance * weights)[(0, 0)];
        let volatility = variance.max(0.0).sqrt();
        let sharpe_ratio = if volatility > 0.0 {
            (expected_return - self.risk_free_rate) / volatility
        } else {
            0.0
        };
        Performance {
            expected_return,
            volatility,
            sharpe_ratio,
        }
    }
}

/// Negative Sharpe ratio of the excess returns, parameterised so that any
/// real vector maps onto the long-only simplex.
struct NegativeSharpe {
    excess: Vec<f64>,
    cov: Vec<Vec<f64>>,
}

fn simplex_weights(x: &[f64]) -> Vec<f64> {
    let norm: f64 = x.iter().map(|v| v * v).sum();
    if norm <= 0.0 {
        return vec![1.0 / x.len() as f64; x.len()];
    }
    x.iter().map(|v| v * v / norm).collect()
}

impl CostFunction for NegativeSharpe {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let w = simplex_weights(x);
        let ret: f64 = w.iter().zip(&self.excess).map(|(a, b)| a * b).sum();
        let var: f64 = self
            .cov
            .iter()
            .zip(&w)
            .map(|(row, wi)| wi * row.iter().zip(&w).map(|(c, wj)| c * wj).sum::<f64>())
            .sum();
        Ok(-ret / var.max(f64::MIN_POSITIVE).sqrt())
    }
}

fn sharpe_of(w: &DVector<f64>, excess: &DVector<f64>, cov: &DMatrix<f64>) -> f64 {
    let var = (w.transpose() * cov * w)[(0, 0)];
    w.dot(excess) / var.max(f64::MIN_POSITIVE).sqrt()
}

fn search_max_sharpe(
    excess: &DVector<f64>,
    cov: &DMatrix<f64>,
) -> Result<DVector<f64>, SharpefolioError> {
    let n = excess.len();
    let cost = NegativeSharpe {
        excess: excess.iter().copied().collect(),
        cov: (0..n).map(|r| cov.row(r).iter().copied().collect()).collect(),
    };

    // Start from equal weights; each further vertex drops one asset.
    let x0 = vec![1.0; n];
    let mut simplex = Vec::with_capacity(n + 1);
    simplex.push(x0.clone());
    for i in 0..n {
        let mut point = x0.clone();
        point[i] = 0.0;
        simplex.push(point);
    }

    let solver = NelderMead::new(simplex)
        .with_sd_tolerance(SD_TOLERANCE)
        .map_err(|e| SharpefolioError::Optimization {
            reason: format!("solver setup failed: {e}"),
        })?;
    let res = Executor::new(cost, solver)
        .configure(|state| state.max_iters(MAX_ITERS))
        .run()
        .map_err(|e| SharpefolioError::Optimization {
            reason: format!("max-Sharpe search failed: {e}"),
        })?;

    let best = res.state.best_param.unwrap_or(x0);
    let w = DVector::from_vec(simplex_weights(&best));
    debug!(sharpe = sharpe_of(&w, excess, cov), "max-Sharpe search finished");
    Ok(w)
}

/// Exact optimum on the assets the search kept, or `None` when that support
/// does not give a strictly long portfolio at least as good as `searched`.
fn refine_on_support(
    excess: &DVector<f64>,
    cov: &DMatrix<f64>,
    searched: &DVector<f64>,
) -> Option<DVector<f64>> {
    let n = excess.len();
    let support: Vec<usize> = (0..n).filter(|&i| searched[i] > SUPPORT_CUTOFF).collect();
    if support.is_empty() {
        return None;
    }

    let k = support.len();
    let sub_cov = DMatrix::from_fn(k, k, |r, c| cov[(support[r], support[c])]);
    let sub_excess = DVector::from_fn(k, |r, _| excess[support[r]]);
    let y = sub_cov.cholesky()?.solve(&sub_excess);
    if y.iter().any(|&v| v <= 0.0) {
        return None;
    }

    let total = y.sum();
    let mut w = DVector::zeros(n);
    for (r, &i) in support.iter().enumerate() {
        w[i] = y[r] / total;
    }
    (sharpe_of(&w, excess, cov) >= sharpe_of(searched, excess, cov) - 1e-12).then_some(w)
}

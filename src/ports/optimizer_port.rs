//! Portfolio optimisation port traits.

use crate::domain::error::SharpefolioError;
use crate::domain::optimization::{DiscreteAllocation, Performance};
use crate::domain::price_frame::PriceFrame;
use nalgebra::{DMatrix, DVector};

/// Mean-variance estimation and optimisation over a close-price frame.
/// Vectors are indexed like the frame's tickers.
pub trait PortfolioOptimizer {
    /// Annualised expected return per ticker.
    fn expected_returns(&self, frame: &PriceFrame) -> Result<DVector<f64>, SharpefolioError>;

    /// Annualised covariance of daily returns.
    fn sample_covariance(&self, frame: &PriceFrame) -> Result<DMatrix<f64>, SharpefolioError>;

    /// Long-only weights summing to one that maximise the Sharpe ratio.
    fn max_sharpe(
        &self,
        expected_returns: &DVector<f64>,
        covariance: &DMatrix<f64>,
    ) -> Result<DVector<f64>, SharpefolioError>;

    fn portfolio_performance(
        &self,
        weights: &DVector<f64>,
        expected_returns: &DVector<f64>,
        covariance: &DMatrix<f64>,
    ) -> Performance;
}

/// Converts continuous weights into whole-share counts under a budget.
pub trait DiscreteAllocator {
    fn allocate(
        &self,
        weights: &[(String, f64)],
        latest_prices: &[(String, f64)],
        total_value: f64,
    ) -> Result<DiscreteAllocation, SharpefolioError>;
}

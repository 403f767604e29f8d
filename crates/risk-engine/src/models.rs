use analysis_core::RiskLevel;
use serde::{Deserialize, Serialize};

/// Risk metrics for one price history. Percentages unless stated otherwise.
///
/// `beta` and `sharpe_ratio` are `None` when their inputs were degenerate
/// (no usable benchmark, zero volatility) rather than silently defaulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Standard deviation of daily returns, percent
    pub daily_volatility: f64,
    /// Daily volatility scaled by sqrt(trading days per year), percent
    pub annualized_volatility: f64,
    pub beta: Option<f64>,
    /// Historical-simulation VaR magnitude at the configured percentile, percent
    pub var_95: f64,
    /// VaR translated to currency for the supplied position value
    pub var_amount: Option<f64>,
    /// Worst peak-to-trough decline of compounded returns, percent, always <= 0
    pub max_drawdown: f64,
    pub sharpe_ratio: Option<f64>,
    /// Weighted composite on a 0-100 scale
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
}

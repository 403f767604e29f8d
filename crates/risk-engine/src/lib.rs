mod models;

#[cfg(test)]
mod tests;

use analysis_core::{AnalysisError, PricePoint, RiskConfig, RiskLevel};
use statrs::statistics::Statistics;
use tracing::debug;

pub use models::RiskAssessment;

pub struct RiskEngine {
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Compute the full risk profile for a price history.
    ///
    /// `benchmark` feeds the covariance beta; without it (or with a
    /// zero-variance benchmark) beta is `None` and its score weight is
    /// redistributed. `position_value` scales VaR into currency.
    pub fn assess(
        &self,
        prices: &[PricePoint],
        benchmark: Option<&[PricePoint]>,
        position_value: Option<f64>,
    ) -> Result<RiskAssessment, AnalysisError> {
        if prices.len() < self.config.min_history {
            return Err(AnalysisError::InsufficientHistory {
                required: self.config.min_history,
                actual: prices.len(),
            });
        }

        let closes: Vec<f64> = prices.iter().map(|p| p.close).collect();
        let returns = daily_returns(&closes)?;

        let daily_volatility = returns.as_slice().std_dev() * 100.0;
        let annualized_volatility =
            daily_volatility * self.config.trading_days_per_year.sqrt();

        let beta = benchmark.and_then(|bench| {
            let bench_closes: Vec<f64> = bench.iter().map(|p| p.close).collect();
            match daily_returns(&bench_closes) {
                Ok(bench_returns) => covariance_beta(&returns, &bench_returns),
                Err(err) => {
                    debug!(%err, "benchmark series unusable, beta omitted");
                    None
                }
            }
        });

        let var_95 = historical_var(&returns, self.config.var_percentile);
        let var_amount = position_value.map(|value| value * var_95 / 100.0);
        let max_drawdown = max_drawdown(&returns);
        let sharpe_ratio = self.sharpe_ratio(&returns);

        let risk_score = self.risk_score(annualized_volatility, beta, var_95);
        let risk_level = self.risk_level(risk_score);
        let recommendations = self.recommendations(
            annualized_volatility,
            max_drawdown,
            beta,
            sharpe_ratio,
            risk_level,
        );

        Ok(RiskAssessment {
            daily_volatility,
            annualized_volatility,
            beta,
            var_95,
            var_amount,
            max_drawdown,
            sharpe_ratio,
            risk_score,
            risk_level,
            recommendations,
        })
    }

    fn sharpe_ratio(&self, returns: &[f64]) -> Option<f64> {
        let mean = returns.mean();
        let std_dev = returns.std_dev();
        if std_dev == 0.0 {
            return None;
        }

        let annualized_return = mean * self.config.trading_days_per_year;
        let annualized_std = std_dev * self.config.trading_days_per_year.sqrt();
        Some((annualized_return - self.config.risk_free_rate) / annualized_std)
    }

    /// Weighted 0-100 composite. When beta is unavailable its weight is
    /// redistributed over the remaining components.
    fn risk_score(&self, annualized_volatility: f64, beta: Option<f64>, var_95: f64) -> f64 {
        let weights = &self.config.weights;
        let score = match beta {
            Some(beta) => {
                annualized_volatility * weights.volatility
                    + (beta - 1.0).abs() * 20.0 * weights.beta
                    + var_95 * weights.var
            }
            None => {
                let remaining = weights.volatility + weights.var;
                if remaining == 0.0 {
                    0.0
                } else {
                    (annualized_volatility * weights.volatility + var_95 * weights.var) / remaining
                }
            }
        };
        score.clamp(0.0, 100.0)
    }

    fn risk_level(&self, risk_score: f64) -> RiskLevel {
        if risk_score < self.config.medium_bound {
            RiskLevel::Low
        } else if risk_score < self.config.high_bound {
            RiskLevel::Medium
        } else if risk_score < self.config.very_high_bound {
            RiskLevel::High
        } else {
            RiskLevel::VeryHigh
        }
    }

    fn recommendations(
        &self,
        annualized_volatility: f64,
        max_drawdown: f64,
        beta: Option<f64>,
        sharpe_ratio: Option<f64>,
        risk_level: RiskLevel,
    ) -> Vec<String> {
        let mut recommendations = Vec::new();

        if annualized_volatility > 40.0 {
            recommendations.push(
                "High volatility: control position size and avoid over-concentration".to_string(),
            );
        } else if annualized_volatility < 15.0 {
            recommendations.push(
                "Low volatility: relatively stable, suitable for conservative allocations"
                    .to_string(),
            );
        }

        if max_drawdown < -30.0 {
            recommendations.push(
                "Large drawdown risk: history shows significant declines from peaks".to_string(),
            );
        } else if max_drawdown < -20.0 {
            recommendations
                .push("Moderate drawdown: history shows noticeable pullbacks".to_string());
        }

        match beta {
            Some(beta) if beta > 1.5 => recommendations
                .push("High beta: moves amplify the market, suits higher risk appetite".to_string()),
            Some(beta) if beta < 0.5 => recommendations
                .push("Low beta: weak market correlation, relatively defensive".to_string()),
            _ => {}
        }

        match sharpe_ratio {
            Some(sharpe) if sharpe < 0.0 => recommendations
                .push("Negative Sharpe ratio: risk-adjusted return is negative".to_string()),
            Some(sharpe) if sharpe > 1.0 => recommendations
                .push("Good risk-return profile: Sharpe ratio above 1.0".to_string()),
            Some(sharpe) if sharpe > 0.5 => recommendations
                .push("Reasonable risk-return profile: Sharpe ratio in acceptable range".to_string()),
            _ => {}
        }

        match risk_level {
            RiskLevel::VeryHigh => recommendations.push(
                "Very high risk: suitable only for very high risk tolerance".to_string(),
            ),
            RiskLevel::High => recommendations
                .push("High risk: strictly control position size and monitor closely".to_string()),
            _ => {}
        }

        if recommendations.is_empty() {
            recommendations.push("Risk metrics are within a reasonable range".to_string());
        }

        recommendations
    }
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new(RiskConfig::default())
    }
}

fn daily_returns(closes: &[f64]) -> Result<Vec<f64>, AnalysisError> {
    if closes.len() < 2 {
        return Err(AnalysisError::InsufficientHistory {
            required: 2,
            actual: closes.len(),
        });
    }
    closes
        .windows(2)
        .map(|w| {
            if w[0] == 0.0 {
                Err(AnalysisError::Computation(
                    "zero price in return series".to_string(),
                ))
            } else {
                Ok((w[1] - w[0]) / w[0])
            }
        })
        .collect()
}

/// Covariance-over-variance beta against benchmark returns, aligned on the
/// most recent overlapping window. `None` when the overlap is too short or
/// the benchmark shows no variance.
fn covariance_beta(asset_returns: &[f64], bench_returns: &[f64]) -> Option<f64> {
    let n = asset_returns.len().min(bench_returns.len());
    if n < 2 {
        return None;
    }

    let asset = &asset_returns[asset_returns.len() - n..];
    let bench = &bench_returns[bench_returns.len() - n..];

    let asset_mean = asset.mean();
    let bench_mean = bench.mean();

    let mut covariance = 0.0;
    let mut bench_variance = 0.0;
    for i in 0..n {
        let asset_diff = asset[i] - asset_mean;
        let bench_diff = bench[i] - bench_mean;
        covariance += asset_diff * bench_diff;
        bench_variance += bench_diff * bench_diff;
    }

    if bench_variance == 0.0 {
        return None;
    }
    Some(covariance / bench_variance)
}

/// Loss magnitude (percent) at the given percentile of the sorted return
/// distribution. Zero when even that percentile return is a gain.
fn historical_var(returns: &[f64], percentile: f64) -> f64 {
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let index = (sorted.len() as f64 * percentile) as usize;
    match sorted.get(index) {
        Some(value) => value.min(0.0).abs() * 100.0,
        None => 0.0,
    }
}

/// Worst peak-to-trough decline of the compounded return path, percent, <= 0
fn max_drawdown(returns: &[f64]) -> f64 {
    let mut cumulative = 1.0;
    let mut running_max = 1.0;
    let mut worst = 0.0f64;

    for ret in returns {
        cumulative *= 1.0 + ret;
        if cumulative > running_max {
            running_max = cumulative;
        }
        let drawdown = (cumulative - running_max) / running_max;
        if drawdown < worst {
            worst = drawdown;
        }
    }

    worst * 100.0
}

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Technical indicator windows and classification thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalConfig {
    pub short_window: usize,
    pub medium_window: usize,
    pub long_window: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    /// Rate-of-change above which momentum is classified positive (fraction)
    pub momentum_threshold: f64,
    /// Return-dispersion cutoffs for the LOW/MEDIUM/HIGH volatility buckets
    pub volatility_medium_cutoff: f64,
    pub volatility_high_cutoff: f64,
}

impl Default for TechnicalConfig {
    fn default() -> Self {
        Self {
            short_window: 20,
            medium_window: 50,
            long_window: 200,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            momentum_threshold: 0.02,
            volatility_medium_cutoff: 0.02,
            volatility_high_cutoff: 0.05,
        }
    }
}

/// Weights for the 0-100 risk score. Renormalized when beta is unavailable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskWeights {
    pub volatility: f64,
    pub beta: f64,
    pub var: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub min_history: usize,
    pub trading_days_per_year: f64,
    pub risk_free_rate: f64,
    /// Historical-simulation VaR percentile (0.05 = 5th percentile)
    pub var_percentile: f64,
    pub weights: RiskWeights,
    /// Risk level banding: LOW below the first bound, VERY_HIGH at or above
    /// the last
    pub medium_bound: f64,
    pub high_bound: f64,
    pub very_high_bound: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            min_history: 10,
            trading_days_per_year: 252.0,
            risk_free_rate: 0.02,
            var_percentile: 0.05,
            weights: RiskWeights {
                volatility: 0.4,
                beta: 0.3,
                var: 0.3,
            },
            medium_bound: 25.0,
            high_bound: 50.0,
            very_high_bound: 75.0,
        }
    }
}

/// Fear & Greed band cutoffs on the 0-100 composite index
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SentimentBands {
    pub extreme_fear: f64,
    pub fear: f64,
    pub greed: f64,
    pub extreme_greed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    /// News component weight in the composite index; market takes the rest
    pub news_weight: f64,
    pub market_weight: f64,
    /// Hysteresis band for the IMPROVING/DETERIORATING/STABLE trend split
    pub trend_hysteresis: f64,
    pub bands: SentimentBands,
    /// Daily move (percent) past which price momentum reads bullish/bearish
    pub momentum_band_percent: f64,
    /// Latest volume over average volume past which volume reads elevated
    pub volume_surprise_ratio: f64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            news_weight: 0.4,
            market_weight: 0.6,
            trend_hysteresis: 0.1,
            bands: SentimentBands {
                extreme_fear: 25.0,
                fear: 45.0,
                greed: 55.0,
                extreme_greed: 75.0,
            },
            momentum_band_percent: 2.0,
            volume_surprise_ratio: 1.5,
        }
    }
}

/// System-wide alert defaults; per-subject values override them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    pub default_threshold_percent: f64,
    pub default_required_triggers: u32,
    /// How far back past baseline (percent) the price must cross before the
    /// trigger counter resets for a fresh monitoring window
    pub recovery_margin_percent: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            default_threshold_percent: -5.0,
            default_required_triggers: 5,
            recovery_margin_percent: 1.0,
        }
    }
}

/// Orchestrator-level configuration: snapshot ranges and fetch timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub technical: TechnicalConfig,
    pub risk: RiskConfig,
    pub sentiment: SentimentConfig,
    pub price_history_days: i64,
    pub news_lookback_days: i64,
    /// Benchmark symbol for beta; None disables the benchmark fetch
    pub benchmark_symbol: Option<String>,
    pub fetch_timeout_secs: u64,
}

impl AnalysisConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            technical: TechnicalConfig::default(),
            risk: RiskConfig::default(),
            sentiment: SentimentConfig::default(),
            price_history_days: 365,
            news_lookback_days: 7,
            benchmark_symbol: Some("SPY".to_string()),
            fetch_timeout_secs: 10,
        }
    }
}

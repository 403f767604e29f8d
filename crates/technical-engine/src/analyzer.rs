use analysis_core::{
    AnalysisError, Momentum, PricePoint, TechnicalConfig, TradingSignal, TrendDirection,
    TrendStrength, ValuationFlag, ValuationInputs, VolatilityBucket,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::indicators::{self, MacdSeries};

/// Latest values of the MACD line, its signal line and their difference
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MacdSnapshot {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// An indicator that could not be computed from the available history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedIndicator {
    pub indicator: String,
    pub reason: String,
}

/// Full output of one technical pass over a price series.
///
/// Indicators that needed more history than was supplied come back `None`
/// and are listed in `skipped` with the reason; the classification and the
/// composite signal are always produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalAssessment {
    pub last_price: f64,
    pub sma_short: Option<f64>,
    pub sma_medium: Option<f64>,
    pub sma_long: Option<f64>,
    pub ema_short: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<MacdSnapshot>,
    pub trend: TrendDirection,
    pub trend_strength: TrendStrength,
    pub momentum: Momentum,
    pub volatility: VolatilityBucket,
    pub valuation: Option<ValuationFlag>,
    pub signal: TradingSignal,
    pub confidence: f64,
    pub skipped: Vec<SkippedIndicator>,
}

pub struct TechnicalEngine {
    config: TechnicalConfig,
}

impl TechnicalEngine {
    pub fn new(config: TechnicalConfig) -> Self {
        Self { config }
    }

    /// Analyze a chronological price series.
    ///
    /// Fails only when fewer than two points are supplied; any indicator
    /// whose own window is not covered is skipped individually.
    pub fn analyze(
        &self,
        prices: &[PricePoint],
        valuation: Option<&ValuationInputs>,
    ) -> Result<TechnicalAssessment, AnalysisError> {
        let closes: Vec<f64> = prices.iter().map(|p| p.close).collect();
        if closes.len() < 2 {
            return Err(AnalysisError::InsufficientHistory {
                required: 2,
                actual: closes.len(),
            });
        }

        let mut skipped = Vec::new();
        let last_price = closes[closes.len() - 1];

        let sma_short = last_or_skip(
            "sma_short",
            indicators::sma(&closes, self.config.short_window),
            &mut skipped,
        );
        let sma_medium = last_or_skip(
            "sma_medium",
            indicators::sma(&closes, self.config.medium_window),
            &mut skipped,
        );
        let sma_long = last_or_skip(
            "sma_long",
            indicators::sma(&closes, self.config.long_window),
            &mut skipped,
        );
        let ema_short = last_or_skip(
            "ema_short",
            indicators::ema(&closes, self.config.short_window),
            &mut skipped,
        );
        let rsi = last_or_skip(
            "rsi",
            indicators::rsi(&closes, self.config.rsi_period),
            &mut skipped,
        );

        let macd = match indicators::macd(
            &closes,
            self.config.macd_fast,
            self.config.macd_slow,
            self.config.macd_signal,
        ) {
            Ok(series) => macd_snapshot(&series),
            Err(err) => {
                debug!(indicator = "macd", %err, "indicator skipped");
                skipped.push(SkippedIndicator {
                    indicator: "macd".to_string(),
                    reason: err.to_string(),
                });
                None
            }
        };

        let trend = self.classify_trend(&closes, last_price, sma_short, sma_medium);
        let trend_strength = classify_trend_strength(sma_short, sma_medium);
        let momentum = self.classify_momentum(&closes);
        let volatility = self.classify_volatility(&closes, &mut skipped);
        let valuation_flag = valuation.and_then(classify_valuation);

        let (signal, confidence) = self.vote(
            rsi,
            macd.as_ref(),
            trend,
            momentum,
            valuation_flag,
            skipped.len(),
        );

        Ok(TechnicalAssessment {
            last_price,
            sma_short,
            sma_medium,
            sma_long,
            ema_short,
            rsi,
            macd,
            trend,
            trend_strength,
            momentum,
            volatility,
            valuation: valuation_flag,
            signal,
            confidence,
            skipped,
        })
    }

    fn classify_trend(
        &self,
        closes: &[f64],
        last_price: f64,
        sma_short: Option<f64>,
        sma_medium: Option<f64>,
    ) -> TrendDirection {
        if let (Some(short), Some(medium)) = (sma_short, sma_medium) {
            if last_price > short && last_price > medium {
                return TrendDirection::Up;
            }
            if last_price < short && last_price < medium {
                return TrendDirection::Down;
            }
            return TrendDirection::Neutral;
        }

        // Not enough history for the moving averages: compare the average of
        // the older half of the series with the newer half
        let mid = closes.len() / 2;
        let older = closes[..mid].iter().sum::<f64>() / mid as f64;
        let newer = closes[mid..].iter().sum::<f64>() / (closes.len() - mid) as f64;
        if older == 0.0 {
            return TrendDirection::Neutral;
        }

        let change = newer / older - 1.0;
        if change > self.config.momentum_threshold {
            TrendDirection::Up
        } else if change < -self.config.momentum_threshold {
            TrendDirection::Down
        } else {
            TrendDirection::Neutral
        }
    }

    fn classify_momentum(&self, closes: &[f64]) -> Momentum {
        let first = closes[0];
        if first == 0.0 {
            return Momentum::Neutral;
        }
        let change = closes[closes.len() - 1] / first - 1.0;
        if change > self.config.momentum_threshold {
            Momentum::Positive
        } else if change < -self.config.momentum_threshold {
            Momentum::Negative
        } else {
            Momentum::Neutral
        }
    }

    fn classify_volatility(
        &self,
        closes: &[f64],
        skipped: &mut Vec<SkippedIndicator>,
    ) -> VolatilityBucket {
        match indicators::return_dispersion(closes) {
            Ok(dispersion) => {
                if dispersion < self.config.volatility_medium_cutoff {
                    VolatilityBucket::Low
                } else if dispersion < self.config.volatility_high_cutoff {
                    VolatilityBucket::Medium
                } else {
                    VolatilityBucket::High
                }
            }
            Err(err) => {
                debug!(indicator = "volatility", %err, "indicator skipped");
                skipped.push(SkippedIndicator {
                    indicator: "volatility".to_string(),
                    reason: err.to_string(),
                });
                VolatilityBucket::Medium
            }
        }
    }

    fn vote(
        &self,
        rsi: Option<f64>,
        macd: Option<&MacdSnapshot>,
        trend: TrendDirection,
        momentum: Momentum,
        valuation: Option<ValuationFlag>,
        skipped_count: usize,
    ) -> (TradingSignal, f64) {
        let mut buy = 0u32;
        let mut sell = 0u32;

        // An RSI extreme reads as a reversal hint only when the prevailing
        // trend does not already explain it
        if let Some(rsi) = rsi {
            if rsi < 30.0 && trend != TrendDirection::Down {
                buy += 1;
            } else if rsi > 70.0 && trend != TrendDirection::Up {
                sell += 1;
            }
        }
        match trend {
            TrendDirection::Up => buy += 1,
            TrendDirection::Down => sell += 1,
            TrendDirection::Neutral => {}
        }
        if let Some(macd) = macd {
            if macd.histogram > 0.0 {
                buy += 1;
            } else if macd.histogram < 0.0 {
                sell += 1;
            }
        }
        match momentum {
            Momentum::Positive => buy += 1,
            Momentum::Negative => sell += 1,
            Momentum::Neutral => {}
        }
        match valuation {
            Some(ValuationFlag::Undervalued) => buy += 1,
            Some(ValuationFlag::Overvalued) => sell += 1,
            _ => {}
        }

        let signal = if buy >= 2 && buy > sell {
            TradingSignal::Buy
        } else if sell >= 2 && sell > buy {
            TradingSignal::Sell
        } else {
            TradingSignal::Hold
        };

        let mut confidence: f64 = 0.5;
        if let Some(rsi) = rsi {
            if (30.0..=70.0).contains(&rsi) {
                confidence += 0.1;
            }
        }
        if trend != TrendDirection::Neutral {
            confidence += 0.1;
        }
        if macd.is_some() {
            confidence += 0.1;
        }
        confidence -= 0.1 * skipped_count as f64;

        (signal, confidence.clamp(0.0, 1.0))
    }
}

impl Default for TechnicalEngine {
    fn default() -> Self {
        Self::new(TechnicalConfig::default())
    }
}

fn last_or_skip(
    name: &str,
    result: Result<Vec<f64>, AnalysisError>,
    skipped: &mut Vec<SkippedIndicator>,
) -> Option<f64> {
    match result {
        Ok(values) => values.last().copied(),
        Err(err) => {
            debug!(indicator = name, %err, "indicator skipped");
            skipped.push(SkippedIndicator {
                indicator: name.to_string(),
                reason: err.to_string(),
            });
            None
        }
    }
}

fn macd_snapshot(series: &MacdSeries) -> Option<MacdSnapshot> {
    let macd = *series.macd_line.last()?;
    let signal = *series.signal_line.last()?;
    let histogram = *series.histogram.last()?;
    Some(MacdSnapshot {
        macd,
        signal,
        histogram,
    })
}

fn classify_trend_strength(sma_short: Option<f64>, sma_medium: Option<f64>) -> TrendStrength {
    let (short, medium) = match (sma_short, sma_medium) {
        (Some(s), Some(m)) if m != 0.0 => (s, m),
        _ => return TrendStrength::Weak,
    };
    let divergence = ((short - medium) / medium).abs();
    if divergence > 0.05 {
        TrendStrength::Strong
    } else if divergence > 0.02 {
        TrendStrength::Moderate
    } else {
        TrendStrength::Weak
    }
}

fn classify_valuation(inputs: &ValuationInputs) -> Option<ValuationFlag> {
    if inputs.pe_ratio.is_none() && inputs.pb_ratio.is_none() {
        return None;
    }
    let pe = inputs.pe_ratio;
    let pb = inputs.pb_ratio;

    let undervalued =
        pe.map(|v| v > 0.0 && v < 15.0).unwrap_or(true) && pb.map(|v| v < 1.5).unwrap_or(true);
    if undervalued {
        return Some(ValuationFlag::Undervalued);
    }
    let overvalued = pe.map(|v| v > 25.0).unwrap_or(false) || pb.map(|v| v > 3.0).unwrap_or(false);
    if overvalued {
        return Some(ValuationFlag::Overvalued);
    }
    Some(ValuationFlag::Fair)
}

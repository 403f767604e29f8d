use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Daily OHLCV observation for a tracked subject
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Sentiment label, either precomputed by an external classifier or absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Numeric mapping used for aggregation: positive 0.8, negative 0.2, neutral 0.5
    pub fn score(&self) -> f64 {
        match self {
            SentimentLabel::Positive => 0.8,
            SentimentLabel::Negative => 0.2,
            SentimentLabel::Neutral => 0.5,
        }
    }

    pub fn from_score(score: f64) -> Self {
        if score > 0.6 {
            SentimentLabel::Positive
        } else if score < 0.4 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

/// News article as delivered by the ingestion collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub sentiment: Option<SentimentLabel>,
    #[serde(default)]
    pub category: Option<String>,
}

/// A tracked instrument under price monitoring.
///
/// `baseline_price` is set when monitoring starts (or explicitly reset) and is
/// the reference every percentage-change alert is measured against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedSubject {
    pub id: i64,
    pub symbol: String,
    pub baseline_price: f64,
    pub threshold_percent: f64,
    pub required_triggers: u32,
}

/// Optional valuation ratios fed to the technical engine
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ValuationInputs {
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
}

/// Recent price/volume signal fed to the sentiment engine
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub price_change_percent: f64,
    pub latest_volume: f64,
    pub average_volume: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradingSignal {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Up,
    Down,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendStrength {
    Weak,
    Moderate,
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Momentum {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolatilityBucket {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValuationFlag {
    Undervalued,
    Fair,
    Overvalued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SentimentTrend {
    Improving,
    Deteriorating,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FearGreedBand {
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    ExtremeGreed,
}

/// One section of a composed analysis result.
///
/// A section that could not be computed carries the reason instead of the
/// value, so partial failures stay visible all the way to the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Section<T> {
    Ready(T),
    Unavailable { reason: String },
}

impl<T> Section<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Section::Unavailable {
            reason: reason.into(),
        }
    }

    /// Collapse a recoverable engine failure into an unavailable section.
    /// Non-recoverable errors (invalid transitions, conflicts) propagate.
    pub fn from_engine_result(result: Result<T, AnalysisError>) -> Result<Self, AnalysisError> {
        match result {
            Ok(value) => Ok(Section::Ready(value)),
            Err(err) if err.is_recoverable() => Ok(Section::Unavailable {
                reason: err.to_string(),
            }),
            Err(err) => Err(err),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Section::Ready(_))
    }

    pub fn as_ready(&self) -> Option<&T> {
        match self {
            Section::Ready(value) => Some(value),
            Section::Unavailable { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Section::Ready(_) => None,
            Section::Unavailable { reason } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_enums_use_screaming_snake_case() {
        assert_eq!(
            serde_json::to_value(RiskLevel::VeryHigh).unwrap(),
            json!("VERY_HIGH")
        );
        assert_eq!(
            serde_json::to_value(FearGreedBand::ExtremeFear).unwrap(),
            json!("EXTREME_FEAR")
        );
        assert_eq!(
            serde_json::to_value(TradingSignal::Hold).unwrap(),
            json!("HOLD")
        );
    }

    #[test]
    fn section_serializes_with_status_tag() {
        let ready: Section<u32> = Section::Ready(7);
        assert_eq!(
            serde_json::to_value(&ready).unwrap(),
            json!({"status": "ready", "value": 7})
        );

        let unavailable: Section<u32> = Section::unavailable("feed offline");
        assert_eq!(
            serde_json::to_value(&unavailable).unwrap(),
            json!({"status": "unavailable", "value": {"reason": "feed offline"}})
        );
    }

    #[test]
    fn section_recovers_only_recoverable_errors() {
        let recovered = Section::<u32>::from_engine_result(Err(AnalysisError::DataUnavailable(
            "nothing in range".to_string(),
        )))
        .unwrap();
        assert!(!recovered.is_ready());
        assert!(recovered.reason().unwrap().contains("nothing in range"));

        let fatal = Section::<u32>::from_engine_result(Err(
            AnalysisError::ConcurrencyConflict("raced".to_string()),
        ));
        assert!(fatal.is_err());
    }

    #[test]
    fn label_score_mapping_round_trips_through_thresholds() {
        assert_eq!(SentimentLabel::from_score(SentimentLabel::Positive.score()), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(SentimentLabel::Negative.score()), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_score(0.5), SentimentLabel::Neutral);
    }
}

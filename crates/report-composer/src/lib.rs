
use analysis_core::{FearGreedBand, RiskLevel, Section, TradingSignal, TrendDirection};
use analysis_orchestrator::AnalysisResult;
use chrono::{DateTime, Utc};
use risk_engine::RiskAssessment;
use sentiment_engine::SentimentAssessment;
use serde::{Deserialize, Serialize};
use technical_engine::TechnicalAssessment;
use tracing::debug;
use uuid::Uuid;

/// Composition knobs. The veto downgrades a BUY to HOLD when the risk
/// section reads VERY_HIGH.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPolicy {
    pub veto_buy_on_very_high_risk: bool,
}

impl Default for ReportPolicy {
    fn default() -> Self {
        Self {
            veto_buy_on_very_high_risk: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// Weighted 0-100 composite: technical 40%, risk 30%, sentiment 30%.
/// A missing section contributes its neutral midpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallScore {
    pub score: f64,
    pub rating: ReportRating,
    pub technical_component: f64,
    pub risk_component: f64,
    pub sentiment_component: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub symbol: String,
    pub generated_at: DateTime<Utc>,
    pub summary: String,
    pub technical_section: String,
    pub risk_section: String,
    pub sentiment_section: String,
    pub recommendations: Vec<String>,
    pub overall_recommendation: TradingSignal,
    pub overall_score: OverallScore,
}

pub struct ReportComposer {
    policy: ReportPolicy,
}

impl ReportComposer {
    pub fn new(policy: ReportPolicy) -> Self {
        Self { policy }
    }

    /// Render an analysis result into a report. Always succeeds: sections
    /// that were unavailable are named as such in the narrative and score
    /// at their neutral midpoint.
    pub fn compose(&self, result: &AnalysisResult) -> Report {
        let technical = result.technical.as_ready();
        let risk = result.risk.as_ready();
        let sentiment = result.sentiment.as_ready();

        let mut recommendations = Vec::new();
        let mut overall = self.majority_signal(technical, sentiment);

        if self.policy.veto_buy_on_very_high_risk
            && overall == TradingSignal::Buy
            && risk.map(|r| r.risk_level) == Some(RiskLevel::VeryHigh)
        {
            debug!(symbol = %result.symbol, "buy vetoed by very high risk");
            overall = TradingSignal::Hold;
            recommendations
                .push("Buy signal withheld: overall risk level is very high".to_string());
        }

        self.extend_recommendations(&mut recommendations, technical, risk, sentiment);

        let overall_score = overall_score(technical, risk, sentiment);
        let summary = summary(result, overall, &overall_score);

        Report {
            id: Uuid::new_v4(),
            symbol: result.symbol.clone(),
            generated_at: Utc::now(),
            summary,
            technical_section: technical_narrative(&result.technical),
            risk_section: risk_narrative(&result.risk),
            sentiment_section: sentiment_narrative(&result.sentiment),
            recommendations,
            overall_recommendation: overall,
            overall_score,
        }
    }

    /// Majority vote over the signal-bearing sections; ties read HOLD
    fn majority_signal(
        &self,
        technical: Option<&TechnicalAssessment>,
        sentiment: Option<&SentimentAssessment>,
    ) -> TradingSignal {
        let mut buy = 0u32;
        let mut sell = 0u32;

        if let Some(technical) = technical {
            match technical.signal {
                TradingSignal::Buy => buy += 1,
                TradingSignal::Sell => sell += 1,
                TradingSignal::Hold => {}
            }
        }
        if let Some(sentiment) = sentiment {
            let vote = sentiment
                .contrarian_signal
                .unwrap_or(match sentiment.news_label {
                    analysis_core::SentimentLabel::Positive => TradingSignal::Buy,
                    analysis_core::SentimentLabel::Negative => TradingSignal::Sell,
                    analysis_core::SentimentLabel::Neutral => TradingSignal::Hold,
                });
            match vote {
                TradingSignal::Buy => buy += 1,
                TradingSignal::Sell => sell += 1,
                TradingSignal::Hold => {}
            }
        }

        if buy > sell {
            TradingSignal::Buy
        } else if sell > buy {
            TradingSignal::Sell
        } else {
            TradingSignal::Hold
        }
    }

    fn extend_recommendations(
        &self,
        recommendations: &mut Vec<String>,
        technical: Option<&TechnicalAssessment>,
        risk: Option<&RiskAssessment>,
        sentiment: Option<&SentimentAssessment>,
    ) {
        if let Some(technical) = technical {
            match technical.signal {
                TradingSignal::Buy => recommendations
                    .push("Technical indicators lean toward buying".to_string()),
                TradingSignal::Sell => recommendations
                    .push("Technical indicators lean toward selling".to_string()),
                TradingSignal::Hold => {}
            }
        }

        if let Some(risk) = risk {
            match risk.risk_level {
                RiskLevel::High | RiskLevel::VeryHigh => recommendations
                    .push("Elevated risk profile: size positions accordingly".to_string()),
                RiskLevel::Low => recommendations
                    .push("Low risk profile: suitable for conservative portfolios".to_string()),
                RiskLevel::Medium => {}
            }
            recommendations.extend(risk.recommendations.iter().cloned());
        }

        if let Some(sentiment) = sentiment {
            match sentiment.fear_greed.band {
                FearGreedBand::ExtremeFear => recommendations.push(
                    "Market shows extreme fear: potential contrarian entry point".to_string(),
                ),
                FearGreedBand::ExtremeGreed => recommendations
                    .push("Market shows extreme greed: consider taking profits".to_string()),
                _ => {}
            }
        }

        if recommendations.is_empty() {
            recommendations.push("No actionable signals at this time".to_string());
        }
    }
}

impl Default for ReportComposer {
    fn default() -> Self {
        Self::new(ReportPolicy::default())
    }
}

fn overall_score(
    technical: Option<&TechnicalAssessment>,
    risk: Option<&RiskAssessment>,
    sentiment: Option<&SentimentAssessment>,
) -> OverallScore {
    let technical_component = match technical {
        Some(technical) => match technical.signal {
            TradingSignal::Buy => 70.0,
            TradingSignal::Sell => 30.0,
            TradingSignal::Hold => 50.0,
        },
        None => 50.0,
    };
    // Low risk scores high
    let risk_component = risk.map(|r| 100.0 - r.risk_score).unwrap_or(50.0);
    let sentiment_component = sentiment.map(|s| s.fear_greed.index).unwrap_or(50.0);

    let score = technical_component * 0.4 + risk_component * 0.3 + sentiment_component * 0.3;
    let rating = if score >= 80.0 {
        ReportRating::Excellent
    } else if score >= 60.0 {
        ReportRating::Good
    } else if score >= 40.0 {
        ReportRating::Fair
    } else {
        ReportRating::Poor
    };

    OverallScore {
        score,
        rating,
        technical_component,
        risk_component,
        sentiment_component,
    }
}

fn summary(result: &AnalysisResult, overall: TradingSignal, score: &OverallScore) -> String {
    let risk_line = match result.risk.as_ready() {
        Some(risk) => format!("{:?}", risk.risk_level).to_uppercase(),
        None => "UNAVAILABLE".to_string(),
    };
    let sentiment_line = match result.sentiment.as_ready() {
        Some(sentiment) => band_label(sentiment.fear_greed.band).to_string(),
        None => "UNAVAILABLE".to_string(),
    };
    let confidence_line = match result.technical.as_ready() {
        Some(technical) => format!("{:.0}%", technical.confidence * 100.0),
        None => "n/a".to_string(),
    };

    format!(
        "{symbol}: {signal} ({rating:?}, score {score:.1}). Confidence {confidence}, risk {risk}, market sentiment {sentiment}.",
        symbol = result.symbol,
        signal = signal_label(overall),
        rating = score.rating,
        score = score.score,
        confidence = confidence_line,
        risk = risk_line,
        sentiment = sentiment_line,
    )
}

fn technical_narrative(section: &Section<TechnicalAssessment>) -> String {
    match section {
        Section::Ready(technical) => {
            let rsi = technical
                .rsi
                .map(|v| format!("{v:.1}"))
                .unwrap_or_else(|| "n/a".to_string());
            let mut line = format!(
                "Trend {trend} ({strength:?}), RSI {rsi}, momentum {momentum:?}, volatility {volatility:?}, signal {signal}.",
                trend = trend_label(technical.trend),
                strength = technical.trend_strength,
                rsi = rsi,
                momentum = technical.momentum,
                volatility = technical.volatility,
                signal = signal_label(technical.signal),
            );
            if !technical.skipped.is_empty() {
                let names: Vec<&str> = technical
                    .skipped
                    .iter()
                    .map(|s| s.indicator.as_str())
                    .collect();
                line.push_str(&format!(" Skipped indicators: {}.", names.join(", ")));
            }
            line
        }
        Section::Unavailable { reason } => {
            format!("Technical analysis unavailable: {reason}")
        }
    }
}

fn risk_narrative(section: &Section<RiskAssessment>) -> String {
    match section {
        Section::Ready(risk) => {
            let beta = risk
                .beta
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "n/a".to_string());
            format!(
                "Risk level {level:?} (score {score:.1}): annualized volatility {vol:.1}%, beta {beta}, 95% VaR {var:.2}%, max drawdown {dd:.1}%.",
                level = risk.risk_level,
                score = risk.risk_score,
                vol = risk.annualized_volatility,
                beta = beta,
                var = risk.var_95,
                dd = risk.max_drawdown,
            )
        }
        Section::Unavailable { reason } => format!("Risk analysis unavailable: {reason}"),
    }
}

fn sentiment_narrative(section: &Section<SentimentAssessment>) -> String {
    match section {
        Section::Ready(sentiment) => {
            let mut line = format!(
                "News sentiment {score:.2} over {count} articles ({trend:?}), Fear & Greed {index:.0} ({band}).",
                score = sentiment.news_score,
                count = sentiment.article_count,
                trend = sentiment.trend,
                index = sentiment.fear_greed.index,
                band = band_label(sentiment.fear_greed.band),
            );
            if sentiment.insufficient_data {
                line.push_str(" No recent news was available; the score is a neutral default.");
            }
            line
        }
        Section::Unavailable { reason } => {
            format!("Sentiment analysis unavailable: {reason}")
        }
    }
}

fn signal_label(signal: TradingSignal) -> &'static str {
    match signal {
        TradingSignal::Buy => "BUY",
        TradingSignal::Sell => "SELL",
        TradingSignal::Hold => "HOLD",
    }
}

fn trend_label(trend: TrendDirection) -> &'static str {
    match trend {
        TrendDirection::Up => "UP",
        TrendDirection::Down => "DOWN",
        TrendDirection::Neutral => "NEUTRAL",
    }
}

fn band_label(band: FearGreedBand) -> &'static str {
    match band {
        FearGreedBand::ExtremeFear => "EXTREME_FEAR",
        FearGreedBand::Fear => "FEAR",
        FearGreedBand::Neutral => "NEUTRAL",
        FearGreedBand::Greed => "GREED",
        FearGreedBand::ExtremeGreed => "EXTREME_GREED",
    }
}

#[cfg(test)]
mod tests;

use std::sync::Arc;

use analysis_core::{
    AnalysisConfig, AnalysisError, MarketDataProvider, MarketSnapshot, NewsItem, PricePoint,
    Section, ValuationInputs,
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use risk_engine::{RiskAssessment, RiskEngine};
use sentiment_engine::{SentimentAssessment, SentimentEngine};
use serde::{Deserialize, Serialize};
use technical_engine::{TechnicalAssessment, TechnicalEngine};
use tokio::time::timeout;
use tracing::{info, warn};

/// Composite output of one analysis run. Each section either carries its
/// engine's assessment or the reason it could not be produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub symbol: String,
    pub generated_at: DateTime<Utc>,
    pub last_price: Option<f64>,
    pub technical: Section<TechnicalAssessment>,
    pub risk: Section<RiskAssessment>,
    pub sentiment: Section<SentimentAssessment>,
}

/// Coordinates ingestion and the three engines for a single symbol.
///
/// Concurrent runs for the same symbol coalesce: each run takes a
/// generation number, and a run that finds itself superseded by a newer
/// one fails with `ConcurrencyConflict` instead of returning stale data.
pub struct AnalysisOrchestrator {
    provider: Arc<dyn MarketDataProvider>,
    technical: Arc<TechnicalEngine>,
    risk: Arc<RiskEngine>,
    sentiment: Arc<SentimentEngine>,
    config: AnalysisConfig,
    generations: DashMap<String, u64>,
}

impl AnalysisOrchestrator {
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: AnalysisConfig) -> Self {
        Self {
            provider,
            technical: Arc::new(TechnicalEngine::new(config.technical.clone())),
            risk: Arc::new(RiskEngine::new(config.risk.clone())),
            sentiment: Arc::new(SentimentEngine::new(config.sentiment.clone())),
            config,
            generations: DashMap::new(),
        }
    }

    pub fn with_sentiment_engine(mut self, sentiment: SentimentEngine) -> Self {
        self.sentiment = Arc::new(sentiment);
        self
    }

    /// Run a full analysis pass for a symbol.
    ///
    /// Recoverable ingestion and engine failures degrade the affected
    /// sections; only invalid transitions, conflicts and task panics fail
    /// the whole run.
    pub async fn analyze(
        &self,
        symbol: &str,
        valuation: Option<ValuationInputs>,
        position_value: Option<f64>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let key = symbol.to_uppercase();
        let generation = {
            let mut entry = self.generations.entry(key.clone()).or_insert(0);
            *entry += 1;
            *entry
        };
        info!(symbol = %key, generation, "starting analysis run");

        let since = Utc::now() - Duration::days(self.config.news_lookback_days);
        let (prices_result, news_result, benchmark_result) = tokio::join!(
            self.fetch_prices(symbol),
            self.fetch_news(symbol, since),
            self.fetch_benchmark(),
        );

        // Non-recoverable fetch errors abort the run; recoverable ones
        // degrade into per-section reasons
        let prices = recoverable_or_abort(prices_result)?;
        let news = recoverable_or_abort(news_result)?;
        let benchmark = match benchmark_result {
            Ok(prices) => prices,
            Err(err) => {
                warn!(%err, "benchmark fetch failed, beta will be omitted");
                None
            }
        };

        let last_price = prices
            .as_ref()
            .ok()
            .and_then(|prices| prices.last())
            .map(|point| point.close);

        // Sentiment runs even without price history; the market snapshot
        // just degrades to its neutral default
        let snapshot = prices
            .as_ref()
            .ok()
            .map(|prices| market_snapshot(prices))
            .unwrap_or_default();

        // Fan out: the CPU-bound engines go to blocking tasks, sentiment
        // stays async, and none of them cancels the others
        let technical_section = async {
            match &prices {
                Ok(prices) => {
                    let engine = Arc::clone(&self.technical);
                    let prices = prices.clone();
                    let result = tokio::task::spawn_blocking(move || {
                        engine.analyze(&prices, valuation.as_ref())
                    })
                    .await
                    .map_err(|err| {
                        AnalysisError::Computation(format!("technical task failed: {err}"))
                    })?;
                    Section::from_engine_result(result)
                }
                Err(reason) => Ok(Section::unavailable(reason.clone())),
            }
        };

        let risk_section = async {
            match &prices {
                Ok(prices) => {
                    let engine = Arc::clone(&self.risk);
                    let prices = prices.clone();
                    let benchmark = benchmark.clone();
                    let result = tokio::task::spawn_blocking(move || {
                        engine.assess(&prices, benchmark.as_deref(), position_value)
                    })
                    .await
                    .map_err(|err| {
                        AnalysisError::Computation(format!("risk task failed: {err}"))
                    })?;
                    Section::from_engine_result(result)
                }
                Err(reason) => Ok(Section::unavailable(reason.clone())),
            }
        };

        let sentiment_section = async {
            match &news {
                Ok(news) => Section::from_engine_result(self.sentiment.analyze(news, &snapshot).await),
                Err(reason) => Ok(Section::unavailable(reason.clone())),
            }
        };

        let (technical, risk, sentiment) =
            tokio::join!(technical_section, risk_section, sentiment_section);
        let (technical, risk, sentiment) = (technical?, risk?, sentiment?);

        // A newer run for this symbol started while we were working: its
        // result supersedes ours
        let current = self.generations.get(&key).map(|entry| *entry).unwrap_or(0);
        if current != generation {
            return Err(AnalysisError::ConcurrencyConflict(format!(
                "analysis for {key} superseded by a newer request"
            )));
        }

        Ok(AnalysisResult {
            symbol: key,
            generated_at: Utc::now(),
            last_price,
            technical,
            risk,
            sentiment,
        })
    }

    async fn fetch_prices(&self, symbol: &str) -> Result<Vec<PricePoint>, AnalysisError> {
        let fut = self
            .provider
            .fetch_price_history(symbol, self.config.price_history_days);
        match timeout(self.config.fetch_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => Err(AnalysisError::DataUnavailable(format!(
                "price history fetch for {symbol} timed out"
            ))),
        }
    }

    async fn fetch_news(
        &self,
        symbol: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<NewsItem>, AnalysisError> {
        let fut = self.provider.fetch_news(symbol, since);
        match timeout(self.config.fetch_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => Err(AnalysisError::DataUnavailable(format!(
                "news fetch for {symbol} timed out"
            ))),
        }
    }

    async fn fetch_benchmark(&self) -> Result<Option<Vec<PricePoint>>, AnalysisError> {
        let symbol = match &self.config.benchmark_symbol {
            Some(symbol) => symbol.clone(),
            None => return Ok(None),
        };
        self.fetch_prices(&symbol).await.map(Some)
    }
}

/// Recoverable errors become a per-section reason; anything else aborts
fn recoverable_or_abort<T>(
    result: Result<T, AnalysisError>,
) -> Result<Result<T, String>, AnalysisError> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(err) if err.is_recoverable() => Ok(Err(err.to_string())),
        Err(err) => Err(err),
    }
}

fn market_snapshot(prices: &[PricePoint]) -> MarketSnapshot {
    if prices.len() < 2 {
        return MarketSnapshot::default();
    }

    let last = &prices[prices.len() - 1];
    let prev = &prices[prices.len() - 2];
    let price_change_percent = if prev.close != 0.0 {
        (last.close - prev.close) / prev.close * 100.0
    } else {
        0.0
    };

    let average_volume = if prices.len() > 1 {
        let sum: f64 = prices[..prices.len() - 1].iter().map(|p| p.volume).sum();
        Some(sum / (prices.len() - 1) as f64)
    } else {
        None
    };

    MarketSnapshot {
        price_change_percent,
        latest_volume: last.volume,
        average_volume,
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;

use analysis_core::{
    AnalysisError, FearGreedBand, MarketSnapshot, Momentum, NewsItem, SentimentClassifier,
    SentimentConfig, SentimentLabel, SentimentTrend, TradingSignal,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Price/volume read of the market, independent of the news flow
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarketSentiment {
    pub momentum: Momentum,
    pub volume_elevated: bool,
    /// 0-100, centered at 50 and pushed by the daily move
    pub score: f64,
}

/// Composite Fear & Greed index with its two inputs, all on a 0-100 scale
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FearGreed {
    pub index: f64,
    pub band: FearGreedBand,
    pub news_component: f64,
    pub market_component: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySentiment {
    pub category: String,
    pub average_score: f64,
    pub article_count: usize,
}

/// Full sentiment read for one subject.
///
/// `insufficient_data` marks the neutral fallback produced when no news was
/// available; the market-derived fields are still populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentAssessment {
    /// Average article score on the 0-1 scale
    pub news_score: f64,
    pub news_label: SentimentLabel,
    pub article_count: usize,
    pub insufficient_data: bool,
    pub trend: SentimentTrend,
    pub market: MarketSentiment,
    pub fear_greed: FearGreed,
    /// Buy in extreme fear, sell in extreme greed, otherwise none
    pub contrarian_signal: Option<TradingSignal>,
    pub categories: Vec<CategorySentiment>,
}

pub struct SentimentEngine {
    config: SentimentConfig,
    classifier: Option<Arc<dyn SentimentClassifier>>,
}

impl SentimentEngine {
    pub fn new(config: SentimentConfig) -> Self {
        Self {
            config,
            classifier: None,
        }
    }

    pub fn with_classifier(
        config: SentimentConfig,
        classifier: Arc<dyn SentimentClassifier>,
    ) -> Self {
        Self {
            config,
            classifier: Some(classifier),
        }
    }

    /// Score the news flow and combine it with the market snapshot.
    ///
    /// Articles without a precomputed label go through the classifier when
    /// one is configured; a classifier failure degrades that article to
    /// neutral instead of failing the whole pass.
    pub async fn analyze(
        &self,
        news: &[NewsItem],
        snapshot: &MarketSnapshot,
    ) -> Result<SentimentAssessment, AnalysisError> {
        let market = self.market_sentiment(snapshot);

        if news.is_empty() {
            let fear_greed = self.fear_greed(0.5, market.score);
            return Ok(SentimentAssessment {
                news_score: 0.5,
                news_label: SentimentLabel::Neutral,
                article_count: 0,
                insufficient_data: true,
                trend: SentimentTrend::Stable,
                market,
                fear_greed,
                contrarian_signal: contrarian_signal(fear_greed.band),
                categories: Vec::new(),
            });
        }

        let mut scored: Vec<(&NewsItem, f64)> = Vec::with_capacity(news.len());
        for item in news {
            scored.push((item, self.article_score(item).await));
        }
        // Chronological order so the trend split compares old against new
        scored.sort_by_key(|(item, _)| item.published_at);

        let news_score =
            scored.iter().map(|(_, score)| score).sum::<f64>() / scored.len() as f64;
        let news_label = SentimentLabel::from_score(news_score);
        let trend = self.trend(&scored);
        let categories = category_breakdown(&scored);

        let fear_greed = self.fear_greed(news_score, market.score);

        Ok(SentimentAssessment {
            news_score,
            news_label,
            article_count: scored.len(),
            insufficient_data: false,
            trend,
            market,
            fear_greed,
            contrarian_signal: contrarian_signal(fear_greed.band),
            categories,
        })
    }

    async fn article_score(&self, item: &NewsItem) -> f64 {
        if let Some(label) = item.sentiment {
            return label.score();
        }

        let classifier = match &self.classifier {
            Some(classifier) => classifier,
            None => return SentimentLabel::Neutral.score(),
        };

        let text = match &item.body {
            Some(body) => format!("{}. {}", item.title, body),
            None => item.title.clone(),
        };
        match classifier.classify(&text).await {
            Ok(label) => label.score(),
            Err(err) => {
                debug!(title = %item.title, %err, "classifier failed, article scored neutral");
                SentimentLabel::Neutral.score()
            }
        }
    }

    fn market_sentiment(&self, snapshot: &MarketSnapshot) -> MarketSentiment {
        let momentum = if snapshot.price_change_percent > self.config.momentum_band_percent {
            Momentum::Positive
        } else if snapshot.price_change_percent < -self.config.momentum_band_percent {
            Momentum::Negative
        } else {
            Momentum::Neutral
        };

        let volume_elevated = snapshot
            .average_volume
            .map(|avg| avg > 0.0 && snapshot.latest_volume / avg > self.config.volume_surprise_ratio)
            .unwrap_or(false);

        let score = (50.0 + snapshot.price_change_percent * 10.0).clamp(0.0, 100.0);

        MarketSentiment {
            momentum,
            volume_elevated,
            score,
        }
    }

    fn fear_greed(&self, news_score: f64, market_score: f64) -> FearGreed {
        let news_component = news_score * 100.0;
        let market_component = market_score;
        let index = (news_component * self.config.news_weight
            + market_component * self.config.market_weight)
            .clamp(0.0, 100.0);

        FearGreed {
            index,
            band: self.band(index),
            news_component,
            market_component,
        }
    }

    fn band(&self, index: f64) -> FearGreedBand {
        let bands = &self.config.bands;
        if index < bands.extreme_fear {
            FearGreedBand::ExtremeFear
        } else if index < bands.fear {
            FearGreedBand::Fear
        } else if index < bands.greed {
            FearGreedBand::Neutral
        } else if index < bands.extreme_greed {
            FearGreedBand::Greed
        } else {
            FearGreedBand::ExtremeGreed
        }
    }

    /// Half-split trend over the chronologically ordered scores with a
    /// hysteresis band to keep small wobbles reading as stable
    fn trend(&self, scored: &[(&NewsItem, f64)]) -> SentimentTrend {
        if scored.len() < 2 {
            return SentimentTrend::Stable;
        }

        let mid = scored.len() / 2;
        let older: f64 =
            scored[..mid].iter().map(|(_, s)| s).sum::<f64>() / mid as f64;
        let newer: f64 = scored[mid..].iter().map(|(_, s)| s).sum::<f64>()
            / (scored.len() - mid) as f64;

        let shift = newer - older;
        if shift > self.config.trend_hysteresis {
            SentimentTrend::Improving
        } else if shift < -self.config.trend_hysteresis {
            SentimentTrend::Deteriorating
        } else {
            SentimentTrend::Stable
        }
    }
}

impl Default for SentimentEngine {
    fn default() -> Self {
        Self::new(SentimentConfig::default())
    }
}

fn contrarian_signal(band: FearGreedBand) -> Option<TradingSignal> {
    match band {
        FearGreedBand::ExtremeFear => Some(TradingSignal::Buy),
        FearGreedBand::ExtremeGreed => Some(TradingSignal::Sell),
        _ => None,
    }
}

fn category_breakdown(scored: &[(&NewsItem, f64)]) -> Vec<CategorySentiment> {
    let mut buckets: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for (item, score) in scored {
        let category = item.category.as_deref().unwrap_or("uncategorized");
        let entry = buckets.entry(category).or_insert((0.0, 0));
        entry.0 += score;
        entry.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(category, (sum, count))| CategorySentiment {
            category: category.to_string(),
            average_score: sum / count as f64,
            article_count: count,
        })
        .collect()
}

#[cfg(test)]
mod tests;

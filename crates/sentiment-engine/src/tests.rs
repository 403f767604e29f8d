use std::sync::Arc;

use analysis_core::{
    AnalysisError, FearGreedBand, MarketSnapshot, Momentum, NewsItem, SentimentClassifier,
    SentimentConfig, SentimentLabel, SentimentTrend, TradingSignal,
};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use crate::SentimentEngine;

fn article(title: &str, hours_ago: i64, sentiment: Option<SentimentLabel>) -> NewsItem {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    NewsItem {
        title: title.to_string(),
        body: None,
        published_at: base - Duration::hours(hours_ago),
        source: Some("wire".to_string()),
        sentiment,
        category: None,
    }
}

fn flat_market() -> MarketSnapshot {
    MarketSnapshot {
        price_change_percent: 0.0,
        latest_volume: 1_000_000.0,
        average_volume: Some(1_000_000.0),
    }
}

struct FixedClassifier(SentimentLabel);

#[async_trait]
impl SentimentClassifier for FixedClassifier {
    async fn classify(&self, _text: &str) -> Result<SentimentLabel, AnalysisError> {
        Ok(self.0)
    }
}

struct FailingClassifier;

#[async_trait]
impl SentimentClassifier for FailingClassifier {
    async fn classify(&self, _text: &str) -> Result<SentimentLabel, AnalysisError> {
        Err(AnalysisError::DataUnavailable("model offline".to_string()))
    }
}

#[tokio::test]
async fn empty_news_falls_back_to_neutral_with_marker() {
    let engine = SentimentEngine::default();
    let assessment = engine.analyze(&[], &flat_market()).await.unwrap();

    assert_eq!(assessment.news_score, 0.5);
    assert_eq!(assessment.news_label, SentimentLabel::Neutral);
    assert!(assessment.insufficient_data);
    assert_eq!(assessment.article_count, 0);
    assert_eq!(assessment.trend, SentimentTrend::Stable);
    // Market-derived fields are still populated
    assert_eq!(assessment.market.score, 50.0);
    assert_eq!(assessment.fear_greed.index, 50.0);
}

#[tokio::test]
async fn labeled_articles_average_into_news_score() {
    let engine = SentimentEngine::default();
    let news = vec![
        article("beats estimates", 3, Some(SentimentLabel::Positive)),
        article("record revenue", 2, Some(SentimentLabel::Positive)),
        article("guidance raised", 1, Some(SentimentLabel::Positive)),
    ];
    let assessment = engine.analyze(&news, &flat_market()).await.unwrap();

    assert!((assessment.news_score - 0.8).abs() < 1e-9);
    assert_eq!(assessment.news_label, SentimentLabel::Positive);
    assert!(!assessment.insufficient_data);
    assert_eq!(assessment.article_count, 3);
}

#[tokio::test]
async fn unlabeled_articles_go_through_classifier() {
    let engine = SentimentEngine::with_classifier(
        SentimentConfig::default(),
        Arc::new(FixedClassifier(SentimentLabel::Negative)),
    );
    let news = vec![article("lawsuit filed", 1, None)];
    let assessment = engine.analyze(&news, &flat_market()).await.unwrap();

    assert!((assessment.news_score - 0.2).abs() < 1e-9);
    assert_eq!(assessment.news_label, SentimentLabel::Negative);
}

#[tokio::test]
async fn classifier_failure_degrades_article_to_neutral() {
    let engine = SentimentEngine::with_classifier(
        SentimentConfig::default(),
        Arc::new(FailingClassifier),
    );
    let news = vec![
        article("unlabeled piece", 2, None),
        article("clearly positive", 1, Some(SentimentLabel::Positive)),
    ];
    let assessment = engine.analyze(&news, &flat_market()).await.unwrap();

    // (0.5 + 0.8) / 2
    assert!((assessment.news_score - 0.65).abs() < 1e-9);
}

#[tokio::test]
async fn without_classifier_unlabeled_articles_read_neutral() {
    let engine = SentimentEngine::default();
    let news = vec![article("something happened", 1, None)];
    let assessment = engine.analyze(&news, &flat_market()).await.unwrap();
    assert_eq!(assessment.news_score, 0.5);
}

#[tokio::test]
async fn trend_compares_older_half_against_newer() {
    let engine = SentimentEngine::default();
    let improving = vec![
        article("miss", 40, Some(SentimentLabel::Negative)),
        article("weak demand", 30, Some(SentimentLabel::Negative)),
        article("turnaround", 20, Some(SentimentLabel::Positive)),
        article("upgrade", 10, Some(SentimentLabel::Positive)),
    ];
    let assessment = engine.analyze(&improving, &flat_market()).await.unwrap();
    assert_eq!(assessment.trend, SentimentTrend::Improving);

    let steady = vec![
        article("neutral note", 40, Some(SentimentLabel::Neutral)),
        article("sideways", 30, Some(SentimentLabel::Neutral)),
        article("unchanged", 20, Some(SentimentLabel::Neutral)),
        article("still flat", 10, Some(SentimentLabel::Neutral)),
    ];
    let assessment = engine.analyze(&steady, &flat_market()).await.unwrap();
    assert_eq!(assessment.trend, SentimentTrend::Stable);
}

#[tokio::test]
async fn fear_greed_blends_news_and_market_components() {
    let engine = SentimentEngine::default();
    let news = vec![
        article("all good", 2, Some(SentimentLabel::Positive)),
        article("more good", 1, Some(SentimentLabel::Positive)),
    ];
    let assessment = engine.analyze(&news, &flat_market()).await.unwrap();

    // news 80 * 0.4 + market 50 * 0.6
    assert!((assessment.fear_greed.index - 62.0).abs() < 1e-9);
    assert_eq!(assessment.fear_greed.band, FearGreedBand::Greed);
    assert!(assessment.contrarian_signal.is_none());
}

#[tokio::test]
async fn extreme_fear_produces_contrarian_buy() {
    let engine = SentimentEngine::default();
    let news = vec![
        article("bankruptcy fears", 2, Some(SentimentLabel::Negative)),
        article("mass layoffs", 1, Some(SentimentLabel::Negative)),
    ];
    let snapshot = MarketSnapshot {
        price_change_percent: -6.0,
        latest_volume: 4_000_000.0,
        average_volume: Some(1_000_000.0),
    };
    let assessment = engine.analyze(&news, &snapshot).await.unwrap();

    // news 20 * 0.4 + market 0 * 0.6 = 8
    assert_eq!(assessment.fear_greed.band, FearGreedBand::ExtremeFear);
    assert_eq!(assessment.contrarian_signal, Some(TradingSignal::Buy));
    assert_eq!(assessment.market.momentum, Momentum::Negative);
    assert!(assessment.market.volume_elevated);
}

#[tokio::test]
async fn categories_average_per_bucket() {
    let engine = SentimentEngine::default();
    let mut earnings_up = article("beats", 3, Some(SentimentLabel::Positive));
    earnings_up.category = Some("earnings".to_string());
    let mut earnings_down = article("misses", 2, Some(SentimentLabel::Negative));
    earnings_down.category = Some("earnings".to_string());
    let untagged = article("ceo interview", 1, Some(SentimentLabel::Neutral));

    let assessment = engine
        .analyze(&[earnings_up, earnings_down, untagged], &flat_market())
        .await
        .unwrap();

    assert_eq!(assessment.categories.len(), 2);
    let earnings = assessment
        .categories
        .iter()
        .find(|c| c.category == "earnings")
        .unwrap();
    assert_eq!(earnings.article_count, 2);
    assert!((earnings.average_score - 0.5).abs() < 1e-9);
    let other = assessment
        .categories
        .iter()
        .find(|c| c.category == "uncategorized")
        .unwrap();
    assert_eq!(other.article_count, 1);
}

use std::sync::Arc;
use std::time::Duration as StdDuration;

use analysis_core::{
    AnalysisConfig, AnalysisError, MarketDataProvider, NewsItem, PricePoint, SentimentLabel,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::AnalysisOrchestrator;

struct MockProvider {
    prices: Vec<PricePoint>,
    news: Vec<NewsItem>,
    fail_prices: bool,
    fail_news: bool,
    price_delay_ms: u64,
}

impl MockProvider {
    fn healthy() -> Self {
        Self {
            prices: sample_prices(60),
            news: sample_news(),
            fail_prices: false,
            fail_news: false,
            price_delay_ms: 0,
        }
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    async fn fetch_price_history(
        &self,
        symbol: &str,
        _days_back: i64,
    ) -> Result<Vec<PricePoint>, AnalysisError> {
        if self.price_delay_ms > 0 {
            tokio::time::sleep(StdDuration::from_millis(self.price_delay_ms)).await;
        }
        if self.fail_prices {
            return Err(AnalysisError::DataUnavailable(format!(
                "no prices for {symbol}"
            )));
        }
        Ok(self.prices.clone())
    }

    async fn fetch_news(
        &self,
        symbol: &str,
        _since: DateTime<Utc>,
    ) -> Result<Vec<NewsItem>, AnalysisError> {
        if self.fail_news {
            return Err(AnalysisError::DataUnavailable(format!(
                "no news for {symbol}"
            )));
        }
        Ok(self.news.clone())
    }
}

fn sample_prices(n: usize) -> Vec<PricePoint> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.7).sin() * 3.0 + i as f64 * 0.1;
            PricePoint {
                date: start + Duration::days(i as i64),
                open: close,
                high: close * 1.01,
                low: close * 0.99,
                close,
                volume: 1_000_000.0,
            }
        })
        .collect()
}

fn sample_news() -> Vec<NewsItem> {
    let base = Utc.with_ymd_and_hms(2024, 2, 28, 12, 0, 0).unwrap();
    vec![
        NewsItem {
            title: "quarter beats expectations".to_string(),
            body: None,
            published_at: base - Duration::hours(5),
            source: Some("wire".to_string()),
            sentiment: Some(SentimentLabel::Positive),
            category: Some("earnings".to_string()),
        },
        NewsItem {
            title: "sector outlook steady".to_string(),
            body: None,
            published_at: base - Duration::hours(2),
            source: Some("wire".to_string()),
            sentiment: Some(SentimentLabel::Neutral),
            category: None,
        },
    ]
}

fn orchestrator(provider: MockProvider) -> AnalysisOrchestrator {
    AnalysisOrchestrator::new(Arc::new(provider), AnalysisConfig::default())
}

#[tokio::test]
async fn healthy_provider_yields_all_sections() {
    let orchestrator = orchestrator(MockProvider::healthy());
    let result = orchestrator.analyze("acme", None, None).await.unwrap();

    assert_eq!(result.symbol, "ACME");
    assert!(result.technical.is_ready());
    assert!(result.risk.is_ready());
    assert!(result.sentiment.is_ready());
    assert!(result.last_price.is_some());

    // Benchmark fetch succeeded, so beta is populated
    let risk = result.risk.as_ready().unwrap();
    assert!(risk.beta.is_some());

    let sentiment = result.sentiment.as_ready().unwrap();
    assert_eq!(sentiment.article_count, 2);
}

#[tokio::test]
async fn news_failure_degrades_only_the_sentiment_section() {
    let mut provider = MockProvider::healthy();
    provider.fail_news = true;
    let orchestrator = orchestrator(provider);

    let result = orchestrator.analyze("ACME", None, None).await.unwrap();
    assert!(result.technical.is_ready());
    assert!(result.risk.is_ready());
    assert!(!result.sentiment.is_ready());
    assert!(result.sentiment.reason().unwrap().contains("no news"));
}

#[tokio::test]
async fn price_failure_degrades_price_sections_but_sentiment_survives() {
    let mut provider = MockProvider::healthy();
    provider.fail_prices = true;
    let orchestrator = orchestrator(provider);

    let result = orchestrator.analyze("ACME", None, None).await.unwrap();
    assert!(!result.technical.is_ready());
    assert!(!result.risk.is_ready());
    assert!(result.last_price.is_none());
    // Sentiment falls back to a neutral market snapshot
    assert!(result.sentiment.is_ready());
}

#[tokio::test]
async fn too_short_history_reads_as_unavailable_sections() {
    let mut provider = MockProvider::healthy();
    provider.prices = sample_prices(1);
    let orchestrator = orchestrator(provider);

    let result = orchestrator.analyze("ACME", None, None).await.unwrap();
    assert!(!result.technical.is_ready());
    assert!(!result.risk.is_ready());
    assert!(result
        .technical
        .reason()
        .unwrap()
        .contains("Insufficient history"));
}

#[tokio::test(start_paused = true)]
async fn slow_provider_times_out_into_section_reasons() {
    let mut provider = MockProvider::healthy();
    provider.price_delay_ms = 30_000;
    let orchestrator = orchestrator(provider);

    let result = orchestrator.analyze("ACME", None, None).await.unwrap();
    assert!(!result.technical.is_ready());
    assert!(result.technical.reason().unwrap().contains("timed out"));
    assert!(!result.risk.is_ready());
    assert!(result.sentiment.is_ready());
}

#[tokio::test(start_paused = true)]
async fn superseded_run_fails_with_conflict() {
    let mut provider = MockProvider::healthy();
    provider.price_delay_ms = 200;
    let orchestrator = Arc::new(orchestrator(provider));

    let first = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.analyze("ACME", None, None).await })
    };

    // Let the first run get past its generation bump before starting ours
    tokio::time::sleep(StdDuration::from_millis(50)).await;
    let second = orchestrator.analyze("ACME", None, None).await;
    assert!(second.is_ok());

    let first = first.await.unwrap();
    assert!(matches!(
        first,
        Err(AnalysisError::ConcurrencyConflict(_))
    ));
}

#[tokio::test]
async fn position_value_flows_into_var_amount() {
    let orchestrator = orchestrator(MockProvider::healthy());
    let result = orchestrator
        .analyze("ACME", None, Some(25_000.0))
        .await
        .unwrap();
    let risk = result.risk.as_ready().unwrap();
    assert!(risk.var_amount.is_some());
}

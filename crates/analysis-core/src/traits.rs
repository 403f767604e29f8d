use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{AnalysisError, NewsItem, PricePoint, SentimentLabel};

/// Ingestion collaborator for price and news history.
///
/// Implementations must fail with `DataUnavailable` when the provider has
/// nothing for the requested range, never with an empty success.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_price_history(
        &self,
        symbol: &str,
        days_back: i64,
    ) -> Result<Vec<PricePoint>, AnalysisError>;

    async fn fetch_news(
        &self,
        symbol: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<NewsItem>, AnalysisError>;
}

/// Optional external classifier for articles that arrive without a label
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<SentimentLabel, AnalysisError>;
}

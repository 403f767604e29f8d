pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{
    AlertConfig, AnalysisConfig, RiskConfig, RiskWeights, SentimentBands, SentimentConfig,
    TechnicalConfig,
};
pub use error::AnalysisError;
pub use traits::{MarketDataProvider, SentimentClassifier};
pub use types::{
    FearGreedBand, MarketSnapshot, Momentum, NewsItem, PricePoint, RiskLevel, Section,
    SentimentLabel, SentimentTrend, TrackedSubject, TradingSignal, TrendDirection, TrendStrength,
    ValuationFlag, ValuationInputs, VolatilityBucket,
};

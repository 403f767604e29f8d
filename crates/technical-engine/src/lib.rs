pub mod analyzer;
pub mod indicators;


pub use analyzer::{MacdSnapshot, SkippedIndicator, TechnicalAssessment, TechnicalEngine};
pub use indicators::{ema, macd, rsi, sma, MacdSeries};

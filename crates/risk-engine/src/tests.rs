use analysis_core::{AnalysisError, PricePoint, RiskConfig, RiskLevel};
use chrono::{Duration, TimeZone, Utc};

use crate::RiskEngine;

fn price_series(closes: &[f64]) -> Vec<PricePoint> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint {
            date: start + Duration::days(i as i64),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 1_000_000.0,
        })
        .collect()
}

fn choppy_series(n: usize) -> Vec<PricePoint> {
    let closes: Vec<f64> = (0..n)
        .map(|i| 100.0 + (i as f64 * 0.8).sin() * 4.0)
        .collect();
    price_series(&closes)
}

#[test]
fn rejects_short_history() {
    let engine = RiskEngine::default();
    let prices = price_series(&[100.0, 101.0, 102.0]);
    let err = engine.assess(&prices, None, None).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::InsufficientHistory {
            required: 10,
            actual: 3
        }
    ));
}

#[test]
fn annualized_volatility_scales_daily_by_sqrt_trading_days() {
    let engine = RiskEngine::default();
    let assessment = engine.assess(&choppy_series(60), None, None).unwrap();

    let expected = assessment.daily_volatility * 252.0f64.sqrt();
    assert!((assessment.annualized_volatility - expected).abs() < 1e-9);
    assert!(assessment.daily_volatility > 0.0);
}

#[test]
fn drawdown_is_zero_for_monotonic_rise_and_bounded_otherwise() {
    let engine = RiskEngine::default();

    let rising: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
    let assessment = engine.assess(&price_series(&rising), None, None).unwrap();
    assert_eq!(assessment.max_drawdown, 0.0);

    let crash: Vec<f64> = (0..20)
        .map(|i| if i < 10 { 100.0 + i as f64 } else { 60.0 })
        .collect();
    let assessment = engine.assess(&price_series(&crash), None, None).unwrap();
    assert!(assessment.max_drawdown < -30.0);
    assert!(assessment.max_drawdown >= -100.0);
}

#[test]
fn zero_volatility_yields_no_sharpe() {
    let engine = RiskEngine::default();
    let assessment = engine
        .assess(&price_series(&[100.0; 30]), None, None)
        .unwrap();

    assert_eq!(assessment.daily_volatility, 0.0);
    assert!(assessment.sharpe_ratio.is_none());
    assert_eq!(assessment.risk_level, RiskLevel::Low);
}

#[test]
fn beta_requires_a_varying_benchmark() {
    let engine = RiskEngine::default();
    let prices = choppy_series(60);

    // No benchmark at all
    let assessment = engine.assess(&prices, None, None).unwrap();
    assert!(assessment.beta.is_none());

    // Flat benchmark has zero variance
    let flat = price_series(&[400.0; 60]);
    let assessment = engine.assess(&prices, Some(&flat), None).unwrap();
    assert!(assessment.beta.is_none());

    // A benchmark identical to the asset gives beta 1
    let assessment = engine.assess(&prices, Some(&prices), None).unwrap();
    let beta = assessment.beta.unwrap();
    assert!((beta - 1.0).abs() < 1e-9);
}

#[test]
fn var_amount_scales_to_position_value() {
    let engine = RiskEngine::default();
    let assessment = engine
        .assess(&choppy_series(60), None, Some(10_000.0))
        .unwrap();

    let expected = 10_000.0 * assessment.var_95 / 100.0;
    let amount = assessment.var_amount.unwrap();
    assert!((amount - expected).abs() < 1e-9);
    assert!(assessment.var_95 >= 0.0);
}

#[test]
fn var_is_zero_when_history_has_no_losses() {
    let engine = RiskEngine::default();
    let rising: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
    let assessment = engine.assess(&price_series(&rising), None, None).unwrap();
    assert_eq!(assessment.var_95, 0.0);
}

#[test]
fn recommendations_are_never_empty() {
    let engine = RiskEngine::default();

    let calm = engine
        .assess(&price_series(&[100.0; 30]), None, None)
        .unwrap();
    assert!(!calm.recommendations.is_empty());

    let wild_closes: Vec<f64> = (0..60)
        .map(|i| 100.0 + (i as f64 * 1.3).sin() * 20.0)
        .collect();
    let wild = engine
        .assess(&price_series(&wild_closes), None, None)
        .unwrap();
    assert!(!wild.recommendations.is_empty());
    assert!(wild.annualized_volatility > calm.annualized_volatility);
}

#[test]
fn score_weight_redistributes_without_beta() {
    // With beta absent the two remaining components are renormalized, so a
    // high-volatility series still lands in an elevated band
    let config = RiskConfig::default();
    let engine = RiskEngine::new(config);

    let wild_closes: Vec<f64> = (0..80)
        .map(|i| 100.0 + (i as f64 * 1.1).sin() * 25.0)
        .collect();
    let assessment = engine
        .assess(&price_series(&wild_closes), None, None)
        .unwrap();

    assert!(assessment.beta.is_none());
    assert!(assessment.risk_score > 25.0);
    assert!(assessment.risk_level >= RiskLevel::Medium);
}

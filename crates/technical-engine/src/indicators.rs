use analysis_core::AnalysisError;

fn check_window(data: &[f64], required: usize) -> Result<(), AnalysisError> {
    if data.len() < required {
        return Err(AnalysisError::InsufficientHistory {
            required,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Simple Moving Average
pub fn sma(data: &[f64], period: usize) -> Result<Vec<f64>, AnalysisError> {
    if period == 0 {
        return Err(AnalysisError::Computation("SMA period must be > 0".to_string()));
    }
    check_window(data, period)?;

    let mut result = Vec::with_capacity(data.len() - period + 1);
    for i in period - 1..data.len() {
        let sum: f64 = data[i + 1 - period..=i].iter().sum();
        result.push(sum / period as f64);
    }
    Ok(result)
}

/// Exponential Moving Average, seeded with the SMA of the first `period` points
pub fn ema(data: &[f64], period: usize) -> Result<Vec<f64>, AnalysisError> {
    if period == 0 {
        return Err(AnalysisError::Computation("EMA period must be > 0".to_string()));
    }
    check_window(data, period)?;

    let multiplier = 2.0 / (period as f64 + 1.0);
    let seed: f64 = data[..period].iter().sum::<f64>() / period as f64;

    let mut result = Vec::with_capacity(data.len() - period + 1);
    result.push(seed);

    for &value in &data[period..] {
        let prev = result[result.len() - 1];
        result.push((value - prev) * multiplier + prev);
    }

    Ok(result)
}

/// Relative Strength Index with Wilder smoothing.
///
/// When the average loss over a window is zero the RSI is pinned at 100
/// rather than dividing by zero.
pub fn rsi(data: &[f64], period: usize) -> Result<Vec<f64>, AnalysisError> {
    if period == 0 {
        return Err(AnalysisError::Computation("RSI period must be > 0".to_string()));
    }
    check_window(data, period + 1)?;

    let mut gains = Vec::with_capacity(data.len() - 1);
    let mut losses = Vec::with_capacity(data.len() - 1);

    for i in 1..data.len() {
        let change = data[i] - data[i - 1];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;

    let mut rsi_values = Vec::with_capacity(data.len() - period);
    rsi_values.push(point_rsi(avg_gain, avg_loss));

    for i in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
        rsi_values.push(point_rsi(avg_gain, avg_loss));
    }

    Ok(rsi_values)
}

fn point_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// MACD line, signal line (EMA of the MACD line) and histogram
#[derive(Debug, Clone)]
pub struct MacdSeries {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(
    data: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> Result<MacdSeries, AnalysisError> {
    if fast_period == 0 || signal_period == 0 || slow_period <= fast_period {
        return Err(AnalysisError::Computation(
            "MACD periods must satisfy 0 < fast < slow, signal > 0".to_string(),
        ));
    }
    // The signal line needs `signal_period` MACD points to seed its EMA
    check_window(data, slow_period + signal_period - 1)?;

    let ema_fast = ema(data, fast_period)?;
    let ema_slow = ema(data, slow_period)?;

    let offset = slow_period - fast_period;
    let mut macd_line = Vec::with_capacity(ema_slow.len());
    for i in 0..ema_slow.len() {
        macd_line.push(ema_fast[i + offset] - ema_slow[i]);
    }

    let signal_line = ema(&macd_line, signal_period)?;

    let hist_offset = macd_line.len() - signal_line.len();
    let mut histogram = Vec::with_capacity(signal_line.len());
    for (i, signal) in signal_line.iter().enumerate() {
        histogram.push(macd_line[i + hist_offset] - signal);
    }

    Ok(MacdSeries {
        macd_line,
        signal_line,
        histogram,
    })
}

/// Sample standard deviation of day-over-day simple returns
pub fn return_dispersion(data: &[f64]) -> Result<f64, AnalysisError> {
    check_window(data, 2)?;

    let mut returns = Vec::with_capacity(data.len() - 1);
    for i in 1..data.len() {
        if data[i - 1] == 0.0 {
            return Err(AnalysisError::Computation(
                "zero price in return series".to_string(),
            ));
        }
        returns.push(data[i] / data[i - 1] - 1.0);
    }

    if returns.len() < 2 {
        return Ok(0.0);
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns
        .iter()
        .map(|r| (r - mean).powi(2))
        .sum::<f64>()
        / (returns.len() - 1) as f64;
    Ok(variance.sqrt())
}

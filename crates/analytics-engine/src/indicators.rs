/// Replaces non-finite results with a fallback, the way the source
/// guards every ratio-based indicator against division by zero.
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

pub fn sma(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn stddev(values: &[f64]) -> Option<f64> {
    let mean = sma(values)?;
    if values.is_empty() {
        return None;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Simple day-over-day returns: `(v[i] - v[i-1]) / v[i-1]`.
pub fn simple_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) / pair[0])
        .collect()
}

/// RSI using the simple-average variant on the most recent `window` diffs:
/// `gain = max(0, delta)`, `loss = max(0, -delta)`, `RS = avg_gain/avg_loss`.
/// Returns `None` when fewer than `window` prior closes are available.
/// `closes` must include the anchor day as the last element and at least
/// `window + 1` entries total.
pub fn rsi(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window + 1 {
        return None;
    }
    let tail = &closes[closes.len() - window - 1..];
    let diffs: Vec<f64> = tail.windows(2).map(|p| p[1] - p[0]).collect();
    let avg_gain = diffs.iter().map(|d| d.max(0.0)).sum::<f64>() / window as f64;
    let avg_loss = diffs.iter().map(|d| (-d).max(0.0)).sum::<f64>() / window as f64;
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(finite_or(100.0 - 100.0 / (1.0 + rs), 50.0))
}

pub struct BollingerBands {
    pub middle: f64,
    pub upper: f64,
    pub lower: f64,
}

/// 20-day (or `window`-day) simple moving average ± `k` standard
/// deviations. `closes` must include the anchor day as the last element.
pub fn bollinger_bands(closes: &[f64], window: usize, k: f64) -> Option<BollingerBands> {
    if window == 0 || closes.len() < window {
        return None;
    }
    let tail = &closes[closes.len() - window..];
    let middle = sma(tail)?;
    let sigma = stddev(tail)?;
    Some(BollingerBands {
        middle,
        upper: middle + k * sigma,
        lower: middle - k * sigma,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_is_exactly_100_when_no_losses() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi(&closes, 14), Some(100.0));
    }

    #[test]
    fn rsi_none_when_insufficient_history() {
        let closes = vec![100.0, 101.0];
        assert_eq!(rsi(&closes, 14), None);
    }

    #[test]
    fn bollinger_bands_centered_on_mean() {
        let closes = vec![10.0; 20];
        let bands = bollinger_bands(&closes, 20, 2.0).unwrap();
        assert_eq!(bands.middle, 10.0);
        assert_eq!(bands.upper, 10.0);
        assert_eq!(bands.lower, 10.0);
    }
}

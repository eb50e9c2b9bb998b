use crate::analysis::round2;
use crate::domain::{MomentumFeatures, PriceSeries};

pub const MAX_RETURNS: usize = 5;
pub const SMA_WINDOW: usize = 20;

/// Momentum features over a most-recent-first series. Short series degrade to
/// fewer returns and a zero score rather than failing.
pub fn compute_momentum(series: &PriceSeries) -> MomentumFeatures {
    let closes: Vec<f64> = series.closes().collect();

    let returns: Vec<f64> = closes
        .windows(2)
        .take(MAX_RETURNS)
        .map(|w| round2((w[0] - w[1]) / w[1] * 100.0))
        .collect();

    let simple_score = if returns.is_empty() {
        0.0
    } else {
        round2(returns.iter().sum())
    };

    MomentumFeatures {
        returns,
        simple_score,
        advanced_score: advanced_score(&closes),
    }
}

fn advanced_score(closes: &[f64]) -> f64 {
    let Some(&last_close) = closes.first() else {
        return 0.0;
    };

    let window = &closes[..closes.len().min(SMA_WINDOW)];
    let sma = window.iter().sum::<f64>() / window.len() as f64;
    if !sma.is_finite() || sma <= 0.0 {
        return 0.0;
    }

    round2((last_close / sma - 1.0) * 100.0)
}

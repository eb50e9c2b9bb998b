use crate::error::PulseError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily closes, most recent first. Never empty; every close is positive and
/// finite; dates are strictly decreasing.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Sorts the points most-recent-first and validates them. An empty series is
    /// a precondition violation for everything downstream.
    pub fn new(mut points: Vec<PricePoint>) -> Result<Self, PulseError> {
        if points.is_empty() {
            return Err(PulseError::InvalidInput(
                "price series must contain at least one close".to_string(),
            ));
        }

        points.sort_by(|a, b| b.date.cmp(&a.date));

        for pair in points.windows(2) {
            if pair[0].date == pair[1].date {
                return Err(PulseError::Upstream(anyhow::anyhow!(
                    "duplicate price date {}",
                    pair[0].date
                )));
            }
        }

        if let Some(bad) = points
            .iter()
            .find(|p| !(p.close.is_finite() && p.close > 0.0))
        {
            return Err(PulseError::Upstream(anyhow::anyhow!(
                "non-positive close {} on {}",
                bad.close,
                bad.date
            )));
        }

        Ok(Self { points })
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.close)
    }

    pub fn latest(&self) -> &PricePoint {
        &self.points[0]
    }
}

use crate::domain::ticker::Ticker;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pulse {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl Pulse {
    /// Case-insensitive; anything outside the three verdicts is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bullish" => Some(Pulse::Bullish),
            "bearish" => Some(Pulse::Bearish),
            "neutral" => Some(Pulse::Neutral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Pulse::Bullish => "bullish",
            Pulse::Bearish => "bearish",
            Pulse::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseVerdict {
    pub pulse: Pulse,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumFeatures {
    /// Percentage daily returns, most recent first, at most five.
    pub returns: Vec<f64>,
    pub simple_score: f64,
    /// Percent deviation of the latest close from the trailing SMA.
    pub advanced_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub description: String,
    pub url: String,
    pub sentiment: f64,
}

/// The cached and returned artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPulseResult {
    pub ticker: Ticker,
    #[serde(rename = "as_of")]
    pub as_of_date: NaiveDate,
    pub momentum: MomentumFeatures,
    pub news: Vec<NewsItem>,
    pub pulse: Pulse,
    #[serde(rename = "llm_explanation")]
    pub explanation: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pulse_parse_normalizes_case() {
        assert_eq!(Pulse::parse("BULLISH"), Some(Pulse::Bullish));
        assert_eq!(Pulse::parse(" Bearish "), Some(Pulse::Bearish));
        assert_eq!(Pulse::parse("sideways"), None);
    }

    #[test]
    fn result_serializes_with_wire_names() {
        let result = MarketPulseResult {
            ticker: Ticker::parse("msft").unwrap(),
            as_of_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            momentum: MomentumFeatures {
                returns: vec![1.0, -0.5],
                simple_score: 0.5,
                advanced_score: 2.25,
            },
            news: vec![],
            pulse: Pulse::Bullish,
            explanation: "Strong close.".to_string(),
        };

        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(
            v,
            json!({
                "ticker": "MSFT",
                "as_of": "2026-10-19",
                "momentum": {"returns": [1.0, -0.5], "simple_score": 0.5, "advanced_score": 2.25},
                "news": [],
                "pulse": "bullish",
                "llm_explanation": "Strong close.",
            })
        );
    }
}

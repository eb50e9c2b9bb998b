use crate::error::PulseError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_TICKER_LEN: usize = 10;

/// Uppercased instrument symbol. This is the cache key and the `ticker` field
/// of the returned artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(raw: &str) -> Result<Self, PulseError> {
        let len = raw.chars().count();
        if !(1..=MAX_TICKER_LEN).contains(&len) {
            return Err(PulseError::InvalidInput(format!(
                "ticker must be 1..={MAX_TICKER_LEN} characters (got {len})"
            )));
        }

        // Exchange suffixes and index symbols use '.', '-', '^' and '='.
        if let Some(c) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')))
        {
            return Err(PulseError::InvalidInput(format!(
                "ticker contains unsupported character {c:?}"
            )));
        }

        Ok(Self(raw.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Ticker {
    type Error = PulseError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<Ticker> for String {
    fn from(ticker: Ticker) -> Self {
        ticker.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

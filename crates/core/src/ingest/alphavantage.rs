use crate::config::Settings;
use crate::domain::{PricePoint, PriceSeries, Ticker};
use crate::error::{classify_reqwest, PulseError};
use crate::ingest::provider::{retry_transient, PriceProvider};
use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";
const SERIES_KEY: &str = "Time Series (Daily)";

#[derive(Debug, Clone)]
pub struct AlphaVantagePriceProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    retries: u32,
}

impl AlphaVantagePriceProvider {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_stock_api_key()?.to_string();
        let base_url =
            std::env::var("STOCK_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(
            api_key,
            base_url,
            settings.stock_api_timeout,
            settings.price_provider_retries,
        )
    }

    pub fn new(
        api_key: String,
        base_url: String,
        timeout: Duration,
        retries: u32,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build price provider http client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            retries,
        })
    }

    async fn fetch_once(&self, ticker: &Ticker) -> Result<PriceSeries, PulseError> {
        let url = format!("{}/query", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .get(url)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", ticker.as_str()),
                ("apikey", self.api_key.as_str()),
                ("outputsize", "compact"),
            ])
            .send()
            .await
            .map_err(|e| classify_reqwest(e, "price provider request failed"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| classify_reqwest(e, "failed to read price provider response"))?;

        if !status.is_success() {
            return Err(PulseError::Upstream(anyhow::anyhow!(
                "price provider HTTP {status}: {text}"
            )));
        }

        let raw = serde_json::from_str::<Value>(&text)
            .with_context(|| format!("price provider response is not valid JSON: {text}"))
            .map_err(PulseError::Upstream)?;

        parse_daily_series(ticker, raw)
    }
}

#[async_trait::async_trait]
impl PriceProvider for AlphaVantagePriceProvider {
    fn provider_name(&self) -> &'static str {
        "alphavantage"
    }

    async fn fetch_daily_closes(&self, ticker: &Ticker) -> Result<PriceSeries, PulseError> {
        retry_transient(self.retries, "price", || self.fetch_once(ticker)).await
    }
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "4. close")]
    close: String,
}

/// Absence of the daily series key is how the provider says "unknown symbol"
/// (it also answers rate-limit and bad-key requests that way).
pub fn parse_daily_series(ticker: &Ticker, mut raw: Value) -> Result<PriceSeries, PulseError> {
    let Some(series) = raw.get_mut(SERIES_KEY).map(Value::take) else {
        let note = ["Error Message", "Note", "Information"]
            .iter()
            .find_map(|k| raw.get(*k).and_then(Value::as_str));
        tracing::info!(%ticker, note, "price provider returned no daily series");
        return Err(PulseError::NotFound(ticker.to_string()));
    };

    let bars = serde_json::from_value::<BTreeMap<String, DailyBar>>(series)
        .context("failed to decode daily series")
        .map_err(PulseError::Upstream)?;

    let mut points = Vec::with_capacity(bars.len());
    for (date, bar) in bars {
        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .with_context(|| format!("invalid series date: {date}"))
            .map_err(PulseError::Upstream)?;
        let close = bar
            .close
            .trim()
            .parse::<f64>()
            .with_context(|| format!("invalid close on {date}: {}", bar.close))
            .map_err(PulseError::Upstream)?;
        points.push(PricePoint { date, close });
    }

    if points.is_empty() {
        return Err(PulseError::Upstream(anyhow::anyhow!(
            "daily series for {ticker} is empty"
        )));
    }

    PriceSeries::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn aapl() -> Ticker {
        Ticker::parse("AAPL").unwrap()
    }

    #[test]
    fn parses_closes_most_recent_first() {
        let raw = json!({
            "Meta Data": {"2. Symbol": "AAPL"},
            "Time Series (Daily)": {
                "2026-10-14": {"1. open": "150.0", "4. close": "148.0000"},
                "2026-10-16": {"1. open": "149.0", "4. close": "150.0000"},
                "2026-10-15": {"1. open": "151.0", "4. close": "152.5000"},
            }
        });
        let series = parse_daily_series(&aapl(), raw).unwrap();
        let closes: Vec<f64> = series.closes().collect();
        assert_eq!(closes, vec![150.0, 152.5, 148.0]);
        assert_eq!(
            series.latest().date,
            NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
        );
    }

    #[test]
    fn missing_series_key_is_not_found() {
        let raw = json!({"Error Message": "Invalid API call."});
        assert!(matches!(
            parse_daily_series(&aapl(), raw),
            Err(PulseError::NotFound(t)) if t == "AAPL"
        ));
    }

    #[test]
    fn malformed_close_is_upstream_error() {
        let raw = json!({"Time Series (Daily)": {"2026-10-16": {"4. close": "n/a"}}});
        assert!(matches!(
            parse_daily_series(&aapl(), raw),
            Err(PulseError::Upstream(_))
        ));

        let raw = json!({"Time Series (Daily)": {"2026-10-16": {"1. open": "1.0"}}});
        assert!(matches!(
            parse_daily_series(&aapl(), raw),
            Err(PulseError::Upstream(_))
        ));
    }

    #[test]
    fn empty_series_is_upstream_error() {
        let raw = json!({"Time Series (Daily)": {}});
        assert!(matches!(
            parse_daily_series(&aapl(), raw),
            Err(PulseError::Upstream(_))
        ));
    }

    /// Serves a 200 that promises 500 body bytes, sends a few, then hangs up.
    fn truncating_server() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut req = Vec::new();
                let mut buf = [0u8; 1024];
                while !req.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => req.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = stream.write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 500\r\n\r\n{\"Meta Da",
                );
                let _ = stream.flush();
            }
        });
        (format!("http://{addr}"), accepted)
    }

    #[tokio::test]
    async fn truncated_body_is_unavailable_and_retried() {
        let (base_url, accepted) = truncating_server();
        let provider = AlphaVantagePriceProvider::new(
            "demo".to_string(),
            base_url,
            Duration::from_secs(5),
            2,
        )
        .unwrap();

        let err = provider.fetch_daily_closes(&aapl()).await.unwrap_err();
        assert!(matches!(err, PulseError::Unavailable(_)), "{err}");
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
        assert!(!err.to_string().contains("demo"));
    }
}

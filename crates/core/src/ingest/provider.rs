use crate::domain::{PriceSeries, Ticker};
use crate::error::PulseError;
use crate::ingest::types::Article;
use std::future::Future;
use std::time::Duration;

/// Daily close history. Hard dependency: every failure aborts the request.
#[async_trait::async_trait]
pub trait PriceProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_daily_closes(&self, ticker: &Ticker) -> Result<PriceSeries, PulseError>;
}

/// Recent articles mentioning the ticker. Soft dependency: callers treat any
/// error as "no articles".
#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_articles(&self, ticker: &Ticker) -> anyhow::Result<Vec<Article>>;
}

/// Runs `op` up to `attempts` times, backing off 1s, 2s, 4s... between tries.
/// Only transient failures are retried.
pub async fn retry_transient<T, F, Fut>(
    attempts: u32,
    what: &'static str,
    mut op: F,
) -> Result<T, PulseError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PulseError>>,
{
    let attempts = attempts.max(1);
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(err) if err.is_transient() && attempt < attempts => {
                let backoff = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::warn!(attempt, ?backoff, what, error = %err, "transient upstream failure; retrying");
                tokio::time::sleep(backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}

use crate::analysis::momentum::compute_momentum;
use crate::analysis::ranking::score_and_rank;
use crate::analysis::sentiment::SentimentScorer;
use crate::cache::ResultCache;
use crate::config::Settings;
use crate::domain::{MarketPulseResult, Ticker};
use crate::error::PulseError;
use crate::ingest::alphavantage::AlphaVantagePriceProvider;
use crate::ingest::newsapi::NewsApiProvider;
use crate::ingest::types::Article;
use crate::ingest::{NewsProvider, PriceProvider};
use crate::llm::json::interpret_generation;
use crate::llm::prompt::build_prompt;
use crate::llm::{self, LlmClient};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

pub type PulseCache = ResultCache<MarketPulseResult>;

type Gate = Arc<tokio::sync::Mutex<()>>;

/// Builds market pulse artifacts: cache lookup, then price and news fetched
/// concurrently, momentum and ranking, one generation call, cache store.
///
/// Only a price failure escapes as an error. News and generation failures
/// degrade the payload. Concurrent misses for one ticker run the pipeline once.
pub struct PulseService {
    prices: Arc<dyn PriceProvider>,
    news: Arc<dyn NewsProvider>,
    llm: Arc<dyn LlmClient>,
    cache: Arc<PulseCache>,
    scorer: SentimentScorer,
    inflight: Mutex<HashMap<Ticker, Gate>>,
}

impl PulseService {
    pub fn new(
        prices: Arc<dyn PriceProvider>,
        news: Arc<dyn NewsProvider>,
        llm: Arc<dyn LlmClient>,
        cache: Arc<PulseCache>,
    ) -> Self {
        Self {
            prices,
            news,
            llm,
            cache,
            scorer: SentimentScorer::new(),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Builds every upstream client up front so a missing credential fails
    /// startup rather than a request.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let prices = Arc::new(AlphaVantagePriceProvider::from_settings(settings)?);
        let news = Arc::new(NewsApiProvider::from_settings(settings)?);
        let llm = llm::client_from_settings(settings)?;
        let cache = Arc::new(ResultCache::new(settings.cache_ttl, settings.cache_capacity));

        tracing::info!(
            price_provider = prices.provider_name(),
            news_provider = news.provider_name(),
            llm_provider = ?llm.provider(),
            cache_ttl_secs = settings.cache_ttl.as_secs(),
            cache_capacity = settings.cache_capacity,
            "pulse service configured"
        );

        Ok(Self::new(prices, news, llm, cache))
    }

    pub fn cache(&self) -> &Arc<PulseCache> {
        &self.cache
    }

    pub async fn market_pulse(&self, raw_ticker: &str) -> Result<MarketPulseResult, PulseError> {
        let ticker = Ticker::parse(raw_ticker)?;

        if let Some(hit) = self.cache.get(ticker.as_str()) {
            tracing::debug!(%ticker, "market pulse cache hit");
            return Ok(hit);
        }

        let inflight = self.enter(&ticker);
        let _permit = inflight.gate.lock().await;

        // Another request may have filled the cache while this one waited.
        if let Some(hit) = self.cache.get(ticker.as_str()) {
            tracing::debug!(%ticker, "market pulse filled by concurrent request");
            return Ok(hit);
        }

        let result = self.compute(&ticker).await?;
        self.cache.put(ticker.as_str(), result.clone());
        Ok(result)
    }

    async fn compute(&self, ticker: &Ticker) -> Result<MarketPulseResult, PulseError> {
        let started = Instant::now();

        // A price failure drops the news future mid-flight.
        let (series, articles) = tokio::try_join!(
            self.prices.fetch_daily_closes(ticker),
            async { Ok::<_, PulseError>(self.fetch_news(ticker).await) },
        )
        .map_err(|err| {
            tracing::warn!(%ticker, kind = err.kind(), error = %err, "price fetch failed");
            err
        })?;

        let momentum = compute_momentum(&series);
        let news = score_and_rank(&self.scorer, &articles);
        let prompt = build_prompt(ticker, &momentum, &news);
        let verdict = interpret_generation(self.llm.generate_text(&prompt).await);

        tracing::info!(
            %ticker,
            closes = series.closes().count(),
            articles = articles.len(),
            ranked_news = news.len(),
            simple_score = momentum.simple_score,
            advanced_score = momentum.advanced_score,
            pulse = verdict.pulse.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "market pulse computed"
        );

        Ok(MarketPulseResult {
            ticker: ticker.clone(),
            as_of_date: chrono::Utc::now().date_naive(),
            momentum,
            news,
            pulse: verdict.pulse,
            explanation: verdict.explanation,
        })
    }

    async fn fetch_news(&self, ticker: &Ticker) -> Vec<Article> {
        match self.news.fetch_articles(ticker).await {
            Ok(articles) => articles,
            Err(err) => {
                tracing::warn!(
                    %ticker,
                    provider = self.news.provider_name(),
                    error = %format!("{err:#}"),
                    "could not fetch news; continuing without headlines"
                );
                Vec::new()
            }
        }
    }

    fn enter(&self, ticker: &Ticker) -> Inflight<'_> {
        let mut map = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        let gate = map.entry(ticker.clone()).or_default().clone();
        Inflight {
            service: self,
            ticker: ticker.clone(),
            gate,
        }
    }
}

/// Holds one ticker's single-flight gate. The map entry is removed by the last
/// holder, including when the request future is dropped mid-pipeline.
struct Inflight<'a> {
    service: &'a PulseService,
    ticker: Ticker,
    gate: Gate,
}

impl Drop for Inflight<'_> {
    fn drop(&mut self) {
        let mut map = self
            .service
            .inflight
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        // One reference in the map, one here.
        if Arc::strong_count(&self.gate) <= 2 {
            map.remove(&self.ticker);
        }
    }
}

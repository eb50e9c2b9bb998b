use crate::config::Settings;
use crate::domain::Ticker;
use crate::ingest::provider::NewsProvider;
use crate::ingest::types::Article;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://newsapi.org";
const PAGE_SIZE: usize = 20;
const USER_AGENT: &str = concat!("marketpulse/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct NewsApiProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl NewsApiProvider {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_news_api_key()?.to_string();
        let base_url =
            std::env::var("NEWS_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let http = reqwest::Client::builder()
            .timeout(settings.news_api_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build news provider http client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
        })
    }

    fn headers(&self) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl NewsProvider for NewsApiProvider {
    fn provider_name(&self) -> &'static str {
        "newsapi"
    }

    async fn fetch_articles(&self, ticker: &Ticker) -> anyhow::Result<Vec<Article>> {
        let url = format!("{}/v2/everything", self.base_url.trim_end_matches('/'));
        let page_size = PAGE_SIZE.to_string();
        let res = self
            .http
            .get(url)
            .headers(self.headers()?)
            .query(&[
                ("q", ticker.as_str()),
                ("pageSize", page_size.as_str()),
                ("sortBy", "publishedAt"),
            ])
            .send()
            .await
            .context("news provider request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read news provider response")?;
        if !status.is_success() {
            anyhow::bail!("news provider HTTP {status}: {text}");
        }

        parse_articles(&text)
    }
}

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<WireArticle>,
}

#[derive(Debug, Deserialize)]
struct WireArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

pub fn parse_articles(text: &str) -> anyhow::Result<Vec<Article>> {
    let parsed = serde_json::from_str::<EverythingResponse>(text)
        .with_context(|| format!("news provider response is not valid JSON: {text}"))?;

    if parsed.status.as_deref() == Some("error") {
        anyhow::bail!(
            "news provider error: {}",
            parsed.message.unwrap_or_default()
        );
    }

    Ok(parsed
        .articles
        .into_iter()
        .take(PAGE_SIZE)
        .map(|a| Article {
            title: a.title.unwrap_or_default(),
            description: a.description.unwrap_or_default(),
            url: a.url.unwrap_or_default(),
        })
        .collect())
}

pub mod analysis;
pub mod cache;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod pipeline;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    const DEFAULT_CACHE_TTL_SECS: u64 = 600;
    const DEFAULT_CACHE_CAPACITY: usize = 100;
    const DEFAULT_STOCK_API_TIMEOUT_SECS: u64 = 15;
    const DEFAULT_PRICE_PROVIDER_RETRIES: u32 = 3;
    const DEFAULT_NEWS_API_TIMEOUT_SECS: u64 = 10;
    const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_ANTHROPIC_MAX_TOKENS: u32 = 1024;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LlmProviderKind {
        Gemini,
        Anthropic,
    }

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub stock_api_key: Option<String>,
        pub news_api_key: Option<String>,
        pub google_api_key: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub llm_provider: LlmProviderKind,
        pub sentry_dsn: Option<String>,
        pub cache_ttl: Duration,
        pub cache_capacity: usize,
        pub stock_api_timeout: Duration,
        pub price_provider_retries: u32,
        pub news_api_timeout: Duration,
        pub gemini_timeout: Duration,
        pub anthropic_timeout: Duration,
        pub anthropic_max_tokens: u32,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                stock_api_key: None,
                news_api_key: None,
                google_api_key: None,
                anthropic_api_key: None,
                llm_provider: LlmProviderKind::Gemini,
                sentry_dsn: None,
                cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
                cache_capacity: DEFAULT_CACHE_CAPACITY,
                stock_api_timeout: Duration::from_secs(DEFAULT_STOCK_API_TIMEOUT_SECS),
                price_provider_retries: DEFAULT_PRICE_PROVIDER_RETRIES,
                news_api_timeout: Duration::from_secs(DEFAULT_NEWS_API_TIMEOUT_SECS),
                gemini_timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
                anthropic_timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
                anthropic_max_tokens: DEFAULT_ANTHROPIC_MAX_TOKENS,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        /// Builds settings from an arbitrary key lookup. Unset or blank values
        /// take defaults; present but invalid numbers are errors.
        pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
        where
            F: Fn(&str) -> Option<String>,
        {
            let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());
            let defaults = Self::default();

            let llm_provider = match var("PULSE_LLM_PROVIDER") {
                Some(v) => parse_llm_provider(&v)?,
                None => defaults.llm_provider,
            };

            let cache_capacity =
                parse_var::<usize>("PULSE_CACHE_CAPACITY", var("PULSE_CACHE_CAPACITY"))?
                    .unwrap_or(defaults.cache_capacity);
            anyhow::ensure!(cache_capacity >= 1, "PULSE_CACHE_CAPACITY must be >= 1");

            let price_provider_retries =
                parse_var::<u32>("PRICE_PROVIDER_RETRIES", var("PRICE_PROVIDER_RETRIES"))?
                    .unwrap_or(defaults.price_provider_retries);
            anyhow::ensure!(price_provider_retries >= 1, "PRICE_PROVIDER_RETRIES must be >= 1");

            let anthropic_max_tokens =
                parse_var::<u32>("ANTHROPIC_MAX_TOKENS", var("ANTHROPIC_MAX_TOKENS"))?
                    .unwrap_or(defaults.anthropic_max_tokens);
            anyhow::ensure!(anthropic_max_tokens >= 1, "ANTHROPIC_MAX_TOKENS must be >= 1");

            let secs = |key: &str, default: Duration| -> anyhow::Result<Duration> {
                match parse_var::<u64>(key, var(key))? {
                    Some(0) => anyhow::bail!("{key} must be >= 1"),
                    Some(n) => Ok(Duration::from_secs(n)),
                    None => Ok(default),
                }
            };

            let cache_ttl =
                match parse_var::<u64>("PULSE_CACHE_TTL_SECS", var("PULSE_CACHE_TTL_SECS"))? {
                    Some(n) => Duration::from_secs(n),
                    None => defaults.cache_ttl,
                };

            Ok(Self {
                stock_api_key: var("STOCK_API_KEY"),
                news_api_key: var("NEWS_API_KEY"),
                google_api_key: var("GOOGLE_API_KEY"),
                anthropic_api_key: var("ANTHROPIC_API_KEY"),
                llm_provider,
                sentry_dsn: var("SENTRY_DSN"),
                cache_ttl,
                cache_capacity,
                stock_api_timeout: secs("STOCK_API_TIMEOUT_SECS", defaults.stock_api_timeout)?,
                price_provider_retries,
                news_api_timeout: secs("NEWS_API_TIMEOUT_SECS", defaults.news_api_timeout)?,
                gemini_timeout: secs("GEMINI_TIMEOUT_SECS", defaults.gemini_timeout)?,
                anthropic_timeout: secs("ANTHROPIC_TIMEOUT_SECS", defaults.anthropic_timeout)?,
                anthropic_max_tokens,
            })
        }

        pub fn require_stock_api_key(&self) -> anyhow::Result<&str> {
            self.stock_api_key
                .as_deref()
                .context("STOCK_API_KEY is required")
        }

        pub fn require_news_api_key(&self) -> anyhow::Result<&str> {
            self.news_api_key
                .as_deref()
                .context("NEWS_API_KEY is required")
        }

        pub fn require_google_api_key(&self) -> anyhow::Result<&str> {
            self.google_api_key
                .as_deref()
                .context("GOOGLE_API_KEY is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }
    }

    pub fn parse_llm_provider(s: &str) -> anyhow::Result<LlmProviderKind> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "gemini" | "google" => Ok(LlmProviderKind::Gemini),
            "anthropic" | "claude" => Ok(LlmProviderKind::Anthropic),
            other => anyhow::bail!("unsupported PULSE_LLM_PROVIDER: {other}"),
        }
    }

    fn parse_var<T>(key: &str, value: Option<String>) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match value {
            Some(v) => v
                .trim()
                .parse::<T>()
                .map(Some)
                .with_context(|| format!("{key} is not a valid number: {v}")),
            None => Ok(None),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::collections::HashMap;

        fn from_pairs(pairs: &[(&str, &str)]) -> anyhow::Result<Settings> {
            let vars: HashMap<String, String> = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            Settings::from_lookup(|key| vars.get(key).cloned())
        }

        #[test]
        fn parses_provider_names_case_insensitively() {
            assert_eq!(parse_llm_provider("Gemini").unwrap(), LlmProviderKind::Gemini);
            assert_eq!(parse_llm_provider(" ANTHROPIC ").unwrap(), LlmProviderKind::Anthropic);
            assert!(parse_llm_provider("openai").is_err());
        }

        #[test]
        fn missing_credentials_are_reported_by_name() {
            let settings = Settings {
                news_api_key: Some("n".to_string()),
                ..Settings::default()
            };
            let err = settings.require_stock_api_key().unwrap_err();
            assert!(err.to_string().contains("STOCK_API_KEY"));
            assert_eq!(settings.require_news_api_key().unwrap(), "n");
        }

        #[test]
        fn unset_and_blank_values_take_defaults() {
            let settings =
                from_pairs(&[("STOCK_API_TIMEOUT_SECS", "  "), ("STOCK_API_KEY", "")]).unwrap();
            assert_eq!(settings.stock_api_timeout, Duration::from_secs(15));
            assert_eq!(settings.price_provider_retries, 3);
            assert_eq!(settings.cache_ttl, Duration::from_secs(600));
            assert_eq!(settings.cache_capacity, 100);
            assert_eq!(settings.anthropic_max_tokens, 1024);
            assert!(settings.stock_api_key.is_none());
        }

        #[test]
        fn numeric_overrides_are_applied() {
            let settings = from_pairs(&[
                ("STOCK_API_TIMEOUT_SECS", "5"),
                ("PRICE_PROVIDER_RETRIES", "1"),
                ("NEWS_API_TIMEOUT_SECS", "7"),
                ("GEMINI_TIMEOUT_SECS", "60"),
                ("ANTHROPIC_MAX_TOKENS", "256"),
                ("PULSE_LLM_PROVIDER", "anthropic"),
            ])
            .unwrap();
            assert_eq!(settings.stock_api_timeout, Duration::from_secs(5));
            assert_eq!(settings.price_provider_retries, 1);
            assert_eq!(settings.news_api_timeout, Duration::from_secs(7));
            assert_eq!(settings.gemini_timeout, Duration::from_secs(60));
            assert_eq!(settings.anthropic_timeout, Duration::from_secs(30));
            assert_eq!(settings.anthropic_max_tokens, 256);
            assert_eq!(settings.llm_provider, LlmProviderKind::Anthropic);
        }

        #[test]
        fn invalid_upstream_numbers_fail_at_load() {
            for (key, value) in [
                ("STOCK_API_TIMEOUT_SECS", "fifteen"),
                ("STOCK_API_TIMEOUT_SECS", "0"),
                ("PRICE_PROVIDER_RETRIES", "-1"),
                ("PRICE_PROVIDER_RETRIES", "0"),
                ("NEWS_API_TIMEOUT_SECS", "1.5"),
                ("GEMINI_TIMEOUT_SECS", "abc"),
                ("ANTHROPIC_TIMEOUT_SECS", "x"),
                ("ANTHROPIC_MAX_TOKENS", "lots"),
                ("PULSE_CACHE_CAPACITY", "0"),
            ] {
                let err = from_pairs(&[(key, value)]).unwrap_err();
                assert!(err.to_string().contains(key), "{key}={value}: {err}");
            }
        }
    }
}

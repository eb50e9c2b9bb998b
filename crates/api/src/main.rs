use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marketpulse_core::domain::MarketPulseResult;
use marketpulse_core::error::PulseError;
use marketpulse_core::pipeline::PulseService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = marketpulse_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    // Missing credentials abort here, before the listener is bound.
    let service = match PulseService::from_settings(&settings) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "configuration error; refusing to start");
            return Err(e);
        }
    };

    let app = router(AppState { service });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Clone)]
struct AppState {
    service: Arc<PulseService>,
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/v1/market-pulse", get(get_market_pulse))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct MarketPulseQuery {
    ticker: Option<String>,
}

async fn get_market_pulse(
    State(state): State<AppState>,
    Query(query): Query<MarketPulseQuery>,
) -> Result<Json<MarketPulseResult>, ApiError> {
    let Some(ticker) = query.ticker else {
        return Err(ApiError::bad_request("query parameter `ticker` is required"));
    };

    let result = state.service.market_pulse(&ticker).await?;
    Ok(Json(result))
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

impl From<PulseError> for ApiError {
    fn from(err: PulseError) -> Self {
        let status = match &err {
            PulseError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PulseError::NotFound(_) => StatusCode::NOT_FOUND,
            PulseError::Unavailable(_) => StatusCode::GATEWAY_TIMEOUT,
            PulseError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            let err_kind = err.kind();
            let e = anyhow::Error::new(err);
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(kind = err_kind, error = %e, %status, "market pulse request failed");
            return Self {
                status,
                detail: e.to_string(),
            };
        }

        Self {
            status,
            detail: err.to_string(),
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &marketpulse_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use marketpulse_core::cache::ResultCache;
    use marketpulse_core::domain::{PricePoint, PriceSeries, Ticker};
    use marketpulse_core::ingest::types::Article;
    use marketpulse_core::ingest::{NewsProvider, PriceProvider};
    use marketpulse_core::llm::{LlmClient, PromptMessages, Provider};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct FixedPrices {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl PriceProvider for FixedPrices {
        fn provider_name(&self) -> &'static str {
            "fixed"
        }

        async fn fetch_daily_closes(&self, ticker: &Ticker) -> Result<PriceSeries, PulseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match ticker.as_str() {
                "NOPE" => Err(PulseError::NotFound(ticker.to_string())),
                "SLOW" => Err(PulseError::Unavailable(anyhow::anyhow!("operation timed out"))),
                "BROKE" => Err(PulseError::Upstream(anyhow::anyhow!("unexpected body"))),
                _ => {
                    let points = [(16, 150.0), (15, 148.0), (14, 152.0)]
                        .into_iter()
                        .map(|(day, close)| PricePoint {
                            date: chrono::NaiveDate::from_ymd_opt(2026, 10, day).unwrap(),
                            close,
                        })
                        .collect();
                    PriceSeries::new(points)
                }
            }
        }
    }

    struct NoNews;

    #[async_trait::async_trait]
    impl NewsProvider for NoNews {
        fn provider_name(&self) -> &'static str {
            "none"
        }

        async fn fetch_articles(&self, _ticker: &Ticker) -> anyhow::Result<Vec<Article>> {
            anyhow::bail!("news provider unreachable")
        }
    }

    struct CannedLlm;

    #[async_trait::async_trait]
    impl LlmClient for CannedLlm {
        fn provider(&self) -> Provider {
            Provider::Gemini
        }

        async fn generate_text(&self, _prompt: &PromptMessages) -> anyhow::Result<String> {
            Ok("```json\n{\"pulse\": \"Bullish\", \"explanation\": \"Higher close.\"}\n```".to_string())
        }
    }

    fn app() -> (Router, Arc<FixedPrices>) {
        let prices = Arc::new(FixedPrices {
            calls: AtomicUsize::new(0),
        });
        let service = PulseService::new(
            prices.clone(),
            Arc::new(NoNews),
            Arc::new(CannedLlm),
            Arc::new(ResultCache::default()),
        );
        let app = router(AppState {
            service: Arc::new(service),
        });
        (app, prices)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let res = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn returns_pulse_payload() {
        let (app, _) = app();
        let (status, body) = get(app, "/api/v1/market-pulse?ticker=aapl").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ticker"], "AAPL");
        assert_eq!(body["pulse"], "bullish");
        assert_eq!(body["llm_explanation"], "Higher close.");
        assert_eq!(body["news"], serde_json::json!([]));
        assert_eq!(body["momentum"]["returns"], serde_json::json!([1.35, -2.63]));
        assert!(body["as_of"].is_string());
    }

    #[tokio::test]
    async fn repeated_request_hits_cache() {
        let (app, prices) = app();
        let (s1, b1) = get(app.clone(), "/api/v1/market-pulse?ticker=AAPL").await;
        let (s2, b2) = get(app, "/api/v1/market-pulse?ticker=aapl").await;
        assert_eq!(s1, StatusCode::OK);
        assert_eq!(s2, StatusCode::OK);
        assert_eq!(b1, b2);
        assert_eq!(prices.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn maps_errors_to_statuses() {
        let cases = [
            ("/api/v1/market-pulse?ticker=", StatusCode::BAD_REQUEST),
            ("/api/v1/market-pulse?ticker=ELEVENCHARS", StatusCode::BAD_REQUEST),
            ("/api/v1/market-pulse", StatusCode::BAD_REQUEST),
            ("/api/v1/market-pulse?ticker=NOPE", StatusCode::NOT_FOUND),
            ("/api/v1/market-pulse?ticker=SLOW", StatusCode::GATEWAY_TIMEOUT),
            ("/api/v1/market-pulse?ticker=BROKE", StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (uri, expected) in cases {
            let (app, _) = app();
            let (status, body) = get(app, uri).await;
            assert_eq!(status, expected, "{uri}");
            assert!(body["detail"].is_string(), "{uri}");
        }
    }

    #[tokio::test]
    async fn invalid_ticker_never_reaches_provider() {
        let (app, prices) = app();
        let (status, _) = get(app, "/api/v1/market-pulse?ticker=TOOLONGTICKER").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(prices.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let (app, _) = app();
        let res = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}

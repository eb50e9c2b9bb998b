use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marketpulse_core::pipeline::PulseService;

#[derive(Debug, Parser)]
#[command(name = "marketpulse")]
struct Args {
    /// Stock symbol to analyze, e.g. MSFT.
    #[arg(long)]
    ticker: String,

    /// Pretty-print the JSON payload.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = marketpulse_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let service = PulseService::from_settings(&settings)?;

    match service.market_pulse(&args.ticker).await {
        Ok(result) => {
            let out = if args.pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{out}");
            Ok(())
        }
        Err(err) => {
            let kind = err.kind();
            let err = anyhow::Error::new(err);
            if !matches!(kind, "invalid_input" | "not_found") {
                sentry_anyhow::capture_anyhow(&err);
            }
            tracing::error!(ticker = %args.ticker, kind, error = %err, "market pulse failed");
            Err(err)
        }
    }
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

    #[test]
    fn ticker_is_required() {
        assert!(Args::try_parse_from(["marketpulse"]).is_err());
    }

    #[test]
    fn parses_flags() {
        let args = Args::try_parse_from(["marketpulse", "--ticker", "msft", "--pretty"]).unwrap();
        assert_eq!(args.ticker, "msft");
        assert!(args.pretty);

        let args = Args::try_parse_from(["marketpulse", "--ticker", "AAPL"]).unwrap();
        assert!(!args.pretty);
    }
}

use crate::domain::{MomentumFeatures, NewsItem, Ticker};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessages {
    pub system: String,
    pub user: String,
}

pub fn system_prompt() -> String {
    [
        "You are an expert financial analyst. Your task is to determine the market pulse",
        "(bullish, bearish, or neutral) for a stock based on its recent price momentum and news headlines.",
        "Provide a concise, data-driven explanation for your decision.",
        "Respond with a single valid JSON object with exactly two keys:",
        "\"pulse\" (one of \"bullish\", \"bearish\", \"neutral\") and \"explanation\" (a string).",
        "Do not include any other keys.",
    ]
    .join("\n")
}

pub fn user_prompt(ticker: &Ticker, momentum: &MomentumFeatures, news: &[NewsItem]) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "Analyze the following data for the stock ticker {ticker}:");
    let _ = writeln!(out, "- **Price Momentum**:");
    let _ = writeln!(
        out,
        "  - The last {} daily returns are {} (in %).",
        momentum.returns.len(),
        format_list(&momentum.returns)
    );
    let _ = writeln!(
        out,
        "  - The simple momentum score (sum of returns) is {}.",
        format_number(momentum.simple_score)
    );
    let _ = writeln!(
        out,
        "  - The advanced momentum score (% difference from 20-day SMA) is {}%.",
        format_number(momentum.advanced_score)
    );
    let _ = writeln!(out, "- **Recent News with Sentiment Scores**:");

    if news.is_empty() {
        let _ = writeln!(out, "  No news headlines available.");
    } else {
        for (i, item) in news.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {}. Title: {} (Sentiment: {:.2})\n     Description: {}",
                i + 1,
                item.title,
                item.sentiment,
                item.description
            );
        }
    }

    out.push_str("\nBased on this data, what is the market pulse and why?");
    out
}

pub fn build_prompt(ticker: &Ticker, momentum: &MomentumFeatures, news: &[NewsItem]) -> PromptMessages {
    PromptMessages {
        system: system_prompt(),
        user: user_prompt(ticker, momentum, news),
    }
}

/// Whole numbers keep one decimal so `2.0` does not render as `2`.
fn format_number(x: f64) -> String {
    if x.fract() == 0.0 && x.is_finite() {
        format!("{x:.1}")
    } else {
        format!("{x}")
    }
}

fn format_list(xs: &[f64]) -> String {
    let inner: Vec<String> = xs.iter().map(|x| format_number(*x)).collect();
    format!("[{}]", inner.join(", "))
}

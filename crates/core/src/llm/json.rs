//! Turns untrusted model output into a [`PulseVerdict`].
//!
//! Three tiers, tried in order: the whole reply as a JSON object, then the span
//! from the first `{` to the last `}` (covers markdown fences and chatter around
//! the object), then the neutral default. Nothing here returns an error.

use crate::domain::{Pulse, PulseVerdict};
use crate::llm::error::LlmDiagnosticsError;
use anyhow::Context;
use serde_json::{Map, Value};

pub const NO_EXPLANATION: &str = "No explanation provided.";
pub const UNPARSABLE_RESPONSE: &str = "Could not parse LLM response as JSON.";

/// Best-effort extraction: first '{' to last '}'.
pub fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Strict tier: `json_str` must be a JSON object.
pub fn parse_verdict(json_str: &str) -> anyhow::Result<PulseVerdict> {
    let value = serde_json::from_str::<Value>(json_str.trim())
        .with_context(|| format!("LLM output is not valid JSON: {json_str}"))?;
    let Value::Object(obj) = value else {
        anyhow::bail!("LLM output is JSON but not an object: {json_str}");
    };
    Ok(verdict_from_object(&obj))
}

fn verdict_from_object(obj: &Map<String, Value>) -> PulseVerdict {
    let pulse = match obj.get("pulse") {
        Some(Value::String(s)) => Pulse::parse(s).unwrap_or_else(|| {
            tracing::warn!(pulse = %s, "LLM returned an unknown pulse; using neutral");
            Pulse::Neutral
        }),
        _ => Pulse::Neutral,
    };

    let explanation = match obj.get("explanation") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::String(_)) | Some(Value::Null) | None => NO_EXPLANATION.to_string(),
        Some(other) => other.to_string(),
    };

    PulseVerdict { pulse, explanation }
}

/// Interprets a reply that arrived successfully.
pub fn interpret_response(text: &str) -> PulseVerdict {
    if let Ok(verdict) = parse_verdict(text) {
        return verdict;
    }

    match extract_json_span(text).map(parse_verdict) {
        Some(Ok(verdict)) => verdict,
        Some(Err(err)) => {
            tracing::warn!(error = %err, "LLM JSON span failed to parse");
            unparsable()
        }
        None => {
            tracing::warn!(len = text.len(), "LLM response contains no JSON object");
            unparsable()
        }
    }
}

/// Interprets the outcome of a generation call, including its failure.
pub fn interpret_generation(result: anyhow::Result<String>) -> PulseVerdict {
    match result {
        Ok(text) => interpret_response(&text),
        Err(err) => {
            if let Some(diag) = err.downcast_ref::<LlmDiagnosticsError>() {
                tracing::warn!(
                    provider = ?diag.provider,
                    stage = diag.stage,
                    raw_output = diag.raw_output.as_deref().unwrap_or(""),
                    "LLM call failed"
                );
            } else {
                tracing::warn!(error = %err, "LLM call failed");
            }
            PulseVerdict {
                pulse: Pulse::Neutral,
                explanation: format!("Could not get explanation from LLM: {err:#}"),
            }
        }
    }
}

fn unparsable() -> PulseVerdict {
    PulseVerdict {
        pulse: Pulse::Neutral,
        explanation: UNPARSABLE_RESPONSE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Provider;

    #[test]
    fn extract_json_span_falls_back_to_braces() {
        let s = "prefix {\"a\":1} suffix";
        assert_eq!(extract_json_span(s), Some("{\"a\":1}"));
        assert_eq!(extract_json_span("} backwards {"), None);
        assert_eq!(extract_json_span("no braces"), None);
    }

    #[test]
    fn plain_json_is_parsed_and_normalized() {
        let v = interpret_response(r#"{"pulse": "Bullish", "explanation": "Strong momentum."}"#);
        assert_eq!(v.pulse, Pulse::Bullish);
        assert_eq!(v.explanation, "Strong momentum.");
    }

    #[test]
    fn fenced_json_is_parsed() {
        let text = "Here is my analysis:\n```json\n{\"pulse\": \"BEARISH\", \"explanation\": \"Weak news.\"}\n```\nHope it helps!";
        let v = interpret_response(text);
        assert_eq!(v.pulse, Pulse::Bearish);
        assert_eq!(v.explanation, "Weak news.");
    }

    #[test]
    fn prose_without_json_is_unparsable() {
        let v = interpret_response("The stock looks fine to me.");
        assert_eq!(v.pulse, Pulse::Neutral);
        assert_eq!(v.explanation, UNPARSABLE_RESPONSE);
    }

    #[test]
    fn empty_text_is_unparsable() {
        let v = interpret_response("");
        assert_eq!(v.pulse, Pulse::Neutral);
        assert_eq!(v.explanation, UNPARSABLE_RESPONSE);
    }

    #[test]
    fn broken_span_is_unparsable() {
        let v = interpret_response("{pulse: bullish, explanation: trailing comma,}");
        assert_eq!(v.pulse, Pulse::Neutral);
        assert_eq!(v.explanation, UNPARSABLE_RESPONSE);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let v = interpret_response("{}");
        assert_eq!(v.pulse, Pulse::Neutral);
        assert_eq!(v.explanation, NO_EXPLANATION);

        let v = interpret_response(r#"{"pulse": "bullish"}"#);
        assert_eq!(v.pulse, Pulse::Bullish);
        assert_eq!(v.explanation, NO_EXPLANATION);
    }

    #[test]
    fn unknown_or_non_string_pulse_is_neutral() {
        let v = interpret_response(r#"{"pulse": "moonshot", "explanation": "x"}"#);
        assert_eq!(v.pulse, Pulse::Neutral);
        let v = interpret_response(r#"{"pulse": 1, "explanation": "x"}"#);
        assert_eq!(v.pulse, Pulse::Neutral);
        assert_eq!(v.explanation, "x");
    }

    #[test]
    fn generation_error_is_absorbed() {
        let v = interpret_generation(Err(anyhow::anyhow!("quota exceeded")));
        assert_eq!(v.pulse, Pulse::Neutral);
        assert_eq!(v.explanation, "Could not get explanation from LLM: quota exceeded");

        let diag = LlmDiagnosticsError {
            provider: Provider::Gemini,
            stage: "http",
            detail: "status=503".to_string(),
            raw_output: Some("overloaded".to_string()),
        };
        let v = interpret_generation(Err(diag.into()));
        assert_eq!(v.pulse, Pulse::Neutral);
        assert!(v.explanation.starts_with("Could not get explanation from LLM: LLM error"));
    }

    #[test]
    fn generation_success_is_interpreted() {
        let v = interpret_generation(Ok(r#"{"pulse":"neutral","explanation":"Mixed."}"#.into()));
        assert_eq!(v, PulseVerdict { pulse: Pulse::Neutral, explanation: "Mixed.".into() });
    }
}

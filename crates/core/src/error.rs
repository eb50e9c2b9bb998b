use std::fmt;

/// Request-level failures that reach the caller. News and generation problems
/// never show up here; they degrade the payload instead.
#[derive(Debug)]
pub enum PulseError {
    /// Malformed ticker. Rejected before any fetch or cache access.
    InvalidInput(String),
    /// The price provider does not know the ticker.
    NotFound(String),
    /// Network failure or timeout talking to the price provider.
    Unavailable(anyhow::Error),
    /// Non-success status or malformed body from the price provider.
    Upstream(anyhow::Error),
}

impl PulseError {
    /// Transient failures are the only ones worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, PulseError::Unavailable(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PulseError::InvalidInput(_) => "invalid_input",
            PulseError::NotFound(_) => "not_found",
            PulseError::Unavailable(_) => "unavailable",
            PulseError::Upstream(_) => "upstream",
        }
    }
}

impl fmt::Display for PulseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PulseError::InvalidInput(detail) => write!(f, "invalid input: {detail}"),
            PulseError::NotFound(ticker) => write!(
                f,
                "Ticker {ticker} not found or invalid API key for stock data."
            ),
            PulseError::Unavailable(err) => write!(f, "Error fetching stock data: {err:#}"),
            PulseError::Upstream(err) => write!(
                f,
                "An unexpected error occurred with stock data: {err:#}"
            ),
        }
    }
}

impl std::error::Error for PulseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PulseError::Unavailable(err) | PulseError::Upstream(err) => Some(err.as_ref()),
            PulseError::InvalidInput(_) | PulseError::NotFound(_) => None,
        }
    }
}

/// Classifies a reqwest failure. Anything that broke the exchange itself,
/// including a response body cut off mid-stream, is `Unavailable`; the rest is
/// a malformed exchange.
/// The URL is stripped because some providers take the API key as a query
/// parameter.
pub fn classify_reqwest(err: reqwest::Error, what: &'static str) -> PulseError {
    let err = err.without_url();
    if is_transport_failure(&err) {
        PulseError::Unavailable(anyhow::Error::new(err).context(what))
    } else {
        PulseError::Upstream(anyhow::Error::new(err).context(what))
    }
}

fn is_transport_failure(err: &reqwest::Error) -> bool {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        return true;
    }
    // A dropped connection while reading the body surfaces as a decode error.
    // Only JSON decoding makes one the provider's fault.
    err.is_decode() && !caused_by::<serde_json::Error>(err)
}

fn caused_by<E: std::error::Error + 'static>(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut cur = Some(err);
    while let Some(e) = cur {
        if e.is::<E>() {
            return true;
        }
        cur = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_is_transient() {
        assert!(PulseError::Unavailable(anyhow::anyhow!("reset")).is_transient());
        assert!(!PulseError::Upstream(anyhow::anyhow!("bad json")).is_transient());
        assert!(!PulseError::NotFound("ZZZZ".into()).is_transient());
        assert!(!PulseError::InvalidInput("empty".into()).is_transient());
    }

    #[test]
    fn display_keeps_context_chain() {
        let err = PulseError::Upstream(anyhow::anyhow!("eof").context("decode body"));
        let msg = err.to_string();
        assert!(msg.contains("decode body"));
        assert!(msg.contains("eof"));
    }

    #[test]
    fn walks_the_source_chain() {
        #[derive(Debug)]
        struct Wrapper(std::io::Error);

        impl fmt::Display for Wrapper {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "body stream failed")
            }
        }

        impl std::error::Error for Wrapper {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let eof = Wrapper(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "end of file before message length reached",
        ));
        assert!(caused_by::<std::io::Error>(&eof));
        assert!(!caused_by::<serde_json::Error>(&eof));

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(caused_by::<serde_json::Error>(&json));
    }
}

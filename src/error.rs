/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum DatadogError {
    /// The request did not complete within the configured timeout.
    #[error("{method} {url} timed out after {timeout_secs} seconds")]
    Timeout {
        /// HTTP method of the timed-out request.
        method: reqwest::Method,
        /// Full request URL, including the query string.
        url: String,
        /// Configured per-request timeout.
        timeout_secs: u64,
    },
    /// Rejected locally: too many timeouts, the breaker is cooling down.
    #[error("too many timeouts, won't submit for another {remaining_secs} seconds")]
    Backoff {
        /// Seconds spent backing off so far, rounded to 2 decimals.
        elapsed_secs: f64,
        /// Seconds of cooldown left, rounded to 2 decimals.
        remaining_secs: f64,
    },
    /// The API answered with an `errors` payload.
    #[error("API error response: {errors}")]
    Api {
        /// Raw value of the `errors` key from the response body.
        errors: serde_json::Value,
    },
    /// Non-empty response body that is not valid JSON.
    #[error("invalid JSON response: {body}")]
    MalformedResponse { body: String },
    /// Any other network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl DatadogError {
    /// Whether this failure may be logged and suppressed instead of returned.
    ///
    /// Only transient infrastructure failures qualify; [`DatadogError::Api`]
    /// and [`DatadogError::MalformedResponse`] indicate a request or protocol
    /// problem the caller must see, and [`DatadogError::Transport`] covers
    /// non-timeout network errors the breaker does not track.
    pub fn is_swallowable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Backoff { .. })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::DatadogError;

    #[test]
    fn timeout_and_backoff_are_swallowable() {
        let timeout = DatadogError::Timeout {
            method: reqwest::Method::POST,
            url: "https://app.datadoghq.com/api/v1/events".to_owned(),
            timeout_secs: 2,
        };
        let backoff = DatadogError::Backoff {
            elapsed_secs: 1.5,
            remaining_secs: 298.5,
        };
        assert!(timeout.is_swallowable());
        assert!(backoff.is_swallowable());
    }

    #[test]
    fn api_and_decode_errors_always_propagate() {
        let api = DatadogError::Api {
            errors: json!(["bad request"]),
        };
        let malformed = DatadogError::MalformedResponse {
            body: "<html>".to_owned(),
        };
        assert!(!api.is_swallowable());
        assert!(!malformed.is_swallowable());
    }

    #[test]
    fn timeout_message_names_method_url_and_budget() {
        let err = DatadogError::Timeout {
            method: reqwest::Method::GET,
            url: "https://app.datadoghq.com/api/v1/events/7".to_owned(),
            timeout_secs: 2,
        };
        let message = err.to_string();
        assert!(message.contains("GET"));
        assert!(message.contains("/api/v1/events/7"));
        assert!(message.contains("2 seconds"));
    }
}

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::{host, BackoffTracker, ClientConfig, DatadogError, Event, EventQuery, Result};

/// HTTP client for the Datadog v1 API.
///
/// Clones share one [`BackoffTracker`], so every handle in the process sees
/// the same breaker state.
#[derive(Clone)]
pub struct DatadogClient {
    http: reqwest::Client,
    config: ClientConfig,
    default_host: String,
    backoff: Arc<Mutex<BackoffTracker>>,
}

impl fmt::Debug for DatadogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatadogClient")
            .field("api_host", &self.config.api_host)
            .field("api_version", &self.config.api_version)
            .field("api_key", &self.config.api_key.as_ref().map(|_| "<redacted>"))
            .field(
                "application_key",
                &self.config.application_key.as_ref().map(|_| "<redacted>"),
            )
            .field("default_host", &self.default_host)
            .finish()
    }
}

impl DatadogClient {
    /// Creates a client from a configuration.
    ///
    /// Resolves the reported hostname up front (including the optional
    /// instance-metadata probe) so no request path ever blocks on it.
    pub async fn new(config: ClientConfig) -> Self {
        let default_host = host::resolve_host(config.use_host_discovery).await;
        let backoff = BackoffTracker::new(config.max_timeouts, config.backoff_period);
        Self {
            http: reqwest::Client::new(),
            default_host,
            backoff: Arc::new(Mutex::new(backoff)),
            config,
        }
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `DATADOG_API_KEY` — API key (required)
    /// - `DATADOG_APPLICATION_KEY` — application key (optional)
    /// - `DATADOG_HOST` — API host override (optional)
    ///
    /// Returns an error if the API key is missing or empty.
    pub async fn from_env() -> std::result::Result<Self, String> {
        let api_key = std::env::var("DATADOG_API_KEY")
            .map_err(|_| "missing DATADOG_API_KEY environment variable".to_owned())?;
        if api_key.trim().is_empty() {
            return Err("DATADOG_API_KEY is set but empty".to_owned());
        }
        let mut config = ClientConfig::default().with_api_key(api_key);
        if let Some(application_key) = std::env::var("DATADOG_APPLICATION_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
        {
            config = config.with_application_key(application_key);
        }
        Ok(Self::new(config).await)
    }

    /// The active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Hostname attributed to posted events when none is set explicitly.
    pub fn default_host(&self) -> &str {
        &self.default_host
    }

    /// Backoff progress as `(elapsed_secs, remaining_secs)`; `(0.0, 0.0)`
    /// while the breaker is closed.
    pub fn backoff_status(&self) -> (f64, f64) {
        self.breaker().status()
    }

    /// Posts an event to the event stream.
    ///
    /// An event without an explicit host is attributed to this client's
    /// [`default_host`](Self::default_host).
    pub async fn post_event(&self, event: Event) -> Result<Option<Value>> {
        let mut event = event;
        if event.host.is_none() {
            event.host = Some(self.default_host.clone());
        }
        self.request(Method::POST, "events", Some(&event), Vec::new())
            .await
    }

    /// Fetches one event's details.
    pub async fn get_event(&self, event_id: u64) -> Result<Option<Value>> {
        self.request(
            Method::GET,
            &format!("events/{event_id}"),
            None::<&Value>,
            Vec::new(),
        )
        .await
    }

    /// Queries the event stream over a time window.
    pub async fn event_stream(&self, query: &EventQuery) -> Result<Option<Value>> {
        self.request(Method::GET, "events", None::<&Value>, query.query_params())
            .await
    }

    /// Performs one authenticated API call and normalizes the result.
    ///
    /// `path` is namespaced under `/api/{version}/`; configured keys are
    /// injected into `query`. Returns `Ok(Some(value))` with the decoded
    /// response body (an empty body decodes to an empty object), or
    /// `Ok(None)` when a timeout/backoff failure was swallowed per the
    /// configured policy. [`DatadogError::Api`] and
    /// [`DatadogError::MalformedResponse`] always propagate.
    pub async fn request<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        query: Vec<(String, String)>,
    ) -> Result<Option<Value>>
    where
        B: Serialize + ?Sized,
    {
        let mut query = query;
        if let Some(api_key) = &self.config.api_key {
            query.push(("api_key".to_owned(), api_key.clone()));
        }
        if let Some(application_key) = &self.config.application_key {
            query.push(("application_key".to_owned(), application_key.clone()));
        }

        {
            let mut breaker = self.breaker();
            if !breaker.should_submit() {
                let (elapsed_secs, remaining_secs) = breaker.status();
                drop(breaker);
                return self.dispatch_failure(DatadogError::Backoff {
                    elapsed_secs,
                    remaining_secs,
                });
            }
        }

        let path = format!(
            "/api/{}/{}",
            self.config.api_version,
            path.trim_start_matches('/')
        );
        let url = format!("{}{}", base_url(&self.config.api_host), path);

        let mut builder = self
            .http
            .request(method.clone(), &url)
            .query(&query)
            .timeout(self.config.timeout);
        if let Some(body) = body {
            // .json() serializes the body and sets Content-Type: application/json.
            builder = builder.json(body);
        }

        let started = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => return self.handle_transport_error(err, &method, &url),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => return self.handle_transport_error(err, &method, &url),
        };
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(
            status = status.as_u16(),
            method = %method,
            path = %path,
            duration_ms,
            "api request completed"
        );

        if body.is_empty() {
            return Ok(Some(Value::Object(serde_json::Map::new())));
        }
        let decoded: Value = serde_json::from_str(&body)
            .map_err(|_| DatadogError::MalformedResponse { body })?;
        if let Some(errors) = decoded.as_object().and_then(|object| object.get("errors")) {
            return Err(DatadogError::Api {
                errors: errors.clone(),
            });
        }
        Ok(Some(decoded))
    }

    /// Classifies a reqwest failure: timeout-class errors feed the breaker
    /// and follow the swallow policy, anything else propagates as-is.
    fn handle_transport_error(
        &self,
        err: reqwest::Error,
        method: &Method,
        url: &str,
    ) -> Result<Option<Value>> {
        if err.is_timeout() {
            self.breaker().report_timeout();
            return self.dispatch_failure(DatadogError::Timeout {
                method: method.clone(),
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            });
        }
        Err(DatadogError::Transport(err))
    }

    /// The single swallow-vs-propagate branch for the whole error path.
    fn dispatch_failure(&self, err: DatadogError) -> Result<Option<Value>> {
        if self.config.swallow && err.is_swallowable() {
            error!(error = %err, "swallowed request failure");
            Ok(None)
        } else {
            Err(err)
        }
    }

    fn breaker(&self) -> MutexGuard<'_, BackoffTracker> {
        self.backoff.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolves the scheme-qualified base URL for an API host value.
///
/// Hosts without a recognized scheme prefix default to HTTPS.
fn base_url(api_host: &str) -> String {
    let host = api_host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_owned()
    } else {
        format!("https://{host}")
    }
}

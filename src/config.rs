use std::env;
use std::time::Duration;

/// Environment variable consulted for the default API host.
pub const HOST_ENV_VAR: &str = "DATADOG_HOST";

/// API host used when [`HOST_ENV_VAR`] is unset.
pub const DEFAULT_API_HOST: &str = "https://app.datadoghq.com";

/// Configures authentication, addressing, and transport behavior.
///
/// Built once and handed to [`DatadogClient::new`](crate::DatadogClient::new);
/// nothing here changes after the client exists. The one construction-time
/// side effect (replacing the reported hostname with a discovered instance
/// id) is controlled by `use_host_discovery` and performed by the client,
/// not by this struct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// API host, with or without an `http://`/`https://` prefix.
    pub api_host: String,
    /// API key injected into every request's query string.
    pub api_key: Option<String>,
    /// Application key injected alongside the API key when present.
    pub application_key: Option<String>,
    /// API version segment of the request path.
    pub api_version: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Consecutive timeouts tolerated before the breaker opens.
    pub max_timeouts: u32,
    /// Cooldown the breaker enforces once open.
    pub backoff_period: Duration,
    /// Log and suppress timeout/backoff failures instead of returning them.
    pub swallow: bool,
    /// Probe the instance metadata service for the reported hostname.
    pub use_host_discovery: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_host: env::var(HOST_ENV_VAR).unwrap_or_else(|_| DEFAULT_API_HOST.to_owned()),
            api_key: None,
            application_key: None,
            api_version: "v1".to_owned(),
            timeout: Duration::from_secs(2),
            max_timeouts: 3,
            backoff_period: Duration::from_secs(300),
            swallow: true,
            use_host_discovery: false,
        }
    }
}

impl ClientConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API host.
    pub fn with_api_host(mut self, api_host: impl Into<String>) -> Self {
        self.api_host = api_host.into();
        self
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the application key.
    pub fn with_application_key(mut self, application_key: impl Into<String>) -> Self {
        self.application_key = Some(application_key.into());
        self
    }

    /// Sets the API version path segment.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the breaker's consecutive-timeout threshold.
    pub fn with_max_timeouts(mut self, max_timeouts: u32) -> Self {
        self.max_timeouts = max_timeouts;
        self
    }

    /// Sets the breaker's cooldown period.
    pub fn with_backoff_period(mut self, backoff_period: Duration) -> Self {
        self.backoff_period = backoff_period;
        self
    }

    /// Sets whether timeout/backoff failures are suppressed.
    pub fn with_swallow(mut self, swallow: bool) -> Self {
        self.swallow = swallow;
        self
    }

    /// Sets whether the reported hostname comes from instance metadata.
    pub fn with_host_discovery(mut self, use_host_discovery: bool) -> Self {
        self.use_host_discovery = use_host_discovery;
        self
    }
}

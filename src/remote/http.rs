//! HTTP client construction
//!
//! One pooled `reqwest` client per run. The remote service is rate-limited,
//! so requests are never retried here; a failed request fails the run.

use std::time::Duration;

use crate::config::EndpointConfig;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Maximum idle connections per host
    pub pool_idle_per_host: usize,
    /// Idle connection timeout in seconds
    pub pool_idle_timeout_secs: u64,
    /// User agent string, required by most public SPARQL endpoints
    pub user_agent: String,
    /// Maximum number of redirects to follow
    pub max_redirects: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            request_timeout_secs: 300,
            pool_idle_per_host: 2,
            pool_idle_timeout_secs: 90,
            user_agent: format!("kgmirror/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 5,
        }
    }
}

impl From<&EndpointConfig> for HttpClientConfig {
    fn from(endpoint: &EndpointConfig) -> Self {
        Self {
            connect_timeout_secs: endpoint.connect_timeout_secs,
            request_timeout_secs: endpoint.timeout_secs,
            user_agent: endpoint.user_agent.clone(),
            ..Default::default()
        }
    }
}

/// Create an asynchronous HTTP client with custom configuration
pub fn create_client(config: &HttpClientConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
        .pool_max_idle_per_host(config.pool_idle_per_host)
        .user_agent(&config.user_agent)
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .build()
}

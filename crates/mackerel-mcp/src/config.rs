//! Server configuration.
//!
//! Everything except the API key has a default:
//!
//! ```ignore
//! let config = ServerConfig::new(api_key)
//!     .with_cache_ttl(Duration::from_secs(60))
//!     .with_budget(ResponseBudget::new(10_000));
//! ```

use std::fmt;
use std::time::Duration;

use crate::api::{DEFAULT_BASE_URL, DEFAULT_CACHE_TTL, MackerelClient, TtlCache};
use crate::response::{ErrorEventRule, ResponseBudget};

/// Environment variable holding the Mackerel API key.
pub const API_KEY_ENV: &str = "MACKEREL_API_KEY";

/// Settings for one server process.
#[derive(Clone)]
pub struct ServerConfig {
    /// Mackerel API key, sent as `X-Api-Key`.
    pub api_key: String,
    /// API root. Default: `https://api.mackerelio.com`.
    pub base_url: String,
    /// Lifetime of cached GET responses. Zero disables serving from cache.
    pub cache_ttl: Duration,
    /// Token ceiling for tool results.
    pub budget: ResponseBudget,
    /// Which span events mark a trace span as failing.
    pub error_event_rule: ErrorEventRule,
    /// Validate tool arguments against their JSON Schema before dispatch.
    pub validate_args: bool,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("cache_ttl", &self.cache_ttl)
            .field("budget", &self.budget)
            .field("error_event_rule", &self.error_event_rule)
            .field("validate_args", &self.validate_args)
            .finish()
    }
}

impl ServerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            budget: ResponseBudget::default(),
            error_event_rule: ErrorEventRule::default(),
            validate_args: true,
        }
    }

    /// Defaults plus the API key from [`API_KEY_ENV`].
    pub fn from_env() -> Result<Self, String> {
        Ok(Self::new(Self::api_key_from_env()?))
    }

    /// Read the API key from [`API_KEY_ENV`]. Blank values count as unset.
    pub fn api_key_from_env() -> Result<String, String> {
        non_blank_key(std::env::var(API_KEY_ENV).ok())
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_budget(mut self, budget: ResponseBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_error_event_rule(mut self, rule: ErrorEventRule) -> Self {
        self.error_event_rule = rule;
        self
    }

    pub fn with_arg_validation(mut self, enabled: bool) -> Self {
        self.validate_args = enabled;
        self
    }

    /// Build a client with this configuration's base URL and cache TTL.
    pub fn build_client(&self) -> Result<MackerelClient, String> {
        Ok(MackerelClient::new(self.api_key.clone(), &self.base_url)?
            .with_cache(TtlCache::new(self.cache_ttl)))
    }
}

fn non_blank_key(value: Option<String>) -> Result<String, String> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(format!("{API_KEY_ENV} environment variable is not set")),
    }
}

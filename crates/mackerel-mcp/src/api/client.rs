//! HTTP client for the Mackerel REST API.
//!
//! Every idempotent read goes through the [`TtlCache`]; mutations (`PUT`,
//! `POST`) always hit the network and never populate the cache. Failures are
//! propagated unchanged as [`ApiError`] and never retried.

use std::time::{Duration, Instant};

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Url};
use serde_json::Value;
use tracing::{debug, trace, warn};

use super::cache::{CacheKey, TtlCache};
use super::error::ApiError;
use crate::response::spans::TraceResponse;

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.mackerelio.com";

/// How long a cached GET response is served before refetching.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

const API_KEY_HEADER: &str = "X-Api-Key";

// ── Query parameters ───────────────────────────────────────────────

/// Ordered query parameters. Order is preserved on the wire and in the
/// cache key; repeated keys are allowed (`role=a&role=b`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one parameter.
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.0.push((key.to_string(), value.to_string()));
        self
    }

    /// Append a parameter only when a value is present.
    pub fn with_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    /// Append one parameter per value under the same key.
    pub fn with_all<I, V>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        for v in values {
            self = self.with(key, v);
        }
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Server-side filters for `GET /api/v0/hosts`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostFilter {
    pub service: Option<String>,
    pub roles: Vec<String>,
    pub name: Option<String>,
    pub statuses: Vec<String>,
    pub custom_identifier: Option<String>,
}

impl HostFilter {
    fn to_params(&self) -> QueryParams {
        QueryParams::new()
            .with_opt("service", self.service.as_deref())
            .with_all("role", &self.roles)
            .with_opt("name", self.name.as_deref())
            .with_all("status", &self.statuses)
            .with_opt("customIdentifier", self.custom_identifier.as_deref())
    }
}

// ── Client ─────────────────────────────────────────────────────────

/// Authenticated, caching client for one Mackerel organization.
pub struct MackerelClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    cache: TtlCache<Value>,
}

impl std::fmt::Debug for MackerelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MackerelClient")
            .field("base_url", &self.base_url.as_str())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl MackerelClient {
    /// Create a client against `base_url` with the default cache TTL.
    pub fn new(api_key: impl Into<String>, base_url: &str) -> Result<Self, String> {
        let base_url =
            Url::parse(base_url).map_err(|e| format!("invalid base URL {base_url:?}: {e}"))?;
        if base_url.cannot_be_a_base() {
            return Err(format!("invalid base URL {base_url:?}: cannot carry a path"));
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("mackerel-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
            cache: TtlCache::new(DEFAULT_CACHE_TTL),
        })
    }

    /// Replace the response cache (custom TTL or clock).
    pub fn with_cache(mut self, cache: TtlCache<Value>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &TtlCache<Value> {
        &self.cache
    }

    /// Drop every cached response so the next read refetches.
    pub fn clear_cache(&self) {
        debug!("Clearing response cache ({} entries)", self.cache.len());
        self.cache.clear();
    }

    // ── Alerts ──

    pub async fn list_alerts(
        &self,
        with_closed: Option<bool>,
        next_id: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, ApiError> {
        let params = QueryParams::new()
            .with_opt("withClosed", with_closed)
            .with_opt("nextId", next_id.filter(|s| !s.is_empty()))
            .with_opt("limit", limit);
        self.get(&["api", "v0", "alerts"], &params).await
    }

    pub async fn get_alert(&self, alert_id: &str) -> Result<Value, ApiError> {
        self.get(&["api", "v0", "alerts", alert_id], &QueryParams::new())
            .await
    }

    pub async fn get_alert_logs(
        &self,
        alert_id: &str,
        next_id: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, ApiError> {
        let params = QueryParams::new()
            .with_opt("nextId", next_id.filter(|s| !s.is_empty()))
            .with_opt("limit", limit);
        self.get(&["api", "v0", "alerts", alert_id, "logs"], &params)
            .await
    }

    // ── Dashboards ──

    pub async fn list_dashboards(&self) -> Result<Value, ApiError> {
        self.get(&["api", "v0", "dashboards"], &QueryParams::new())
            .await
    }

    pub async fn get_dashboard(&self, dashboard_id: &str) -> Result<Value, ApiError> {
        self.get(&["api", "v0", "dashboards", dashboard_id], &QueryParams::new())
            .await
    }

    /// Replace a dashboard's definition. Never cached.
    pub async fn update_dashboard(
        &self,
        dashboard_id: &str,
        body: &Value,
    ) -> Result<Value, ApiError> {
        self.send(
            Method::PUT,
            &["api", "v0", "dashboards", dashboard_id],
            &QueryParams::new(),
            Some(body),
        )
        .await
    }

    // ── Hosts ──

    /// Fetch hosts matching `filter`. The upstream returns the full set;
    /// callers window it themselves.
    pub async fn list_hosts(&self, filter: &HostFilter) -> Result<Value, ApiError> {
        self.get(&["api", "v0", "hosts"], &filter.to_params()).await
    }

    pub async fn get_host_metrics(
        &self,
        host_id: &str,
        name: &str,
        from: i64,
        to: i64,
    ) -> Result<Value, ApiError> {
        let params = QueryParams::new()
            .with("name", name)
            .with("from", from)
            .with("to", to);
        self.get(&["api", "v0", "hosts", host_id, "metrics"], &params)
            .await
    }

    // ── Services ──

    pub async fn list_services(&self) -> Result<Value, ApiError> {
        self.get(&["api", "v0", "services"], &QueryParams::new())
            .await
    }

    pub async fn get_service_metrics(
        &self,
        service_name: &str,
        name: &str,
        from: i64,
        to: i64,
    ) -> Result<Value, ApiError> {
        let params = QueryParams::new()
            .with("name", name)
            .with("from", from)
            .with("to", to);
        self.get(&["api", "v0", "services", service_name, "metrics"], &params)
            .await
    }

    // ── Monitors ──

    pub async fn list_monitors(&self) -> Result<Value, ApiError> {
        self.get(&["api", "v0", "monitors"], &QueryParams::new())
            .await
    }

    pub async fn get_monitor(&self, monitor_id: &str) -> Result<Value, ApiError> {
        self.get(&["api", "v0", "monitors", monitor_id], &QueryParams::new())
            .await
    }

    // ── Traces / APM ──

    /// Search traces. The filter object is forwarded verbatim as the body.
    pub async fn list_traces(&self, filters: &Value) -> Result<Value, ApiError> {
        self.send(
            Method::POST,
            &["api", "v0", "traces"],
            &QueryParams::new(),
            Some(filters),
        )
        .await
    }

    pub async fn get_trace(&self, trace_id: &str) -> Result<TraceResponse, ApiError> {
        let raw = self
            .get(&["api", "v0", "traces", trace_id], &QueryParams::new())
            .await?;
        Ok(serde_json::from_value(raw)?)
    }

    pub async fn list_db_query_stats(&self, params: &QueryParams) -> Result<Value, ApiError> {
        self.get(&["api", "v0", "apm", "db-query-stats"], params)
            .await
    }

    // ── Transport ──

    async fn get(&self, segments: &[&str], params: &QueryParams) -> Result<Value, ApiError> {
        self.send(Method::GET, segments, params, None).await
    }

    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        params: &QueryParams,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = self.endpoint(segments, params)?;
        let cacheable = method == Method::GET;
        let key = CacheKey::new(method.as_str(), url.path(), params.pairs());

        if cacheable {
            if let Some(hit) = self.cache.get(&key) {
                debug!("Cache hit: {key}");
                return Ok(hit);
            }
            debug!("Cache miss: {key}");
        }

        debug!("Mackerel request: {method} {}", url.path());
        let start = Instant::now();

        let mut request = self
            .http
            .request(method, url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        debug!(
            "Mackerel response: HTTP {} in {:.2}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            warn!("Mackerel API returned HTTP {status} for {key}");
            return Err(ApiError::Http { status, body: text });
        }

        let value: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };
        trace!("Response body: {}", text.chars().take(200).collect::<String>());

        if cacheable {
            self.cache.set(key, value.clone());
        }
        Ok(value)
    }

    /// Join percent-encoded `segments` onto the base URL and append `params`.
    fn endpoint(&self, segments: &[&str], params: &QueryParams) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.pairs());
        }
        Ok(url)
    }
}

//! MCP server exposing the [Mackerel](https://mackerel.io/) monitoring API as
//! agent tools.
//!
//! Each upstream resource (alerts, dashboards, hosts, services, monitors,
//! traces, APM statistics) is wrapped in a [`Tool`](tools::core::Tool) and
//! served over the Model Context Protocol on stdio. Between the upstream and
//! the agent sits a bounded response pipeline:
//!
//! 1. a TTL cache in front of every idempotent read
//!    ([`api::cache::TtlCache`]),
//! 2. client-side windowing for collections the API returns whole
//!    ([`response::pagination`]),
//! 3. a trace span optimizer that ranks failing and slow spans first
//!    ([`response::spans`]),
//! 4. a governor that refuses payloads above a token budget and expands
//!    ambiguous 404s ([`response::governor`]).
//!
//! # Getting started
//!
//! ```ignore
//! use mackerel_mcp::prelude::*;
//!
//! let config = ServerConfig::new(std::env::var("MACKEREL_API_KEY")?);
//! let tools = mackerel_mcp::tools::build_tool_set(&config)?;
//! McpServer::new(tools).serve_stdio().await?;
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | [`MackerelClient`](api::MackerelClient), [`TtlCache`](api::TtlCache), [`ApiError`](api::ApiError) |
//! | [`response`] | Pagination, span optimizer, response governor, 404 diagnostics |
//! | [`tools`] | [`Tool`](tools::core::Tool) trait, [`ToolSet`](tools::core::ToolSet), one tool per endpoint |
//! | [`server`] | JSON-RPC 2.0 MCP loop |
//! | [`config`] | [`ServerConfig`](config::ServerConfig) |

pub mod api;
pub mod config;
pub mod prelude;
pub mod response;
pub mod server;
pub mod tools;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ── Schema generation ──────────────────────────────────────────────

/// Generate a JSON Schema `serde_json::Value` from a type that implements
/// `schemars::JsonSchema`. Used for every tool's `inputSchema`.
///
/// # Example
///
/// ```
/// use mackerel_mcp::json_schema_for;
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct GetAlertArgs {
///     alert_id: String,
///     #[serde(default)]
///     verbose: Option<bool>,
/// }
///
/// let schema = json_schema_for::<GetAlertArgs>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema["required"].as_array().unwrap().contains(&"alert_id".into()));
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

// ── Tool definitions ───────────────────────────────────────────────

/// A tool as advertised by `tools/list`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToolDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

impl ToolDef {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: description.into(),
            input_schema,
        }
    }

    /// Human-readable display name.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

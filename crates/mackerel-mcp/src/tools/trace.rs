//! Distributed tracing tools.
//!
//! `list_traces` forwards a typed search filter to the traces endpoint.
//! `get_trace` never returns the raw span list: it runs the trace through
//! the [`SpanOptimizer`](crate::response::SpanOptimizer) so the agent sees
//! failing and slow spans first, one page at a time.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ToolContext;
use super::core::{Tool, ToolFuture, parse_tool_args};
use crate::response::{DEFAULT_PAGE_SIZE, TraceQuery};
use crate::{ToolDef, json_schema_for};

// ── list_traces ────────────────────────────────────────────────────

/// Value data type of an attribute filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Int,
    Double,
    Bool,
}

/// Comparison operator. `string` supports EQ, NEQ, STARTS_WITH;
/// `int`/`double` support EQ, GT, GTE, LT, LTE; `bool` supports EQ, NEQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    StartsWith,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AttributeFilter {
    /// Attribute key.
    pub key: String,
    /// Attribute value as a string.
    pub value: String,
    #[serde(rename = "type")]
    pub value_type: AttributeType,
    pub operator: AttributeOperator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceSortColumn {
    Latency,
    StartAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Sort preferences. Upstream default is `START_AT` / `DESC`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TraceOrder {
    pub column: TraceSortColumn,
    pub direction: SortDirection,
}

/// Search filter for `POST /api/v0/traces`. Serialized as the request body.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListTracesArgs {
    /// Service name (`service.name` in OpenTelemetry semantic conventions).
    pub service_name: String,
    /// Start of the search window (Unix epoch seconds).
    #[schemars(range(min = 1))]
    pub from: i64,
    /// End of the search window (Unix epoch seconds).
    #[schemars(range(min = 1))]
    pub to: i64,
    /// Service namespace (`service.namespace`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_namespace: Option<String>,
    /// Environment (`deployment.environment` or
    /// `deployment.environment.name`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Filter by trace ID (32-digit hexadecimal string).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Filter by span name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_name: Option<String>,
    /// Version (`service.version`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Filter by issue fingerprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_fingerprint: Option<String>,
    /// Minimum latency in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub min_latency_millis: Option<f64>,
    /// Maximum latency in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub max_latency_millis: Option<f64>,
    /// Span attribute filter conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<AttributeFilter>>,
    /// Resource-level attribute filter conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_attributes: Option<Vec<AttributeFilter>>,
    /// Page number, starting from 1. Default is 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub page: Option<u32>,
    /// Items per page (1-100). Default is 20.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 100))]
    pub per_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<TraceOrder>,
}

/// `list_traces`: POST /api/v0/traces. Never cached.
pub struct ListTraces {
    ctx: Arc<ToolContext>,
}

impl ListTraces {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

impl Tool for ListTraces {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "list_traces",
            "Search traces for a service within a time window. Filter by \
             latency, span name, issue fingerprint, or span/resource \
             attributes. Returns trace summaries; use get_trace to inspect \
             the spans of one trace.\n\n\
             Example: list_traces(serviceName=\"api\", from=1609459200, \
             to=1609462800, minLatencyMillis=1000)",
            json_schema_for::<ListTracesArgs>(),
        )
        .with_title("List Traces")
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let args: ListTracesArgs = match parse_tool_args(arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };
            let ctx = &self.ctx;
            let body = match serde_json::to_value(&args) {
                Ok(b) => b,
                Err(e) => return ctx.governor.failure(&e),
            };
            ctx.governor.run(ctx.client.list_traces(&body)).await
        })
    }
}

// ── get_trace ──────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_limit() -> usize {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetTraceArgs {
    /// The ID of the trace to retrieve.
    pub trace_id: String,
    /// Include span attributes. Off by default to keep responses small.
    #[serde(default)]
    pub include_attributes: bool,
    /// Include span events. On by default since events carry exception
    /// details.
    #[serde(default = "default_true")]
    pub include_events: bool,
    /// Only return spans whose duration (ms) is at least this value.
    /// `duration` is accepted as an alias.
    #[serde(default, alias = "duration")]
    #[schemars(range(min = 0))]
    pub min_duration: Option<f64>,
    /// Only return spans with an error status or exception event.
    #[serde(default)]
    pub error_spans_only: bool,
    /// Maximum number of spans per page (default: 20, max: 100).
    #[serde(default = "default_limit")]
    #[schemars(range(min = 1, max = 100))]
    pub limit: usize,
    /// Number of spans to skip (default: 0).
    #[serde(default)]
    pub offset: usize,
}

impl GetTraceArgs {
    fn query(&self) -> TraceQuery {
        TraceQuery {
            include_attributes: self.include_attributes,
            include_events: self.include_events,
            min_duration: self.min_duration,
            error_spans_only: self.error_spans_only,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// `get_trace`: GET /api/v0/traces/{traceId}, optimized.
pub struct GetTrace {
    ctx: Arc<ToolContext>,
}

impl GetTrace {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

impl Tool for GetTrace {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "get_trace",
            "Retrieve the spans of one trace, most important first: spans \
             with errors, then the slowest spans. Results are paged with \
             limit/offset; the summary reports total span count, whether \
             the page contains errors, and overall trace duration.\n\n\
             Examples:\n\
             - get_trace(traceId=\"abc\")\n\
             - get_trace(traceId=\"abc\", errorSpansOnly=true)\n\
             - get_trace(traceId=\"abc\", minDuration=100, includeAttributes=true)",
            json_schema_for::<GetTraceArgs>(),
        )
        .with_title("Get Trace")
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let args: GetTraceArgs = match parse_tool_args(arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };
            let ctx = &self.ctx;
            let trace = match ctx.client.get_trace(&args.trace_id).await {
                Ok(t) => t,
                Err(e) => return ctx.governor.failure(&e),
            };
            let optimized = ctx
                .optimizer
                .optimize(&args.trace_id, &trace.spans, &args.query());
            ctx.governor.accept(&optimized)
        })
    }
}

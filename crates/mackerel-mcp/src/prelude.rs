//! Convenience re-exports for embedding the server.
//!
//! ```ignore
//! use mackerel_mcp::prelude::*;
//! ```
//!
//! Covers configuration, the API client, the tool registry, and the
//! response pipeline. Endpoint-specific argument types stay in their
//! `tools::*` modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{ToolDef, json_schema_for};

// ── Configuration and transport ─────────────────────────────────────
pub use crate::api::{ApiError, HostFilter, MackerelClient, QueryParams, TtlCache};
pub use crate::config::ServerConfig;
pub use crate::server::McpServer;

// ── Response pipeline ───────────────────────────────────────────────
pub use crate::response::{
    CallToolResult, Content, ErrorEventRule, PageInfo, ResponseBudget, ResponseGovernor,
    SpanOptimizer, TraceQuery,
};

// ── Tools ───────────────────────────────────────────────────────────
pub use crate::tools::{Tool, ToolContext, ToolFuture, ToolSet, build_tool_set, parse_tool_args};

//! Host tools.
//!
//! The hosts endpoint has no server-side paging, so `list_hosts` fetches the
//! filtered set once (cached) and windows it locally.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ToolContext;
use super::core::{Tool, ToolFuture, parse_tool_args};
use crate::api::HostFilter;
use crate::response::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MetricsResource, paginate};
use crate::{ToolDef, json_schema_for};

fn default_limit() -> usize {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListHostsArgs {
    /// Service name.
    #[serde(default)]
    pub service: Option<String>,
    /// Role names in the service. Hosts belonging to any listed role are
    /// returned. Ignored unless `service` is set.
    #[serde(default)]
    pub role: Vec<String>,
    /// Host name.
    #[serde(default)]
    pub name: Option<String>,
    /// Host statuses to include. Defaults upstream to `working` and
    /// `standby`.
    #[serde(default)]
    pub status: Vec<String>,
    /// Organization-unique identifier registered with the host.
    #[serde(default)]
    pub custom_identifier: Option<String>,
    /// Maximum number of hosts to return (default: 20, max: 100).
    #[serde(default = "default_limit")]
    #[schemars(range(min = 1, max = 100))]
    pub limit: usize,
    /// Number of hosts to skip (default: 0).
    #[serde(default)]
    pub offset: usize,
}

impl ListHostsArgs {
    fn filter(&self) -> HostFilter {
        HostFilter {
            service: self.service.clone(),
            roles: self.role.clone(),
            name: self.name.clone(),
            statuses: self.status.clone(),
            custom_identifier: self.custom_identifier.clone(),
        }
    }
}

#[derive(Serialize)]
struct HostPage<'a> {
    hosts: &'a [Value],
}

/// `list_hosts`: GET /api/v0/hosts, windowed by `limit`/`offset`.
pub struct ListHosts {
    ctx: Arc<ToolContext>,
}

impl ListHosts {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

impl Tool for ListHosts {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "list_hosts",
            "Retrieve hosts from Mackerel, optionally filtered by service, \
             role, name, status, or custom identifier. Results are paged with \
             limit (default 20, max 100) and offset.\n\n\
             Examples:\n\
             - list_hosts()\n\
             - list_hosts(service=\"web\", role=[\"app\"])\n\
             - list_hosts(status=[\"working\", \"standby\"], offset=20)",
            json_schema_for::<ListHostsArgs>(),
        )
        .with_title("List Hosts")
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let args: ListHostsArgs = match parse_tool_args(arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };
            let ctx = &self.ctx;
            let raw = match ctx.client.list_hosts(&args.filter()).await {
                Ok(v) => v,
                Err(e) => return ctx.governor.failure(&e),
            };
            let hosts = raw
                .get("hosts")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let limit = args.limit.clamp(1, MAX_PAGE_SIZE);
            ctx.governor.accept(&HostPage {
                hosts: paginate(hosts, limit, args.offset),
            })
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetHostMetricsArgs {
    /// Host ID.
    pub host_id: String,
    /// Metric name (`loadavg5`, `cpu.user.percentage`, ...).
    pub name: String,
    /// Start of the period (Unix epoch seconds).
    pub from: i64,
    /// End of the period (Unix epoch seconds).
    pub to: i64,
}

/// `get_host_metrics`: GET /api/v0/hosts/{hostId}/metrics.
pub struct GetHostMetrics {
    ctx: Arc<ToolContext>,
}

impl GetHostMetrics {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

impl Tool for GetHostMetrics {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "get_host_metrics",
            "Retrieve time-series values of one metric for a host over a time \
             range. Use list_hosts to find host IDs.\n\n\
             Example: get_host_metrics(hostId=\"abc\", name=\"loadavg5\", \
             from=1609459200, to=1609462800)",
            json_schema_for::<GetHostMetricsArgs>(),
        )
        .with_title("Get Host Metrics")
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let args: GetHostMetricsArgs = match parse_tool_args(arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };
            let ctx = &self.ctx;
            ctx.governor
                .run_metrics(
                    MetricsResource::Host,
                    ctx.client
                        .get_host_metrics(&args.host_id, &args.name, args.from, args.to),
                )
                .await
        })
    }
}

//! APM statistics tools.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use super::ToolContext;
use super::core::{Tool, ToolFuture, parse_tool_args};
use super::trace::SortDirection;
use crate::api::QueryParams;
use crate::{ToolDef, json_schema_for};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DbQueryOrderColumn {
    /// Total latency.
    Sum,
    /// Average latency.
    Average,
    /// 95th percentile latency.
    P95,
    /// Execution count.
    ExecutionCount,
}

impl DbQueryOrderColumn {
    pub fn as_str(self) -> &'static str {
        match self {
            DbQueryOrderColumn::Sum => "SUM",
            DbQueryOrderColumn::Average => "AVERAGE",
            DbQueryOrderColumn::P95 => "P95",
            DbQueryOrderColumn::ExecutionCount => "EXECUTION_COUNT",
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListDbQueryStatsArgs {
    /// Service name (`service.name` in OpenTelemetry semantic conventions).
    pub service_name: String,
    /// Start time (Unix epoch seconds). At most 30 minutes before `to`.
    #[schemars(range(min = 1))]
    pub from: i64,
    /// End time (Unix epoch seconds). At most 30 minutes after `from`.
    #[schemars(range(min = 1))]
    pub to: i64,
    /// Service namespace (`service.namespace`).
    #[serde(default)]
    pub service_namespace: Option<String>,
    /// Environment (`deployment.environment` or
    /// `deployment.environment.name`).
    #[serde(default)]
    pub environment: Option<String>,
    /// Version (`service.version`).
    #[serde(default)]
    pub version: Option<String>,
    /// Partial match on the SQL text (`db.query.text` or `db.statement`).
    #[serde(default)]
    pub query: Option<String>,
    /// Sort column. Default is `P95`.
    #[serde(default)]
    pub order_column: Option<DbQueryOrderColumn>,
    /// Sort order. Default is `DESC`.
    #[serde(default)]
    pub order_direction: Option<SortDirection>,
    /// Page number, starting from 1.
    #[serde(default)]
    #[schemars(range(min = 1))]
    pub page: Option<u32>,
    /// Items per page (1-100). Default is 20.
    #[serde(default)]
    #[schemars(range(min = 1, max = 100))]
    pub per_page: Option<u32>,
}

impl ListDbQueryStatsArgs {
    fn to_params(&self) -> QueryParams {
        QueryParams::new()
            .with("serviceName", &self.service_name)
            .with("from", self.from)
            .with("to", self.to)
            .with_opt("serviceNamespace", self.service_namespace.as_deref())
            .with_opt("environment", self.environment.as_deref())
            .with_opt("version", self.version.as_deref())
            .with_opt("query", self.query.as_deref())
            .with_opt("orderColumn", self.order_column.map(DbQueryOrderColumn::as_str))
            .with_opt(
                "orderDirection",
                self.order_direction.map(SortDirection::as_str),
            )
            .with_opt("page", self.page)
            .with_opt("perPage", self.per_page)
    }
}

/// `list_db_query_stats`: GET /api/v0/apm/db-query-stats.
pub struct ListDbQueryStats {
    ctx: Arc<ToolContext>,
}

impl ListDbQueryStats {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

impl Tool for ListDbQueryStats {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "list_db_query_stats",
            "Retrieve database query statistics (latency, execution count) \
             for a service, collected from APM traces. The time range is \
             limited to 30 minutes. Use this tool to find slow or frequent \
             queries.\n\n\
             Example: list_db_query_stats(serviceName=\"api\", \
             from=1609459200, to=1609461000, orderColumn=\"SUM\")",
            json_schema_for::<ListDbQueryStatsArgs>(),
        )
        .with_title("List DB Query Stats")
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let args: ListDbQueryStatsArgs = match parse_tool_args(arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };
            let ctx = &self.ctx;
            ctx.governor
                .run(ctx.client.list_db_query_stats(&args.to_params()))
                .await
        })
    }
}

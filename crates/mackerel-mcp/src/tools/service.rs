//! Service tools.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use super::core::{Tool, ToolFuture, parse_tool_args};
use super::{NoArgs, ToolContext};
use crate::response::MetricsResource;
use crate::{ToolDef, json_schema_for};

/// `list_services`: GET /api/v0/services.
pub struct ListServices {
    ctx: Arc<ToolContext>,
}

impl ListServices {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

impl Tool for ListServices {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "list_services",
            "Retrieve all services registered in Mackerel, with their roles.",
            json_schema_for::<NoArgs>(),
        )
        .with_title("List Services")
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            if let Err(e) = parse_tool_args::<NoArgs>(arguments) {
                return e;
            }
            let ctx = &self.ctx;
            ctx.governor.run(ctx.client.list_services()).await
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetServiceMetricsArgs {
    /// Service name.
    pub service_name: String,
    /// Metric name.
    pub name: String,
    /// Start of the period (Unix epoch seconds).
    pub from: i64,
    /// End of the period (Unix epoch seconds).
    pub to: i64,
}

/// `get_service_metrics`: GET /api/v0/services/{serviceName}/metrics.
pub struct GetServiceMetrics {
    ctx: Arc<ToolContext>,
}

impl GetServiceMetrics {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

impl Tool for GetServiceMetrics {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "get_service_metrics",
            "Retrieve time-series values of one service metric over a time \
             range. Use list_services to find service names.\n\n\
             Example: get_service_metrics(serviceName=\"web\", \
             name=\"response_time\", from=1609459200, to=1609462800)",
            json_schema_for::<GetServiceMetricsArgs>(),
        )
        .with_title("Get Service Metrics")
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let args: GetServiceMetricsArgs = match parse_tool_args(arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };
            let ctx = &self.ctx;
            ctx.governor
                .run_metrics(
                    MetricsResource::Service,
                    ctx.client.get_service_metrics(
                        &args.service_name,
                        &args.name,
                        args.from,
                        args.to,
                    ),
                )
                .await
        })
    }
}

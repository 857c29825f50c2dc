//! Monitor tools.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use super::core::{Tool, ToolFuture, parse_tool_args};
use super::{NoArgs, ToolContext};
use crate::{ToolDef, json_schema_for};

/// `list_monitors`: GET /api/v0/monitors.
pub struct ListMonitors {
    ctx: Arc<ToolContext>,
}

impl ListMonitors {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

impl Tool for ListMonitors {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "list_monitors",
            "Retrieve all monitor configurations (host metric, connectivity, \
             service metric, external HTTP, expression, anomaly detection).",
            json_schema_for::<NoArgs>(),
        )
        .with_title("List Monitors")
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            if let Err(e) = parse_tool_args::<NoArgs>(arguments) {
                return e;
            }
            let ctx = &self.ctx;
            ctx.governor.run(ctx.client.list_monitors()).await
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetMonitorArgs {
    /// The ID of the monitor to retrieve.
    pub monitor_id: String,
}

/// `get_monitor`: GET /api/v0/monitors/{monitorId}.
pub struct GetMonitor {
    ctx: Arc<ToolContext>,
}

impl GetMonitor {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

impl Tool for GetMonitor {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "get_monitor",
            "Retrieve one monitor configuration by ID, e.g. to see the \
             thresholds behind an alert.",
            json_schema_for::<GetMonitorArgs>(),
        )
        .with_title("Get Monitor")
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let args: GetMonitorArgs = match parse_tool_args(arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };
            let ctx = &self.ctx;
            ctx.governor.run(ctx.client.get_monitor(&args.monitor_id)).await
        })
    }
}

//! Dashboard tools.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::core::{Tool, ToolFuture, parse_tool_args};
use super::{NoArgs, ToolContext};
use crate::{ToolDef, json_schema_for};

/// `list_dashboards`: GET /api/v0/dashboards.
pub struct ListDashboards {
    ctx: Arc<ToolContext>,
}

impl ListDashboards {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

impl Tool for ListDashboards {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "list_dashboards",
            "Retrieve all dashboards from Mackerel, including the ID and \
             title of each.",
            json_schema_for::<NoArgs>(),
        )
        .with_title("List Dashboards")
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            if let Err(e) = parse_tool_args::<NoArgs>(arguments) {
                return e;
            }
            let ctx = &self.ctx;
            ctx.governor.run(ctx.client.list_dashboards()).await
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetDashboardArgs {
    /// The ID of the dashboard to retrieve.
    pub dashboard_id: String,
}

/// `get_dashboard`: GET /api/v0/dashboards/{dashboardId}.
pub struct GetDashboard {
    ctx: Arc<ToolContext>,
}

impl GetDashboard {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

impl Tool for GetDashboard {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "get_dashboard",
            "Retrieve a dashboard by ID, including its widget definitions. \
             Use list_dashboards to find IDs.",
            json_schema_for::<GetDashboardArgs>(),
        )
        .with_title("Get Dashboard")
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let args: GetDashboardArgs = match parse_tool_args(arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };
            let ctx = &self.ctx;
            ctx.governor
                .run(ctx.client.get_dashboard(&args.dashboard_id))
                .await
        })
    }
}

/// Full replacement definition of a dashboard.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardBody {
    /// Dashboard name.
    pub title: String,
    /// Dashboard notes.
    pub memo: String,
    /// Dashboard URL path.
    pub url_path: String,
    /// Widget objects (`graph`, `value`, `markdown`, `alertStatus`) as
    /// returned by get_dashboard. Each carries `type`, `title`, and `layout`
    /// (`x`, `y`, `width`, `height`).
    pub widgets: Vec<Value>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDashboardArgs {
    /// The ID of the dashboard to update.
    pub dashboard_id: String,
    #[serde(flatten)]
    pub body: DashboardBody,
}

/// `update_dashboard`: PUT /api/v0/dashboards/{dashboardId}. Never cached.
pub struct UpdateDashboard {
    ctx: Arc<ToolContext>,
}

impl UpdateDashboard {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

impl Tool for UpdateDashboard {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "update_dashboard",
            "Replace a dashboard's title, memo, URL path, and widgets. The \
             widget list replaces the existing one entirely, so fetch the \
             dashboard with get_dashboard first and send back every widget \
             you want to keep.",
            json_schema_for::<UpdateDashboardArgs>(),
        )
        .with_title("Update Dashboard")
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let args: UpdateDashboardArgs = match parse_tool_args(arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };
            let body = match serde_json::to_value(&args.body) {
                Ok(b) => b,
                Err(e) => return self.ctx.governor.failure(&e),
            };
            let ctx = &self.ctx;
            ctx.governor
                .run(ctx.client.update_dashboard(&args.dashboard_id, &body))
                .await
        })
    }
}

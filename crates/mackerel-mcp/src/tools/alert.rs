//! Alert tools.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use super::ToolContext;
use super::core::{Tool, ToolFuture, parse_tool_args};
use crate::{ToolDef, json_schema_for};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListAlertsArgs {
    /// Whether or not to get resolved alerts. If true, resolved alerts as
    /// well as open alerts are retrieved.
    #[serde(default)]
    pub with_closed: Option<bool>,
    /// If specified, alerts older than the alert with this ID are retrieved.
    #[serde(default)]
    pub next_id: Option<String>,
    /// The maximum number of alerts to retrieve (1-100). When omitted, up to
    /// 100 alerts are retrieved.
    #[serde(default)]
    #[schemars(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

/// `list_alerts`: GET /api/v0/alerts.
pub struct ListAlerts {
    ctx: Arc<ToolContext>,
}

impl ListAlerts {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

impl Tool for ListAlerts {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "list_alerts",
            "Retrieve alerts from Mackerel.\n\n\
             Use this tool to check currently active alerts, or pass \
             withClosed=true to include resolved ones. Page through older \
             alerts with the nextId returned by the previous call.\n\n\
             Examples:\n\
             - list_alerts()\n\
             - list_alerts(withClosed=true, limit=20)",
            json_schema_for::<ListAlertsArgs>(),
        )
        .with_title("List Alerts")
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let args: ListAlertsArgs = match parse_tool_args(arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };
            let ctx = &self.ctx;
            ctx.governor
                .run(ctx.client.list_alerts(
                    args.with_closed,
                    args.next_id.as_deref(),
                    args.limit,
                ))
                .await
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetAlertArgs {
    /// The ID of the alert to retrieve.
    pub alert_id: String,
}

/// `get_alert`: GET /api/v0/alerts/{alertId}.
pub struct GetAlert {
    ctx: Arc<ToolContext>,
}

impl GetAlert {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

impl Tool for GetAlert {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "get_alert",
            "Retrieve a specific alert by ID from Mackerel. Use this tool to \
             investigate a particular alert.\n\n\
             Example: get_alert(alertId=\"3Yr\")",
            json_schema_for::<GetAlertArgs>(),
        )
        .with_title("Get Alert")
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let args: GetAlertArgs = match parse_tool_args(arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };
            let ctx = &self.ctx;
            ctx.governor.run(ctx.client.get_alert(&args.alert_id)).await
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetAlertLogsArgs {
    /// The ID of the alert to retrieve logs for.
    pub alert_id: String,
    /// If specified, alert logs older than this ID are retrieved.
    #[serde(default)]
    pub next_id: Option<String>,
    /// The maximum number of logs to retrieve (1-100). When omitted, up to
    /// 100 logs are retrieved.
    #[serde(default)]
    #[schemars(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

/// `get_alert_logs`: GET /api/v0/alerts/{alertId}/logs.
pub struct GetAlertLogs {
    ctx: Arc<ToolContext>,
}

impl GetAlertLogs {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

impl Tool for GetAlertLogs {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "get_alert_logs",
            "Retrieve the status change history of a specific alert. Use this \
             tool to investigate alert transitions and their reasons.\n\n\
             Example: get_alert_logs(alertId=\"3Yr\")",
            json_schema_for::<GetAlertLogsArgs>(),
        )
        .with_title("Get Alert Logs")
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let args: GetAlertLogsArgs = match parse_tool_args(arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };
            let ctx = &self.ctx;
            ctx.governor
                .run(ctx.client.get_alert_logs(
                    &args.alert_id,
                    args.next_id.as_deref(),
                    args.limit,
                ))
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_alerts_args_are_optional() {
        let args: ListAlertsArgs = serde_json::from_value(json!({})).unwrap();
        assert!(args.with_closed.is_none());
        assert!(args.next_id.is_none());
        assert!(args.limit.is_none());
    }

    #[test]
    fn list_alerts_schema_bounds_limit() {
        let schema = json_schema_for::<ListAlertsArgs>();
        let validator = jsonschema::validator_for(&schema).unwrap();
        assert!(validator.is_valid(&json!({"limit": 100})));
        assert!(!validator.is_valid(&json!({"limit": 101})));
        assert!(!validator.is_valid(&json!({"limit": 0})));
        assert!(validator.is_valid(&json!({"withClosed": true, "nextId": "abc"})));
    }

    #[test]
    fn get_alert_logs_requires_alert_id() {
        let schema = json_schema_for::<GetAlertLogsArgs>();
        let validator = jsonschema::validator_for(&schema).unwrap();
        assert!(!validator.is_valid(&json!({"limit": 5})));
        assert!(validator.is_valid(&json!({"alertId": "3Yr"})));
    }
}

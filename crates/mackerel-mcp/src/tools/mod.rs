//! Mackerel tools exposed over MCP.
//!
//! Each upstream operation is a [`Tool`] implementor holding a shared
//! [`ToolContext`] (client, governor, span optimizer). Every result flows
//! through the [`ResponseGovernor`], so no tool can return more than the
//! configured token budget.
//!
//! # Submodules
//!
//! - [`core`]: [`Tool`] trait, [`ToolSet`], argument parsing and validation.
//! - [`alert`]: `list_alerts`, `get_alert`, `get_alert_logs`.
//! - [`dashboard`]: `list_dashboards`, `get_dashboard`, `update_dashboard`.
//! - [`host`]: `list_hosts` (windowed client-side), `get_host_metrics`.
//! - [`service`]: `list_services`, `get_service_metrics`.
//! - [`monitor`]: `list_monitors`, `get_monitor`.
//! - [`trace`]: `list_traces`, `get_trace` (shaped by the span optimizer).
//! - [`apm`]: `list_db_query_stats`.

pub mod alert;
pub mod apm;
pub mod core;
pub mod dashboard;
pub mod host;
pub mod monitor;
pub mod service;
pub mod trace;

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;

use crate::api::MackerelClient;
use crate::config::ServerConfig;
use crate::response::{ResponseGovernor, SpanOptimizer};

pub use core::{Tool, ToolFuture, ToolSet, parse_tool_args, validate_tool_arguments};

/// Shared state every tool reads from.
#[derive(Debug)]
pub struct ToolContext {
    pub client: MackerelClient,
    pub governor: ResponseGovernor,
    pub optimizer: SpanOptimizer,
}

impl ToolContext {
    pub fn new(client: MackerelClient, governor: ResponseGovernor, optimizer: SpanOptimizer) -> Self {
        Self {
            client,
            governor,
            optimizer,
        }
    }

    /// Build the client, governor, and optimizer described by `config`.
    pub fn from_config(config: &ServerConfig) -> Result<Self, String> {
        Ok(Self::new(
            config.build_client()?,
            ResponseGovernor::new(config.budget),
            SpanOptimizer::new(config.error_event_rule),
        ))
    }
}

/// Arguments for tools that take none.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoArgs {}

/// Register every Mackerel tool against `ctx`.
pub fn register_all(tools: ToolSet, ctx: &Arc<ToolContext>) -> ToolSet {
    tools
        .with(alert::ListAlerts::new(ctx.clone()))
        .with(alert::GetAlert::new(ctx.clone()))
        .with(alert::GetAlertLogs::new(ctx.clone()))
        .with(dashboard::ListDashboards::new(ctx.clone()))
        .with(dashboard::GetDashboard::new(ctx.clone()))
        .with(dashboard::UpdateDashboard::new(ctx.clone()))
        .with(host::ListHosts::new(ctx.clone()))
        .with(host::GetHostMetrics::new(ctx.clone()))
        .with(service::ListServices::new(ctx.clone()))
        .with(service::GetServiceMetrics::new(ctx.clone()))
        .with(monitor::ListMonitors::new(ctx.clone()))
        .with(monitor::GetMonitor::new(ctx.clone()))
        .with(trace::ListTraces::new(ctx.clone()))
        .with(trace::GetTrace::new(ctx.clone()))
        .with(apm::ListDbQueryStats::new(ctx.clone()))
}

/// Build the complete tool set for `config`.
pub fn build_tool_set(config: &ServerConfig) -> Result<ToolSet, String> {
    let ctx = Arc::new(ToolContext::from_config(config)?);
    Ok(register_all(
        ToolSet::new().with_arg_validation(config.validate_args),
        &ctx,
    ))
}

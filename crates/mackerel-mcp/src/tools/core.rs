//! Tool abstraction for MCP `tools/call` dispatch.
//!
//! The [`Tool`] trait defines what every Mackerel tool provides: a static
//! definition (name, title, description, JSON schema) and an async
//! `execute` method producing a [`CallToolResult`]. Tools are collected into
//! a [`ToolSet`] which handles listing, argument validation, and dispatch.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, trace};

use crate::ToolDef;
use crate::response::CallToolResult;

/// Boxed future returned by [`Tool::execute`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = CallToolResult> + Send + 'a>>;

// ── Tool trait ─────────────────────────────────────────────────────

/// A tool an MCP client can invoke.
///
/// `execute` receives the `arguments` object from the request. Argument
/// problems are reported as error results starting with `Error:` rather
/// than panicking, so the agent can correct itself and retry.
pub trait Tool: Send + Sync {
    /// The definition advertised by `tools/list`.
    fn definition(&self) -> ToolDef;

    /// Execute the tool with the given arguments object.
    fn execute(&self, arguments: Value) -> ToolFuture<'_>;

    fn name(&self) -> String {
        self.definition().name
    }
}

// ── ToolSet ────────────────────────────────────────────────────────

/// Tools keyed by name. Iteration order (and so `tools/list` order) is
/// alphabetical.
pub struct ToolSet {
    tools: BTreeMap<String, Box<dyn Tool>>,
    /// Whether to validate arguments against the tool's JSON Schema before
    /// execution.
    validate_args: bool,
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSet")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("validate_args", &self.validate_args)
            .finish()
    }
}

impl ToolSet {
    /// Create an empty tool set with argument validation enabled.
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
            validate_args: true,
        }
    }

    pub fn with_arg_validation(mut self, enabled: bool) -> Self {
        self.validate_args = enabled;
        self
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.name(), Box::new(tool));
    }

    /// Register a tool (builder pattern).
    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    /// All definitions, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDef> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool call by name.
    ///
    /// Unknown tools and invalid arguments produce error results; they are
    /// tool-level failures, not protocol errors.
    pub async fn execute(&self, name: &str, arguments: Value) -> CallToolResult {
        let Some(tool) = self.tools.get(name) else {
            return CallToolResult::error(format!("Error: unknown tool '{name}'"));
        };

        if self.validate_args
            && let Some(error) = validate_tool_arguments(tool.as_ref(), &arguments)
        {
            debug!("Tool {name} rejected arguments");
            return CallToolResult::error(error);
        }

        log_tool_call(name, &arguments);
        let start = std::time::Instant::now();

        let result = tool.execute(arguments).await;

        debug!(
            "Tool {name} completed in {:.0}ms (error={})",
            start.elapsed().as_secs_f64() * 1000.0,
            result.is_error()
        );
        trace!(
            "Tool {name} result preview: {}",
            result.first_text().chars().take(300).collect::<String>()
        );

        result
    }
}

impl Default for ToolSet {
    fn default() -> Self {
        Self::new()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Validate arguments against the tool's declared JSON Schema.
///
/// Returns `None` if valid, or an error string listing each violation.
pub fn validate_tool_arguments(tool: &dyn Tool, arguments: &Value) -> Option<String> {
    let schema = tool.definition().input_schema;

    // An invalid schema is our bug, not the caller's; skip validation.
    let validator = jsonschema::validator_for(&schema).ok()?;

    let errors: Vec<String> = validator
        .iter_errors(arguments)
        .map(|e| format!("  - {}: {e}", e.instance_path()))
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(format!(
            "Error: argument validation failed for tool '{}':\n{}\n\
             Please fix the arguments and try again.",
            tool.name(),
            errors.join("\n")
        ))
    }
}

/// Log a tool call at INFO level with a truncated preview of arguments.
pub fn log_tool_call(name: &str, arguments: &Value) {
    let rendered = arguments.to_string();
    let args_preview: String = rendered.chars().take(120).collect();
    info!(
        "[tool] {}({args_preview}{})",
        name,
        if rendered.len() > 120 { "..." } else { "" }
    );
    trace!("[tool] {name} arguments: {rendered}");
}

/// Parse an arguments object into a typed struct.
///
/// The error is a ready-to-return [`CallToolResult`]:
///
/// ```ignore
/// let args: ListAlertsArgs = match parse_tool_args(arguments) {
///     Ok(a) => a,
///     Err(e) => return e,
/// };
/// ```
pub fn parse_tool_args<T: DeserializeOwned>(arguments: Value) -> Result<T, CallToolResult> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| {
        CallToolResult::error(format!(
            "Error: invalid tool arguments: {e}. \
             Please provide arguments matching the tool's input schema."
        ))
    })
}

//! Response size governor.
//!
//! Every tool result passes through [`ResponseGovernor`] before it reaches
//! the agent. Successful payloads are serialized to JSON and their token
//! cost estimated with a fixed chars-per-token ratio; anything above the
//! budget is replaced by a refusal that tells the agent how to ask for less.
//! Failures become error results carrying the upstream message.
//!
//! The estimate is a heuristic over serialized characters, not a tokenizer.

use std::fmt::Display;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::diagnostics::{MetricsResource, explain_not_found};
use crate::api::ApiError;

// ── Tool result wire types ─────────────────────────────────────────

/// One content block of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

/// Outcome of a tool invocation, in MCP `CallToolResult` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError", default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl CallToolResult {
    /// A successful result with a single text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: None,
        }
    }

    /// An error result with a single text block.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: Some(true),
        }
    }

    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }

    /// Text of the first content block.
    pub fn first_text(&self) -> &str {
        match self.content.first() {
            Some(Content::Text { text }) => text,
            None => "",
        }
    }
}

// ── Budget ─────────────────────────────────────────────────────────

/// Token ceiling for a single tool result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseBudget {
    /// Maximum estimated tokens. Default: 25,000.
    pub max_tokens: usize,
    /// Serialized characters per estimated token. Default: 4.0.
    pub chars_per_token: f64,
}

const DEFAULT_CHARS_PER_TOKEN: f64 = 4.0;

impl Default for ResponseBudget {
    fn default() -> Self {
        Self {
            max_tokens: 25_000,
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
        }
    }
}

impl ResponseBudget {
    pub fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            ..Default::default()
        }
    }

    /// Set the estimation ratio. Only finite, positive values are usable;
    /// anything else falls back to the default of 4.0 when estimating.
    pub fn with_chars_per_token(mut self, chars_per_token: f64) -> Self {
        self.chars_per_token = chars_per_token;
        self
    }

    /// Estimated token cost of `text`, rounded up.
    pub fn estimate_tokens(&self, text: &str) -> usize {
        let ratio = if self.chars_per_token.is_finite() && self.chars_per_token > 0.0 {
            self.chars_per_token
        } else {
            DEFAULT_CHARS_PER_TOKEN
        };
        (text.chars().count() as f64 / ratio).ceil() as usize
    }
}

// ── Governor ───────────────────────────────────────────────────────

/// Converts fetch outcomes into bounded tool results. Never retries.
#[derive(Debug, Clone, Default)]
pub struct ResponseGovernor {
    budget: ResponseBudget,
}

impl ResponseGovernor {
    pub fn new(budget: ResponseBudget) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> &ResponseBudget {
        &self.budget
    }

    /// Await `operation` and render its outcome.
    pub async fn run<T, E, F>(&self, operation: F) -> CallToolResult
    where
        T: Serialize,
        E: Display,
        F: Future<Output = Result<T, E>>,
    {
        match operation.await {
            Ok(value) => self.accept(&value),
            Err(e) => self.failure(&e),
        }
    }

    /// Like [`run`](Self::run), but a 404 is expanded into a metrics
    /// diagnostic for `resource`.
    pub async fn run_metrics<T, F>(&self, resource: MetricsResource, operation: F) -> CallToolResult
    where
        T: Serialize,
        F: Future<Output = Result<T, ApiError>>,
    {
        match operation.await {
            Ok(value) => self.accept(&value),
            Err(e) => match explain_not_found(resource, &e) {
                Some(text) => {
                    debug!("Expanded 404 for {resource:?} metrics");
                    CallToolResult::error(text)
                }
                None => self.failure(&e),
            },
        }
    }

    /// Serialize `value` and enforce the budget.
    pub fn accept<T: Serialize + ?Sized>(&self, value: &T) -> CallToolResult {
        let text = match serde_json::to_string(value) {
            Ok(t) => t,
            Err(e) => return self.failure(&format!("failed to serialize response: {e}")),
        };

        let estimated = self.budget.estimate_tokens(&text);
        if estimated > self.budget.max_tokens {
            warn!(
                "Refusing response: ~{} tokens exceeds budget of {}",
                estimated, self.budget.max_tokens
            );
            return CallToolResult::error(refusal_message(estimated, self.budget.max_tokens));
        }

        debug!("Response accepted: {} chars, ~{} tokens", text.len(), estimated);
        CallToolResult::text(text)
    }

    /// Render a failure generically.
    pub fn failure(&self, err: &dyn Display) -> CallToolResult {
        debug!("Tool failure: {err}");
        CallToolResult::error(format!("Error occurred: {err}"))
    }
}

fn refusal_message(estimated: usize, max: usize) -> String {
    format!(
        "Response too large: estimated {} tokens exceeds the maximum of {} tokens.\n\n\
         To reduce the response size:\n\
         - Lower the limit parameter to return fewer items per call\n\
         - Use pagination (offset, or nextId where supported) to fetch the rest in later calls\n\
         - Add filters (service, role, status, time range) to narrow the result",
        group_thousands(estimated),
        group_thousands(max)
    )
}

/// Format `n` with comma thousands separators.
fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

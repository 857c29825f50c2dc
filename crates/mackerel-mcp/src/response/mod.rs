//! The bounded response pipeline between upstream data and the agent.
//!
//! - [`pagination`]: offset/limit windowing and [`PageInfo`] metadata.
//! - [`spans`]: the trace span optimizer: project, filter, prioritize,
//!   paginate.
//! - [`governor`]: token-budget enforcement and the [`CallToolResult`]
//!   wire type.
//! - [`diagnostics`]: expanded 404 text for the metrics endpoints.

pub mod diagnostics;
pub mod governor;
pub mod pagination;
pub mod spans;

pub use diagnostics::MetricsResource;
pub use governor::{CallToolResult, Content, ResponseBudget, ResponseGovernor};
pub use pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageInfo, paginate};
pub use spans::{ErrorEventRule, SpanOptimizer, TraceQuery};

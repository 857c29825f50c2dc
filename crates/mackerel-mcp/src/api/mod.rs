//! Upstream access: the Mackerel HTTP client, its response cache, and the
//! error type shared by every endpoint.

pub mod cache;
pub mod client;
pub mod error;

pub use cache::{CacheKey, Clock, ManualClock, SystemClock, TtlCache};
pub use client::{DEFAULT_BASE_URL, DEFAULT_CACHE_TTL, HostFilter, MackerelClient, QueryParams};
pub use error::ApiError;

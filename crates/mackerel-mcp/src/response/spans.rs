//! Trace span optimization: project, filter, prioritize, and paginate.
//!
//! A single trace can carry thousands of spans with large attribute maps.
//! [`SpanOptimizer`] turns the raw span list into a compact, most-useful-first
//! page: failing spans before healthy ones, slow spans before fast ones, so
//! that truncation by page size discards the least interesting spans first.
//!
//! The raw spans are only ever borrowed. Every [`OptimizedSpan`] is a new
//! projection referencing the original data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageInfo, paginate};

// ── Input types ────────────────────────────────────────────────────

/// A span as returned by the traces endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub span_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    pub name: String,
    /// Any JSON number; integer and fractional timestamps are both accepted.
    pub start_time: Number,
    pub end_time: Number,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<SpanEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SpanStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Value>,
}

impl Span {
    pub fn duration(&self) -> Number {
        elapsed(&self.start_time, &self.end_time)
    }
}

/// A recorded span event (exceptions, log points). Only `name` is
/// interpreted; every other field is passed through as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanEvent {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Span status. `code` is a string (`"OK"`, `"ERROR"`, `"UNSET"`) or the
/// numeric OTLP code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanStatus {
    #[serde(default)]
    pub code: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// OTLP `STATUS_CODE_ERROR`.
const OTLP_STATUS_ERROR: u64 = 2;

impl SpanStatus {
    fn is_error(&self) -> bool {
        match &self.code {
            Value::String(code) => code.eq_ignore_ascii_case("error"),
            Value::Number(code) => code.as_u64() == Some(OTLP_STATUS_ERROR),
            _ => false,
        }
    }

    fn has_message(&self) -> bool {
        self.message.as_deref().is_some_and(|m| !m.is_empty())
    }
}

/// Body of `GET /api/v0/traces/{traceId}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TraceResponse {
    #[serde(default)]
    pub spans: Vec<Span>,
}

// ── Output types ───────────────────────────────────────────────────

/// Compact projection of a [`Span`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedSpan<'a> {
    pub span_id: &'a str,
    pub name: &'a str,
    pub start_time: &'a Number,
    pub end_time: &'a Number,
    pub duration: Number,
    pub has_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<&'a [SpanEvent]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'a SpanStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSummary {
    /// Span count of the raw trace, before any filtering.
    pub total_spans: usize,
    /// Whether the returned page contains an error span.
    pub has_errors: bool,
    /// `max(endTime) - min(startTime)` over the raw trace.
    pub total_duration: Number,
    /// Computed against the filtered span count.
    pub page_info: PageInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedTrace<'a> {
    pub trace_id: &'a str,
    pub summary: TraceSummary,
    pub spans: Vec<OptimizedSpan<'a>>,
}

// ── Options ────────────────────────────────────────────────────────

/// Which span event names mark a span as failing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorEventRule {
    /// Event name contains `exception` (case-insensitive).
    #[default]
    ExceptionOnly,
    /// Event name contains `exception` or `error` (case-insensitive).
    ExceptionOrError,
}

impl ErrorEventRule {
    fn matches(self, event_name: &str) -> bool {
        let name = event_name.to_lowercase();
        match self {
            ErrorEventRule::ExceptionOnly => name.contains("exception"),
            ErrorEventRule::ExceptionOrError => {
                name.contains("exception") || name.contains("error")
            }
        }
    }
}

/// Per-call shaping options for one trace.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceQuery {
    pub include_attributes: bool,
    pub include_events: bool,
    /// Inclusive lower bound on span duration.
    pub min_duration: Option<f64>,
    pub error_spans_only: bool,
    pub limit: usize,
    pub offset: usize,
}

impl Default for TraceQuery {
    fn default() -> Self {
        Self {
            include_attributes: false,
            include_events: true,
            min_duration: None,
            error_spans_only: false,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

// ── Optimizer ──────────────────────────────────────────────────────

/// Shapes a raw trace into a bounded, prioritized page of spans.
#[derive(Debug, Clone, Copy)]
pub struct SpanOptimizer {
    pub error_event_rule: ErrorEventRule,
    pub max_page_size: usize,
}

impl Default for SpanOptimizer {
    fn default() -> Self {
        Self {
            error_event_rule: ErrorEventRule::default(),
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl SpanOptimizer {
    pub fn new(error_event_rule: ErrorEventRule) -> Self {
        Self {
            error_event_rule,
            ..Default::default()
        }
    }

    /// Whether a span is failing: an `error` status code, or an event whose
    /// name matches the configured [`ErrorEventRule`].
    pub fn has_error(&self, span: &Span) -> bool {
        if span.status.as_ref().is_some_and(SpanStatus::is_error) {
            return true;
        }
        span.events
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|e| self.error_event_rule.matches(&e.name))
    }

    /// Project a single span.
    pub fn project<'a>(&self, span: &'a Span, query: &TraceQuery) -> OptimizedSpan<'a> {
        OptimizedSpan {
            span_id: &span.span_id,
            name: &span.name,
            start_time: &span.start_time,
            end_time: &span.end_time,
            duration: span.duration(),
            has_error: self.has_error(span),
            attributes: if query.include_attributes {
                span.attributes.as_ref()
            } else {
                None
            },
            events: if query.include_events {
                span.events.as_deref()
            } else {
                None
            },
            // A bare "OK" on every span is noise.
            status: span
                .status
                .as_ref()
                .filter(|s| s.is_error() || s.has_message()),
        }
    }

    /// Run the full pipeline over one trace.
    pub fn optimize<'a>(
        &self,
        trace_id: &'a str,
        spans: &'a [Span],
        query: &TraceQuery,
    ) -> OptimizedTrace<'a> {
        let limit = query.limit.clamp(1, self.max_page_size.max(1));

        let mut candidates: Vec<OptimizedSpan<'a>> = spans
            .iter()
            .map(|s| self.project(s, query))
            .filter(|s| !query.error_spans_only || s.has_error)
            .filter(|s| query.min_duration.is_none_or(|min| as_f64(&s.duration) >= min))
            .collect();

        // Errors first, then longest first. Stable, so ties keep trace order.
        candidates.sort_by(|a, b| {
            b.has_error
                .cmp(&a.has_error)
                .then_with(|| as_f64(&b.duration).total_cmp(&as_f64(&a.duration)))
        });

        let page_info = PageInfo::new(candidates.len(), limit, query.offset);
        let page = paginate(&candidates, limit, query.offset).to_vec();

        let summary = TraceSummary {
            total_spans: spans.len(),
            has_errors: page.iter().any(|s| s.has_error),
            total_duration: total_duration(spans),
            page_info,
        };

        OptimizedTrace {
            trace_id,
            summary,
            spans: page,
        }
    }
}

fn total_duration(spans: &[Span]) -> Number {
    let start = spans
        .iter()
        .map(|s| &s.start_time)
        .min_by(|a, b| as_f64(a).total_cmp(&as_f64(b)));
    let end = spans
        .iter()
        .map(|s| &s.end_time)
        .max_by(|a, b| as_f64(a).total_cmp(&as_f64(b)));
    match (start, end) {
        (Some(start), Some(end)) => elapsed(start, end),
        _ => Number::from(0),
    }
}

fn as_f64(n: &Number) -> f64 {
    n.as_f64().unwrap_or(0.0)
}

/// `end - start`. Exact (saturating) when both are integers.
fn elapsed(start: &Number, end: &Number) -> Number {
    match (start.as_i64(), end.as_i64()) {
        (Some(start), Some(end)) => Number::from(end.saturating_sub(start)),
        _ => Number::from_f64(as_f64(end) - as_f64(start)).unwrap_or_else(|| Number::from(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn span(id: &str, start: i64, end: i64) -> Span {
        Span {
            span_id: id.into(),
            trace_id: Some("trace123".into()),
            name: format!("op {id}"),
            start_time: start.into(),
            end_time: end.into(),
            attributes: Some(json!({"http.method": "GET"})),
            events: Some(vec![]),
            status: Some(status("OK", None)),
            resource: None,
            scope: None,
        }
    }

    fn status(code: &str, message: Option<&str>) -> SpanStatus {
        SpanStatus {
            code: json!(code),
            message: message.map(str::to_string),
            extra: Map::new(),
        }
    }

    fn event(name: &str) -> SpanEvent {
        SpanEvent {
            name: name.into(),
            timestamp: Some(json!(0)),
            attributes: None,
            extra: Map::new(),
        }
    }

    /// Four spans with durations [500, 600, 30, 100]. Only span2 carries an
    /// exception event; span4 has an `error.occurred` event.
    fn sample_trace() -> Vec<Span> {
        let mut s1 = span("span1", 1_000, 1_500);
        s1.events = Some(vec![event("request.start")]);

        let mut s2 = span("span2", 1_200, 1_800);
        s2.events = Some(vec![event("exception")]);
        s2.status = Some(status("ERROR", Some("Database connection failed")));

        let s3 = span("span3", 1_050, 1_080);

        let mut s4 = span("span4", 1_900, 2_000);
        s4.events = Some(vec![event("error.occurred")]);
        s4.status = Some(status("UNSET", Some("Internal server error")));

        vec![s1, s2, s3, s4]
    }

    fn ids(trace: &OptimizedTrace<'_>) -> Vec<String> {
        trace.spans.iter().map(|s| s.span_id.to_string()).collect()
    }

    #[test]
    fn default_query_orders_errors_then_duration() {
        let spans = sample_trace();
        let out = SpanOptimizer::default().optimize("trace123", &spans, &TraceQuery::default());

        assert_eq!(ids(&out), ["span2", "span1", "span4", "span3"]);
        assert_eq!(out.summary.total_spans, 4);
        assert!(out.summary.has_errors);
        assert_eq!(out.summary.total_duration, Number::from(1_000));
        assert_eq!(out.summary.page_info.total_pages, 1);
        assert!(!out.summary.page_info.has_next_page);
    }

    #[test]
    fn limit_keeps_highest_value_spans() {
        let spans = sample_trace();
        let query = TraceQuery {
            limit: 2,
            ..Default::default()
        };
        let out = SpanOptimizer::default().optimize("trace123", &spans, &query);

        assert_eq!(ids(&out), ["span2", "span1"]);
        assert_eq!(out.spans[0].duration, Number::from(600));
        assert!(out.spans[0].has_error);
        assert_eq!(out.summary.page_info.total_pages, 2);
        assert!(out.summary.page_info.has_next_page);
    }

    #[test]
    fn error_spans_only_keeps_total_count() {
        let spans = sample_trace();
        let query = TraceQuery {
            error_spans_only: true,
            ..Default::default()
        };
        let out = SpanOptimizer::default().optimize("trace123", &spans, &query);

        assert_eq!(ids(&out), ["span2"]);
        assert_eq!(out.summary.total_spans, 4, "counted before filtering");
        assert_eq!(out.summary.page_info.total_pages, 1);
    }

    #[test]
    fn error_event_rule_widens_detection() {
        let spans = sample_trace();
        let optimizer = SpanOptimizer::new(ErrorEventRule::ExceptionOrError);
        let query = TraceQuery {
            error_spans_only: true,
            ..Default::default()
        };
        let out = optimizer.optimize("trace123", &spans, &query);
        assert_eq!(ids(&out), ["span2", "span4"]);
    }

    #[test]
    fn status_code_error_is_case_insensitive() {
        let optimizer = SpanOptimizer::default();
        for code in ["error", "ERROR", "Error"] {
            let mut s = span("s", 0, 10);
            s.status = Some(status(code, None));
            assert!(optimizer.has_error(&s), "code {code} should be an error");
        }
        assert!(!optimizer.has_error(&span("ok", 0, 10)));
    }

    #[test]
    fn exception_event_is_case_insensitive() {
        let mut s = span("s", 0, 10);
        s.events = Some(vec![event("RuntimeException")]);
        assert!(SpanOptimizer::default().has_error(&s));
    }

    #[test]
    fn min_duration_boundary_is_inclusive() {
        let spans = vec![span("at", 0, 100), span("below", 0, 99)];
        let query = TraceQuery {
            min_duration: Some(100.0),
            ..Default::default()
        };
        let out = SpanOptimizer::default().optimize("t", &spans, &query);
        assert_eq!(ids(&out), ["at"]);
        assert_eq!(out.summary.total_spans, 2);
    }

    #[test]
    fn min_duration_filters_sample() {
        let spans = sample_trace();
        let query = TraceQuery {
            min_duration: Some(500.0),
            ..Default::default()
        };
        let out = SpanOptimizer::default().optimize("trace123", &spans, &query);
        assert_eq!(ids(&out), ["span2", "span1"]);
    }

    #[test]
    fn offset_pages_through_filtered_set() {
        let spans = sample_trace();
        let query = TraceQuery {
            limit: 1,
            offset: 1,
            ..Default::default()
        };
        let out = SpanOptimizer::default().optimize("trace123", &spans, &query);

        assert_eq!(ids(&out), ["span1"]);
        assert!(!out.summary.has_errors, "only the returned page is inspected");
        let info = out.summary.page_info;
        assert_eq!((info.current_page, info.total_pages), (2, 4));
        assert!(info.has_next_page && info.has_prev_page);
    }

    #[test]
    fn offset_past_end_returns_empty_page() {
        let spans = sample_trace();
        let query = TraceQuery {
            limit: 10,
            offset: 100,
            ..Default::default()
        };
        let out = SpanOptimizer::default().optimize("trace123", &spans, &query);

        assert!(out.spans.is_empty());
        assert!(!out.summary.has_errors);
        assert_eq!(out.summary.page_info.current_page, 11);
        assert_eq!(out.summary.page_info.total_pages, 1);
    }

    #[test]
    fn limit_is_clamped_to_max_page_size() {
        let spans: Vec<Span> = (0..150).map(|i| span(&format!("s{i}"), 0, i)).collect();
        let query = TraceQuery {
            limit: 1_000,
            ..Default::default()
        };
        let out = SpanOptimizer::default().optimize("t", &spans, &query);
        assert_eq!(out.spans.len(), MAX_PAGE_SIZE);
    }

    #[test]
    fn attributes_and_events_follow_flags() {
        let spans = sample_trace();

        let defaults = SpanOptimizer::default().project(&spans[0], &TraceQuery::default());
        assert!(defaults.attributes.is_none());
        assert_eq!(defaults.events.map(<[SpanEvent]>::len), Some(1));

        let query = TraceQuery {
            include_attributes: true,
            include_events: false,
            ..Default::default()
        };
        let flipped = SpanOptimizer::default().project(&spans[0], &query);
        assert_eq!(flipped.attributes.unwrap()["http.method"], "GET");
        assert!(flipped.events.is_none());
    }

    #[test]
    fn bare_ok_status_is_omitted() {
        let spans = sample_trace();
        let optimizer = SpanOptimizer::default();
        let q = TraceQuery::default();

        assert!(optimizer.project(&spans[0], &q).status.is_none());
        let with_message = optimizer.project(&spans[1], &q);
        assert_eq!(
            with_message.status.and_then(|s| s.message.as_deref()),
            Some("Database connection failed")
        );
    }

    #[test]
    fn raw_spans_are_untouched() {
        let spans = sample_trace();
        let before = spans.clone();
        let _ = SpanOptimizer::default().optimize("trace123", &spans, &TraceQuery::default());
        assert_eq!(spans, before);
    }

    #[test]
    fn prioritization_holds_for_mixed_sets() {
        let mut spans = Vec::new();
        for i in 0..20i64 {
            let mut s = span(&format!("s{i}"), 0, (i * 37) % 101);
            if i % 3 == 0 {
                s.events = Some(vec![event("exception")]);
            }
            spans.push(s);
        }
        let query = TraceQuery {
            limit: 100,
            ..Default::default()
        };
        let out = SpanOptimizer::default().optimize("t", &spans, &query);

        assert!(out.spans[0].has_error);
        for pair in out.spans.windows(2) {
            assert!(pair[0].has_error >= pair[1].has_error);
            if pair[0].has_error == pair[1].has_error {
                assert!(as_f64(&pair[0].duration) >= as_f64(&pair[1].duration));
            }
        }
    }

    #[test]
    fn empty_trace() {
        let out = SpanOptimizer::default().optimize("t", &[], &TraceQuery::default());
        assert!(out.spans.is_empty());
        assert_eq!(out.summary.total_spans, 0);
        assert_eq!(out.summary.total_duration, Number::from(0));
        assert_eq!(out.summary.page_info.total_pages, 1);
    }

    #[test]
    fn serialized_shape() {
        let spans = sample_trace();
        let out = SpanOptimizer::default().optimize("trace123", &spans, &TraceQuery::default());
        let json = serde_json::to_value(&out).unwrap();

        assert_eq!(json["traceId"], "trace123");
        assert_eq!(json["summary"]["totalSpans"], 4);
        assert_eq!(json["summary"]["pageInfo"]["currentPage"], 1);
        let first = &json["spans"][0];
        assert_eq!(first["spanId"], "span2");
        assert_eq!(first["hasError"], true);
        assert!(first.get("attributes").is_none());
        assert_eq!(first["events"][0]["name"], "exception");
    }

    #[test]
    fn deserializes_upstream_payload() {
        let body = json!({
            "spans": [{
                "traceId": "trace123",
                "spanId": "span1",
                "name": "HTTP GET /api/users",
                "startTime": 1600000000000i64,
                "endTime": 1600000000500i64,
                "events": [{"name": "request.start", "timestamp": 1600000000100i64}],
                "status": {"code": "OK"},
                "resource": {"service": "user-service"}
            }]
        });
        let parsed: TraceResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.spans.len(), 1);
        assert_eq!(parsed.spans[0].duration(), Number::from(500));
    }

    #[test]
    fn fractional_times_are_accepted() {
        let body = json!({"spans": [
            {"spanId": "a", "name": "n", "startTime": 1000.25, "endTime": 1600.75},
            {"spanId": "b", "name": "n", "startTime": 1000, "endTime": 1100}
        ]});
        let parsed: TraceResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.spans[0].duration().as_f64(), Some(600.5));

        let out = SpanOptimizer::default().optimize("t", &parsed.spans, &TraceQuery::default());
        assert_eq!(ids(&out), ["a", "b"]);
        assert_eq!(out.summary.total_duration.as_f64(), Some(600.75));

        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["spans"][0]["startTime"], 1000.25);
        assert_eq!(json["spans"][1]["duration"], 100);
    }

    #[test]
    fn events_pass_through_as_received() {
        let body = json!({"spans": [{
            "spanId": "a", "name": "n", "startTime": 0, "endTime": 10,
            "events": [
                {"name": "exception", "time": 5, "droppedAttributesCount": 3},
                {"name": "log", "timestamp": "2024-01-01T00:00:00Z"}
            ]
        }]});
        let parsed: TraceResponse = serde_json::from_value(body).unwrap();
        let out = SpanOptimizer::default().optimize("t", &parsed.spans, &TraceQuery::default());
        assert!(out.spans[0].has_error);

        let json = serde_json::to_value(&out).unwrap();
        let events = &json["spans"][0]["events"];
        assert_eq!(events[0]["time"], 5);
        assert_eq!(events[0]["droppedAttributesCount"], 3);
        assert!(events[0].get("timestamp").is_none());
        assert_eq!(events[1]["timestamp"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn numeric_status_codes() {
        let body = json!({"spans": [
            {"spanId": "err", "name": "n", "startTime": 0, "endTime": 1,
             "status": {"code": 2, "message": "boom"}},
            {"spanId": "ok", "name": "n", "startTime": 0, "endTime": 5,
             "status": {"code": 1, "source": "sdk"}}
        ]});
        let parsed: TraceResponse = serde_json::from_value(body).unwrap();
        let optimizer = SpanOptimizer::default();
        assert!(optimizer.has_error(&parsed.spans[0]));
        assert!(!optimizer.has_error(&parsed.spans[1]));

        let out = optimizer.optimize("t", &parsed.spans, &TraceQuery::default());
        assert_eq!(ids(&out), ["err", "ok"]);
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["spans"][0]["status"]["code"], 2);
    }

    #[test]
    fn extreme_times_do_not_overflow() {
        let spans = vec![span("a", i64::MIN, i64::MAX), span("b", 0, 1)];
        assert_eq!(spans[0].duration(), Number::from(i64::MAX));
        let out = SpanOptimizer::default().optimize("t", &spans, &TraceQuery::default());
        assert_eq!(ids(&out), ["a", "b"]);
        assert_eq!(out.summary.total_duration, Number::from(i64::MAX));
    }
}

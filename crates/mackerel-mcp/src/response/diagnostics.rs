//! Expanded "not found" diagnostics for the metrics endpoints.
//!
//! A 404 from `/hosts/{id}/metrics` or `/services/{name}/metrics` is
//! ambiguous: either the parent resource or the metric name may be wrong.
//! The upstream body usually says which; when it does not, the agent gets
//! guidance covering both.

use crate::api::ApiError;

/// The parent resource of a metrics request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsResource {
    Host,
    Service,
}

impl MetricsResource {
    fn label(self) -> &'static str {
        match self {
            MetricsResource::Host => "Host",
            MetricsResource::Service => "Service",
        }
    }

    fn list_tool_advice(self) -> &'static str {
        match self {
            MetricsResource::Host => "Use the list_hosts tool to find valid host IDs",
            MetricsResource::Service => "Use the list_services tool to find valid service names",
        }
    }

    fn catalog(self) -> &'static [&'static str] {
        match self {
            MetricsResource::Host => &[
                "Load average: loadavg1, loadavg5, loadavg15",
                "CPU: cpu.user.percentage, cpu.system.percentage, cpu.iowait.percentage, cpu.idle.percentage",
                "Memory: memory.used, memory.available, memory.total, memory.cached, memory.swap_cached",
                "Disk: disk.{device}.reads.delta, disk.{device}.writes.delta",
                "Network: interface.{name}.rxBytes.delta, interface.{name}.txBytes.delta",
                "Filesystem: filesystem.{device}.used, filesystem.{device}.size",
            ],
            MetricsResource::Service => &[
                "Custom metrics posted to your service (names are defined by whoever posts them)",
                "Common examples: response_time, throughput, error_rate",
            ],
        }
    }
}

/// What a 404 body says went missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    /// The host or service itself.
    Parent,
    /// The metric name under an existing parent.
    Metric,
    /// The body does not say.
    Unknown,
}

/// Classify a 404 response body.
pub fn classify(resource: MetricsResource, body: &str) -> NotFoundKind {
    let body = body.to_lowercase();
    let parent_marker = match resource {
        MetricsResource::Host => "host not found",
        MetricsResource::Service => "service not found",
    };
    if body.contains(parent_marker) {
        NotFoundKind::Parent
    } else if body.contains("metric not found") {
        NotFoundKind::Metric
    } else {
        NotFoundKind::Unknown
    }
}

/// Rewrite a 404 from a metrics endpoint. Returns `None` for any other
/// failure, which callers render generically.
pub fn explain_not_found(resource: MetricsResource, err: &ApiError) -> Option<String> {
    if !err.is_not_found() {
        return None;
    }
    let kind = classify(resource, err.body().unwrap_or_default());
    Some(render(resource, kind, &err.to_string()))
}

fn render(resource: MetricsResource, kind: NotFoundKind, raw: &str) -> String {
    let label = resource.label();
    let lower = label.to_lowercase();
    let mut msg = format!("Error occurred: {raw}\n\n");

    let mut steps: Vec<&str> = Vec::new();
    let mut with_catalog = false;

    match kind {
        NotFoundKind::Parent => {
            msg.push_str(&format!("## {label} Not Found\n"));
            msg.push_str(&format!(
                "The {lower} does not exist or is not visible to this API key.\n"
            ));
            steps.push(resource.list_tool_advice());
            steps.push("Check that the identifier was copied exactly");
        }
        NotFoundKind::Metric => {
            msg.push_str("## Metric Not Found\n");
            msg.push_str(&format!(
                "The {lower} exists but has no metric with the requested name.\n"
            ));
            with_catalog = true;
            steps.push("Check for typos in the metric name");
            steps.push("Confirm the metric is posted during the requested time range");
        }
        NotFoundKind::Unknown => {
            msg.push_str(&format!(
                "## Resource Not Found: Invalid {label} or Metric\n"
            ));
            msg.push_str(&format!(
                "Either the {lower} or the metric name is invalid.\n"
            ));
            with_catalog = true;
            steps.push(resource.list_tool_advice());
            steps.push("Check for typos in the metric name");
        }
    }

    if with_catalog {
        msg.push_str(&format!("\n## Available {label} Metrics:\n"));
        for line in resource.catalog() {
            msg.push_str(&format!("- {line}\n"));
        }
    }

    msg.push_str("\n## Next Steps:\n");
    for step in steps {
        msg.push_str(&format!("- {step}\n"));
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn not_found(body: &str) -> ApiError {
        ApiError::Http {
            status: StatusCode::NOT_FOUND,
            body: body.into(),
        }
    }

    #[test]
    fn classifies_case_insensitively() {
        assert_eq!(
            classify(MetricsResource::Host, "HOST NOT FOUND"),
            NotFoundKind::Parent
        );
        assert_eq!(
            classify(MetricsResource::Service, r#"{"error":"Metric not found"}"#),
            NotFoundKind::Metric
        );
        assert_eq!(classify(MetricsResource::Host, ""), NotFoundKind::Unknown);
    }

    #[test]
    fn parent_marker_is_resource_specific() {
        // A service body mentioning hosts says nothing about the service.
        assert_eq!(
            classify(MetricsResource::Service, "Host not found"),
            NotFoundKind::Unknown
        );
    }

    #[test]
    fn host_not_found_has_no_catalog() {
        let text = explain_not_found(MetricsResource::Host, &not_found("Host not found")).unwrap();
        assert!(text.contains("## Host Not Found"));
        assert!(text.contains("Use the list_hosts tool to find valid host IDs"));
        assert!(!text.contains("## Available Host Metrics:"));
        assert!(text.starts_with("Error occurred: Mackerel API error: 404 Host not found"));
    }

    #[test]
    fn metric_not_found_lists_catalog() {
        let text =
            explain_not_found(MetricsResource::Host, &not_found("Metric not found")).unwrap();
        assert!(text.contains("## Metric Not Found"));
        assert!(text.contains("## Available Host Metrics:"));
        assert!(text.contains("loadavg1, loadavg5, loadavg15"));
        assert!(text.contains("Check for typos in the metric name"));
    }

    #[test]
    fn empty_body_falls_back_to_generic_heading() {
        let text = explain_not_found(MetricsResource::Host, &not_found("")).unwrap();
        assert!(text.contains("## Resource Not Found: Invalid Host or Metric"));
        assert!(text.contains("## Available Host Metrics:"));
        assert!(text.contains("cpu.user.percentage"));
        assert!(text.contains("memory.used"));
        assert!(text.contains("Use the list_hosts tool to find valid host IDs"));
    }

    #[test]
    fn service_variants() {
        let parent =
            explain_not_found(MetricsResource::Service, &not_found("Service not found")).unwrap();
        assert!(parent.contains("## Service Not Found"));
        assert!(parent.contains("Use the list_services tool to find valid service names"));
        assert!(!parent.contains("## Available Service Metrics:"));

        let generic = explain_not_found(MetricsResource::Service, &not_found("")).unwrap();
        assert!(generic.contains("## Resource Not Found: Invalid Service or Metric"));
        assert!(generic.contains("Custom metrics posted to your service"));
        assert!(generic.contains("response_time, throughput, error_rate"));
    }

    #[test]
    fn other_failures_are_not_rewritten() {
        let err = ApiError::Http {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "Host not found".into(),
        };
        assert!(explain_not_found(MetricsResource::Host, &err).is_none());
    }
}

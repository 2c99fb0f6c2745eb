//! Backend request metrics.
//!
//! Requests are labelled by endpoint group so capture traffic, which runs on
//! a much longer timeout, can be watched apart from camera control and the
//! background polls.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Backend requests by endpoint group, operation and outcome.
    pub const REQUESTS_TOTAL: &str = "camrig_backend_requests_total";

    /// Retried GETs by endpoint group and operation.
    pub const RETRIES_TOTAL: &str = "camrig_backend_retries_total";

    /// Latency of non-capture requests in seconds.
    pub const LATENCY_SECONDS: &str = "camrig_backend_latency_seconds";

    /// Latency of capture requests in seconds, shutter to saved file.
    pub const CAPTURE_LATENCY_SECONDS: &str = "camrig_capture_latency_seconds";
}

/// Backend endpoint group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Camera discovery and capabilities
    Registry,
    /// Focus, active camera and persisted settings
    Control,
    Capture,
    /// Recent captures and image deletion
    Gallery,
    Storage,
    /// Host statistics and the MQTT bridge
    Status,
    Other,
}

impl Endpoint {
    pub fn of(operation: &str) -> Self {
        match operation {
            "list_cameras" | "camera_info" | "resolutions" | "shutter_speed_range" => {
                Endpoint::Registry
            }
            "autofocus" | "manual_focus" | "set_active_camera" | "save_camera_settings" => {
                Endpoint::Control
            }
            "capture" | "capture_all" => Endpoint::Capture,
            "list_captures" | "delete_images" => Endpoint::Gallery,
            "list_directories" | "create_directory" | "delete_directory" => Endpoint::Storage,
            "system_stats" | "mqtt_status" | "mqtt_config" | "save_mqtt_config" | "test_mqtt" => {
                Endpoint::Status
            }
            _ => Endpoint::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Registry => "registry",
            Endpoint::Control => "control",
            Endpoint::Capture => "capture",
            Endpoint::Gallery => "gallery",
            Endpoint::Storage => "storage",
            Endpoint::Status => "status",
            Endpoint::Other => "other",
        }
    }
}

/// Outcome label for an HTTP status; 0 means no response arrived.
pub fn outcome(status: u16) -> &'static str {
    match status {
        0 => "unreachable",
        207 => "partial",
        200..=299 => "ok",
        400..=499 => "rejected",
        _ => "backend_error",
    }
}

/// Record metrics for a completed backend request.
///
/// `status` is 0 when no HTTP response was received.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    let endpoint = Endpoint::of(operation);

    counter!(
        names::REQUESTS_TOTAL,
        "endpoint" => endpoint.as_str(),
        "operation" => operation.to_string(),
        "outcome" => outcome(status)
    )
    .increment(1);

    let latency = if endpoint == Endpoint::Capture {
        names::CAPTURE_LATENCY_SECONDS
    } else {
        names::LATENCY_SECONDS
    };
    histogram!(
        latency,
        "endpoint" => endpoint.as_str(),
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a retry attempt.
pub fn record_retry(operation: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "endpoint" => Endpoint::of(operation).as_str(),
        "operation" => operation.to_string()
    )
    .increment(1);
}

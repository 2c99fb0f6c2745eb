//! Session metrics.

use metrics::counter;

/// Metric name constants for consistency.
pub mod names {
    /// Capture requests by kind (`all`, `single`) and outcome.
    pub const CAPTURES_TOTAL: &str = "camrig_captures_total";

    /// Files surfaced to the operator by source.
    pub const FILES_SURFACED_TOTAL: &str = "camrig_files_surfaced_total";

    /// WebSocket reconnect attempts by channel.
    pub const WS_RECONNECTS_TOTAL: &str = "camrig_ws_reconnects_total";

    /// Cameras whose capability fetch failed.
    pub const CAPABILITY_FAILURES_TOTAL: &str = "camrig_capability_failures_total";
}

pub fn record_capture(kind: &'static str, success: bool) {
    counter!(
        names::CAPTURES_TOTAL,
        "kind" => kind,
        "outcome" => if success { "success" } else { "failure" }
    )
    .increment(1);
}

pub fn record_file_surfaced(source: &str) {
    counter!(
        names::FILES_SURFACED_TOTAL,
        "source" => source.to_string()
    )
    .increment(1);
}

pub fn record_reconnect(channel: &'static str) {
    counter!(names::WS_RECONNECTS_TOTAL, "channel" => channel).increment(1);
}

pub fn record_capability_failure() {
    counter!(names::CAPABILITY_FAILURES_TOTAL).increment(1);
}

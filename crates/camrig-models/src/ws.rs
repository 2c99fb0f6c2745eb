//! WebSocket event types pushed by the backend on `/ws`.

use serde::{Deserialize, Serialize};

/// Source tag the backend uses for captures triggered from the web UI.
pub const LOCAL_UI_SOURCE: &str = "WebUI";

/// Source tag assumed when a `new_file` event carries none.
pub const DEFAULT_EVENT_SOURCE: &str = "WS";

/// WebSocket event envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsEvent {
    /// A capture was written to storage
    NewFile {
        filename: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },

    /// A line from the backend's MQTT bridge
    MqttLog { message: String },

    /// Any event type this client does not know
    #[serde(other)]
    Unknown,
}

impl WsEvent {
    /// Create a new-file event.
    pub fn new_file(filename: impl Into<String>, source: Option<&str>) -> Self {
        WsEvent::NewFile {
            filename: filename.into(),
            source: source.map(str::to_string),
        }
    }

    /// Create an MQTT log event.
    pub fn mqtt_log(message: impl Into<String>) -> Self {
        WsEvent::MqttLog {
            message: message.into(),
        }
    }

    /// Source of a new-file event, defaulted when absent.
    pub fn source(&self) -> Option<&str> {
        match self {
            WsEvent::NewFile { source, .. } => {
                Some(source.as_deref().unwrap_or(DEFAULT_EVENT_SOURCE))
            }
            _ => None,
        }
    }

    /// Whether the event was caused by this UI's own HTTP capture.
    pub fn is_local(&self) -> bool {
        self.source() == Some(LOCAL_UI_SOURCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_file_parsing() {
        let ev: WsEvent = serde_json::from_str(
            r#"{"type":"new_file","filename":"images/default/a.jpg","source":"MQTT"}"#,
        )
        .unwrap();
        assert_eq!(ev, WsEvent::new_file("images/default/a.jpg", Some("MQTT")));
        assert_eq!(ev.source(), Some("MQTT"));
        assert!(!ev.is_local());
    }

    #[test]
    fn test_missing_source_defaults() {
        let ev: WsEvent =
            serde_json::from_str(r#"{"type":"new_file","filename":"x.jpg"}"#).unwrap();
        assert_eq!(ev.source(), Some(DEFAULT_EVENT_SOURCE));
    }

    #[test]
    fn test_mqtt_log_and_unknown() {
        let ev: WsEvent =
            serde_json::from_str(r#"{"type":"mqtt_log","message":"Connected"}"#).unwrap();
        assert_eq!(ev, WsEvent::mqtt_log("Connected"));

        let ev: WsEvent = serde_json::from_str(r#"{"type":"pong"}"#).unwrap();
        assert_eq!(ev, WsEvent::Unknown);
        assert_eq!(ev.source(), None);
    }

    #[test]
    fn test_local_source_detection() {
        assert!(WsEvent::new_file("a.jpg", Some(LOCAL_UI_SOURCE)).is_local());
    }
}

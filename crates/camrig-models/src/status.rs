//! Backend health, system statistics and MQTT bridge models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Generic acknowledgement body (`{status, message|detail}`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Ack {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl Ack {
    /// Whether the body reports success (or carries no status at all).
    pub fn is_success(&self) -> bool {
        matches!(self.status.as_deref(), None | Some("success"))
    }

    /// Best human readable text in the body.
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().or(self.detail.as_deref())
    }
}

/// Memory usage block of `/api/system_stats`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct RamUsage {
    #[serde(default)]
    pub used: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    pub percent: f64,
}

/// Disk usage block of `/api/system_stats`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct DiskUsage {
    #[serde(default)]
    pub used: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    pub percent: f64,
}

/// Response of `GET /api/system_stats`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct SystemStats {
    /// CPU usage percent
    pub cpu: f64,
    pub ram: RamUsage,
    #[serde(default)]
    pub disk: Option<DiskUsage>,
    /// CPU temperature in Celsius, absent on hosts without a sensor
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub camera_count: Option<u32>,
    #[serde(default)]
    pub performance_mode: Option<String>,
}

/// Severity bucket for a displayed statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatLevel {
    Normal,
    Elevated,
    Critical,
    /// No reading available
    Unknown,
}

impl StatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatLevel::Normal => "normal",
            StatLevel::Elevated => "elevated",
            StatLevel::Critical => "critical",
            StatLevel::Unknown => "n/a",
        }
    }
}

impl std::fmt::Display for StatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl SystemStats {
    pub fn cpu_level(&self) -> StatLevel {
        match self.cpu {
            c if c > 80.0 => StatLevel::Critical,
            c if c > 50.0 => StatLevel::Elevated,
            _ => StatLevel::Normal,
        }
    }

    pub fn ram_level(&self) -> StatLevel {
        if self.ram.percent > 90.0 {
            StatLevel::Critical
        } else {
            StatLevel::Normal
        }
    }

    pub fn temp_level(&self) -> StatLevel {
        match self.temp {
            None => StatLevel::Unknown,
            Some(t) if t > 80.0 => StatLevel::Critical,
            Some(t) if t > 65.0 => StatLevel::Elevated,
            Some(_) => StatLevel::Normal,
        }
    }

    /// Whether a multi-camera grid is worth offering.
    ///
    /// Hosts that do not report a camera count keep the grid.
    pub fn offers_grid(&self) -> bool {
        self.camera_count.map_or(true, |n| n > 1)
    }
}

/// Response of `GET /api/mqtt_status`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct MqttStatus {
    pub connected: bool,
    #[serde(default)]
    pub broker: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

/// MQTT bridge settings (`GET`/`POST /api/mqtt_config`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct MqttConfig {
    #[serde(default = "default_broker")]
    #[validate(length(min = 1, message = "broker must not be empty"))]
    pub broker: String,
    #[serde(default = "default_port")]
    #[validate(range(min = 1, message = "port must be between 1 and 65535"))]
    pub port: u16,
    #[serde(default = "default_topic")]
    #[validate(length(min = 1, message = "topic must not be empty"))]
    pub topic: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_broker() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1883
}

fn default_topic() -> String {
    "capture/trigger".to_string()
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: default_broker(),
            port: default_port(),
            topic: default_topic(),
            username: None,
            password: None,
        }
    }
}

/// Response of `GET /api/mqtt/test`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MqttTestResult {
    pub status: String,
    #[serde(default)]
    pub detail: String,
}

impl MqttTestResult {
    pub fn is_connected(&self) -> bool {
        self.status == "connected"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_levels() {
        let stats: SystemStats = serde_json::from_str(
            r#"{"cpu": 55.0, "ram": {"used": 900, "total": 1000, "percent": 91.0},
                "disk": {"used": 3, "total": 30, "percent": 10.0},
                "temp": null, "camera_count": 1}"#,
        )
        .unwrap();
        assert_eq!(stats.cpu_level(), StatLevel::Elevated);
        assert_eq!(stats.ram_level(), StatLevel::Critical);
        assert_eq!(stats.temp_level(), StatLevel::Unknown);
        assert!(!stats.offers_grid());

        let hot = SystemStats {
            temp: Some(81.2),
            ..Default::default()
        };
        assert_eq!(hot.temp_level(), StatLevel::Critical);
        assert_eq!(hot.cpu_level(), StatLevel::Normal);
    }

    #[test]
    fn test_mqtt_config_defaults_and_validation() {
        let cfg: MqttConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, MqttConfig::default());
        assert!(cfg.validate().is_ok());

        let bad = MqttConfig {
            broker: String::new(),
            port: 0,
            ..Default::default()
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("broker"));
        assert!(fields.contains_key("port"));
    }

    #[test]
    fn test_ack_success_and_text() {
        let ack: Ack = serde_json::from_str(r#"{"status":"success","message":"ok"}"#).unwrap();
        assert!(ack.is_success());
        assert_eq!(ack.text(), Some("ok"));

        let ack: Ack = serde_json::from_str(r#"{"detail":"Camera not found"}"#).unwrap();
        assert!(ack.is_success());
        assert_eq!(ack.text(), Some("Camera not found"));

        let ack: Ack = serde_json::from_str(r#"{"status":"error","detail":"boom"}"#).unwrap();
        assert!(!ack.is_success());
    }
}

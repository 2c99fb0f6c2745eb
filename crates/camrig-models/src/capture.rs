//! Capture and image management request/response types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::camera::{CameraPath, ShutterSpeed};

/// Subfolder used when the operator picks none.
pub const DEFAULT_SUBFOLDER: &str = "default";

/// Filename prefix used when the operator sets none.
pub const DEFAULT_PREFIX: &str = "IMG";

/// One camera's entry in a capture-all batch.
///
/// A snapshot of the camera's control state at trigger time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CaptureRequest {
    pub camera_path: CameraPath,
    pub resolution: String,
    #[schemars(with = "String")]
    pub shutter_speed: ShutterSpeed,
    pub autofocus: bool,
    /// Lens position in the 0.0-10.0 domain
    pub manual_focus: f64,
    pub subfolder: String,
    /// Per-camera prefix; takes precedence over the batch prefix, which
    /// falls back to `IMG`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// Body of `POST /api/capture_all`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CaptureAllRequest {
    pub prefix: String,
    pub captures: Vec<CaptureRequest>,
}

/// Successful body of `POST /api/capture_all`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CaptureAllResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub captured_files: Vec<String>,
    #[serde(default)]
    pub total_captures: Option<u64>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Body of `POST /api/capture` (single camera).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SingleCaptureRequest {
    pub camera_path: CameraPath,
    pub subfolder: String,
    pub prefix: String,
    pub resolution: String,
    #[schemars(with = "String")]
    pub shutter_speed: ShutterSpeed,
    pub autofocus: bool,
    pub manual_focus: f64,
}

/// Successful body of `POST /api/capture`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SingleCaptureResponse {
    pub status: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub capture_count: Option<u64>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Body of `POST /api/delete_images`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeleteImagesRequest {
    pub filenames: Vec<String>,
}

/// Body of `POST /api/delete_images` responses (200 and 207).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeleteImagesResponse {
    pub status: String,
    #[serde(default)]
    pub deleted_count: u32,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl DeleteImagesResponse {
    /// Whether some files were not deleted.
    pub fn is_partial(&self) -> bool {
        self.status == "partial_success" || !self.errors.is_empty()
    }

    /// Split the requested filenames into confirmed-deleted and failed.
    ///
    /// The backend reports failures as free-text lines that either end with
    /// the filename or name it before a `:` separated reason.
    pub fn partition<'a>(&self, requested: &'a [String]) -> (Vec<&'a str>, Vec<&'a str>) {
        requested
            .iter()
            .map(String::as_str)
            .partition(|name| !self.names_failure(name))
    }

    fn names_failure(&self, name: &str) -> bool {
        let with_reason = format!(" {}:", name);
        self.errors
            .iter()
            .any(|err| err.ends_with(name) || err.contains(&with_reason))
    }
}

/// Body of `POST /api/save_camera_settings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SaveCameraSettingsRequest {
    pub camera_path: CameraPath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutter_speed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autofocus: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// Body of `POST /api/autofocus`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AutofocusRequest {
    pub camera_path: CameraPath,
    pub enable: bool,
}

/// Body of `POST /api/manual_focus`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ManualFocusRequest {
    pub camera_path: CameraPath,
    pub focus_value: f64,
}

/// Body of `POST /api/set_active_camera`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActiveCameraRequest {
    /// `None` selects the multi-camera context
    pub camera_path: Option<CameraPath>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_all_request_wire_shape() {
        let req = CaptureAllRequest {
            prefix: "SET1".into(),
            captures: vec![CaptureRequest {
                camera_path: "pi_0".into(),
                resolution: "1280x720".into(),
                shutter_speed: ShutterSpeed::Fraction(250),
                autofocus: false,
                manual_focus: 3.5,
                subfolder: "Front".into(),
                prefix: None,
            }],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["prefix"], "SET1");
        assert_eq!(json["captures"][0]["camera_path"], "pi_0");
        assert_eq!(json["captures"][0]["shutter_speed"], "1/250s");
        assert_eq!(json["captures"][0]["manual_focus"], 3.5);
        assert!(json["captures"][0].get("prefix").is_none());
    }

    #[test]
    fn test_active_camera_null_serializes() {
        let json = serde_json::to_string(&ActiveCameraRequest { camera_path: None }).unwrap();
        assert_eq!(json, r#"{"camera_path":null}"#);
    }

    #[test]
    fn test_delete_partition_uses_error_lines() {
        let resp: DeleteImagesResponse = serde_json::from_str(
            r#"{"status":"partial_success","deleted_count":1,
                "errors":["File not found: images/default/b.jpg"]}"#,
        )
        .unwrap();
        let requested = vec![
            "images/default/a.jpg".to_string(),
            "images/default/b.jpg".to_string(),
        ];
        let (deleted, failed) = resp.partition(&requested);
        assert!(resp.is_partial());
        assert_eq!(deleted, vec!["images/default/a.jpg"]);
        assert_eq!(failed, vec!["images/default/b.jpg"]);
    }
}

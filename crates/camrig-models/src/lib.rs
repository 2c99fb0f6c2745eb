//! Shared wire models for the camrig capture backend.
//!
//! This crate provides Serde-serializable types for:
//! - Camera registry entries and capabilities
//! - Shutter speed parsing and option derivation
//! - Capture, image and directory requests
//! - System statistics and MQTT bridge settings
//! - WebSocket event schemas

pub mod camera;
pub mod capture;
pub mod directory;
pub mod status;
pub mod utils;
pub mod ws;

// Re-export common types
pub use camera::{
    default_resolution, shutter_options, CameraDescriptor, CameraInfo, CameraMap, CameraPath,
    ShutterOptions, ShutterSpeed, ShutterSpeedRange,
};
pub use capture::{
    ActiveCameraRequest, AutofocusRequest, CaptureAllRequest, CaptureAllResponse, CaptureRequest,
    DeleteImagesRequest, DeleteImagesResponse, ManualFocusRequest, SaveCameraSettingsRequest,
    SingleCaptureRequest, SingleCaptureResponse, DEFAULT_PREFIX, DEFAULT_SUBFOLDER,
};
pub use directory::{display_path, join_path, parent_path, CreateDirectoryRequest, DeleteDirectoryRequest};
pub use status::{Ack, MqttConfig, MqttStatus, MqttTestResult, StatLevel, SystemStats};
pub use utils::{normalize_focus, safe_folder_name, slider_to_focus};
pub use ws::{WsEvent, LOCAL_UI_SOURCE};

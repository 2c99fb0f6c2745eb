//! Headless multi-camera capture session.
//!
//! This crate provides:
//! - Camera registry with concurrent, per-camera-degrading capability fetch
//! - Shared per-camera control state observed by every view
//! - Capture orchestration with countdown and guaranteed return to idle
//! - Reconnecting live event channel with de-duplicated file notifications
//! - Remote directory browser, gallery and status monitor

pub mod activity;
pub mod capabilities;
pub mod config;
pub mod control;
pub mod directory;
pub mod error;
pub mod events;
pub mod gallery;
pub mod known_files;
pub mod metrics;
pub mod orchestrator;
pub mod registry;
pub mod session;
pub mod status;

pub use activity::{ActivityEntry, ActivityLog};
pub use capabilities::{CameraCapabilities, Capabilities};
pub use config::SessionConfig;
pub use control::{CameraControl, CameraControlState, FocusStatus};
pub use directory::DirectoryBrowser;
pub use error::{SessionError, SessionResult};
pub use events::{ConnectionState, EventChannel, EventDispatcher, MqttLogView};
pub use gallery::{DeleteReport, Gallery};
pub use known_files::{KnownFiles, SurfacedFile};
pub use orchestrator::{CaptureOrchestrator, CapturePhase, CaptureSummary, SingleCaptureSummary};
pub use registry::{CameraRegistry, RegisteredCamera};
pub use session::{Session, SingleCameraView};
pub use status::StatusMonitor;

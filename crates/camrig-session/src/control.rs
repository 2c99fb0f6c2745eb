//! Per-camera control state.
//!
//! A [`CameraControl`] is a cheap, cloneable handle onto one shared state
//! object. Every view of a camera (grid card, expanded popup, single-camera
//! view) holds a clone of the same handle and observes changes through
//! [`CameraControl::subscribe`], so the views can never drift apart.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use camrig_client::BackendClient;
use camrig_models::{
    normalize_focus, safe_folder_name, slider_to_focus, CameraPath, CaptureRequest, ShutterSpeed,
    DEFAULT_SUBFOLDER,
};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::activity::ActivityLog;
use crate::capabilities::Capabilities;
use crate::error::{SessionError, SessionResult};

/// Live configuration of one camera.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraControlState {
    pub resolution: String,
    pub shutter_speed: ShutterSpeed,
    pub autofocus_enabled: bool,
    /// Lens position in the 0.0-10.0 domain
    pub manual_focus: f64,
    pub save_subfolder: String,
    /// Per-camera filename prefix, empty when unset
    pub prefix: String,
    /// Preview stream reference for the current settings
    pub preview_url: String,
}

/// Focus indicator shown on the preview.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FocusStatus {
    Autofocus,
    Manual(f64),
    Unsupported,
}

impl fmt::Display for FocusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FocusStatus::Autofocus => write!(f, "AF active"),
            FocusStatus::Manual(value) => write!(f, "MF {:.1}", value),
            FocusStatus::Unsupported => write!(f, "No AF"),
        }
    }
}

struct ControlInner {
    camera_path: CameraPath,
    friendly_name: String,
    client: BackendClient,
    activity: ActivityLog,
    capabilities: RwLock<Capabilities>,
    state: watch::Sender<CameraControlState>,
    /// Cache-busting token of the last explicit preview refresh, 0 when none
    preview_token: AtomicU64,
}

/// Shared handle onto one camera's control state.
#[derive(Clone)]
pub struct CameraControl {
    inner: Arc<ControlInner>,
}

impl fmt::Debug for CameraControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraControl")
            .field("camera_path", &self.inner.camera_path)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

impl CameraControl {
    /// Create the control state for a newly discovered camera.
    pub fn new(
        camera_path: CameraPath,
        friendly_name: impl Into<String>,
        capabilities: Capabilities,
        client: BackendClient,
        activity: ActivityLog,
    ) -> Self {
        let friendly_name = friendly_name.into();
        let resolution = match &capabilities {
            Capabilities::Known(caps) => caps.default_resolution().to_string(),
            Capabilities::Unknown => String::new(),
        };
        let state = CameraControlState {
            resolution,
            shutter_speed: ShutterSpeed::Auto,
            autofocus_enabled: capabilities.has_autofocus(),
            manual_focus: 0.0,
            save_subfolder: safe_folder_name(&friendly_name),
            prefix: String::new(),
            preview_url: String::new(),
        };
        let (tx, _) = watch::channel(state);

        let control = Self {
            inner: Arc::new(ControlInner {
                camera_path,
                friendly_name,
                client,
                activity,
                capabilities: RwLock::new(capabilities),
                state: tx,
                preview_token: AtomicU64::new(0),
            }),
        };
        control.update(|_| {});
        control
    }

    pub fn camera_path(&self) -> &CameraPath {
        &self.inner.camera_path
    }

    pub fn friendly_name(&self) -> &str {
        &self.inner.friendly_name
    }

    pub fn capabilities(&self) -> Capabilities {
        self.inner
            .capabilities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current state.
    pub fn snapshot(&self) -> CameraControlState {
        self.inner.state.borrow().clone()
    }

    /// Observe every change to this camera's state.
    pub fn subscribe(&self) -> watch::Receiver<CameraControlState> {
        self.inner.state.subscribe()
    }

    /// Whether two handles refer to the same shared state.
    pub fn same_camera(&self, other: &CameraControl) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // Local settings
    // =========================================================================

    pub fn set_resolution(&self, value: &str) -> SessionResult<()> {
        let caps = self.capabilities();
        let offered = caps.resolutions();
        if !offered.is_empty() && !offered.iter().any(|r| r == value) {
            return Err(SessionError::validation(format!(
                "Resolution {} not offered by {}",
                value, self.inner.friendly_name
            )));
        }
        self.update(|s| s.resolution = value.to_string());
        Ok(())
    }

    pub fn set_shutter_speed(&self, speed: ShutterSpeed) -> SessionResult<()> {
        let options = self.capabilities().shutter();
        if !options.contains(speed) {
            let msg = if options.is_enabled() {
                format!("Shutter speed {} not offered by {}", speed, self.inner.friendly_name)
            } else {
                format!("{} has no shutter speed control", self.inner.friendly_name)
            };
            return Err(SessionError::validation(msg));
        }
        self.update(|s| s.shutter_speed = speed);
        Ok(())
    }

    /// Subfolder used for this camera's captures; blank means the default.
    pub fn set_save_location(&self, subfolder: &str) {
        let subfolder = match subfolder.trim() {
            "" => DEFAULT_SUBFOLDER,
            s => s,
        };
        self.update(|s| s.save_subfolder = subfolder.to_string());
    }

    pub fn set_prefix(&self, prefix: &str) {
        self.update(|s| s.prefix = prefix.trim().to_string());
    }

    /// Preview URL for the current settings.
    pub fn preview_url(&self) -> String {
        self.inner.state.borrow().preview_url.clone()
    }

    /// Force the preview to be re-fetched with a fresh cache-busting token.
    pub fn refresh_preview(&self) -> String {
        let token = chrono::Utc::now().timestamp_millis().max(1) as u64;
        let previous = self.inner.preview_token.swap(token, Ordering::SeqCst);
        // Two refreshes in the same millisecond still produce distinct URLs
        if previous >= token {
            self.inner.preview_token.store(previous + 1, Ordering::SeqCst);
        }
        self.update(|_| {});
        self.preview_url()
    }

    // =========================================================================
    // Focus
    // =========================================================================

    pub fn focus_status(&self) -> FocusStatus {
        let state = self.inner.state.borrow();
        if !self.capabilities().has_autofocus() {
            FocusStatus::Unsupported
        } else if state.autofocus_enabled {
            FocusStatus::Autofocus
        } else {
            FocusStatus::Manual(state.manual_focus)
        }
    }

    /// Manual focus can only be edited with AF support and AF switched off.
    pub fn manual_focus_editable(&self) -> bool {
        self.capabilities().has_autofocus() && !self.inner.state.borrow().autofocus_enabled
    }

    /// Switch autofocus, rolling the local value back if the backend refuses.
    pub async fn set_autofocus(&self, enabled: bool) -> SessionResult<()> {
        if !self.capabilities().has_autofocus() {
            return Err(SessionError::validation(format!(
                "{} does not support autofocus",
                self.inner.friendly_name
            )));
        }

        let previous = self.snapshot().autofocus_enabled;
        self.update(|s| s.autofocus_enabled = enabled);

        match self
            .inner
            .client
            .set_autofocus(&self.inner.camera_path, enabled)
            .await
        {
            Ok(_) => {
                self.inner.activity.info(format!(
                    "Autofocus {} for {}",
                    if enabled { "enabled" } else { "disabled" },
                    self.inner.friendly_name
                ));
                Ok(())
            }
            Err(e) => {
                warn!(
                    camera_path = %self.inner.camera_path,
                    "Autofocus change failed, rolling back: {}", e
                );
                self.update(|s| s.autofocus_enabled = previous);
                self.inner.activity.error(format!(
                    "Autofocus change failed for {}: {}",
                    self.inner.friendly_name,
                    e.user_message()
                ));
                Err(e.into())
            }
        }
    }

    /// Move the focus slider (0..=1000) without contacting the backend.
    pub fn drag_focus(&self, slider: u16) -> SessionResult<f64> {
        self.ensure_manual_focus()?;
        let value = slider_to_focus(slider);
        self.update(|s| s.manual_focus = value);
        Ok(value)
    }

    /// Send the current manual focus value to the backend.
    pub async fn commit_focus(&self) -> SessionResult<()> {
        self.ensure_manual_focus()?;
        let value = self.snapshot().manual_focus;

        debug!(camera_path = %self.inner.camera_path, focus = value, "Committing manual focus");
        if let Err(e) = self
            .inner
            .client
            .set_manual_focus(&self.inner.camera_path, value)
            .await
        {
            self.inner.activity.error(format!(
                "Manual focus failed for {}: {}",
                self.inner.friendly_name,
                e.user_message()
            ));
            return Err(e.into());
        }
        Ok(())
    }

    /// Set a focus value directly and commit it.
    pub async fn set_manual_focus(&self, value: f64) -> SessionResult<()> {
        self.ensure_manual_focus()?;
        let value = normalize_focus(value);
        self.update(|s| s.manual_focus = value);
        self.commit_focus().await
    }

    // =========================================================================
    // Capture and capabilities
    // =========================================================================

    /// Snapshot of the state as one capture-all entry.
    pub fn capture_request(&self) -> CaptureRequest {
        let state = self.snapshot();
        CaptureRequest {
            camera_path: self.inner.camera_path.clone(),
            resolution: state.resolution,
            shutter_speed: state.shutter_speed,
            autofocus: state.autofocus_enabled,
            manual_focus: state.manual_focus,
            subfolder: state.save_subfolder,
            prefix: (!state.prefix.is_empty()).then_some(state.prefix),
        }
    }

    /// Replace the capabilities and re-derive dependent settings.
    pub fn apply_capabilities(&self, capabilities: Capabilities) {
        *self
            .inner
            .capabilities
            .write()
            .unwrap_or_else(PoisonError::into_inner) = capabilities.clone();

        self.update(|s| {
            let offered = capabilities.resolutions();
            if !offered.is_empty() && !offered.iter().any(|r| *r == s.resolution) {
                s.resolution = match &capabilities {
                    Capabilities::Known(caps) => caps.default_resolution().to_string(),
                    Capabilities::Unknown => String::new(),
                };
            }
            if !capabilities.shutter().contains(s.shutter_speed) {
                s.shutter_speed = ShutterSpeed::Auto;
            }
            if !capabilities.has_autofocus() {
                s.autofocus_enabled = false;
            }
        });
    }

    fn ensure_manual_focus(&self) -> SessionResult<()> {
        if !self.capabilities().has_autofocus() {
            return Err(SessionError::validation(format!(
                "{} has no focus control",
                self.inner.friendly_name
            )));
        }
        if self.inner.state.borrow().autofocus_enabled {
            return Err(SessionError::validation("Disable autofocus to focus manually"));
        }
        Ok(())
    }

    /// Apply a change and recompute the preview reference.
    fn update(&self, change: impl FnOnce(&mut CameraControlState)) {
        let token = match self.inner.preview_token.load(Ordering::SeqCst) {
            0 => None,
            t => Some(t),
        };
        self.inner.state.send_modify(|state| {
            change(state);
            state.preview_url = self.inner.client.video_feed_url(
                &self.inner.camera_path,
                &state.resolution,
                state.shutter_speed,
                token,
            );
        });
    }
}

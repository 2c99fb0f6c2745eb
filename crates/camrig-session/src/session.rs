//! Session container.
//!
//! One [`Session`] owns the registry, the known-file set, the selection and
//! every background task. Dropping it stops the event channels and pollers.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use camrig_client::BackendClient;
use camrig_models::{CameraPath, SaveCameraSettingsRequest};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::activity::ActivityLog;
use crate::capabilities::{fetch_capabilities, Capabilities};
use crate::config::SessionConfig;
use crate::control::{CameraControl, FocusStatus};
use crate::directory::DirectoryBrowser;
use crate::error::{SessionError, SessionResult};
use crate::events::{ConnectionState, EventChannel, EventDispatcher, MqttLogView};
use crate::gallery::Gallery;
use crate::known_files::KnownFiles;
use crate::orchestrator::{CaptureOrchestrator, CaptureSummary, SingleCaptureSummary};
use crate::registry::CameraRegistry;
use crate::status::StatusMonitor;

#[derive(Default)]
struct Background {
    events: Option<EventChannel>,
    observer: Option<EventChannel>,
    tasks: Vec<JoinHandle<()>>,
}

impl Background {
    fn stop(&mut self) {
        self.events = None;
        self.observer = None;
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

/// A multi-camera capture session against one backend.
pub struct Session {
    client: BackendClient,
    config: SessionConfig,
    activity: ActivityLog,
    known_files: KnownFiles,
    mqtt_log: MqttLogView,
    registry: RwLock<Arc<CameraRegistry>>,
    active: RwLock<Option<CameraPath>>,
    orchestrator: CaptureOrchestrator,
    gallery: Arc<Gallery>,
    status: Arc<StatusMonitor>,
    background: Mutex<Background>,
}

impl Session {
    pub fn new(client: BackendClient, config: SessionConfig) -> Self {
        let activity = ActivityLog::default();
        let known_files = KnownFiles::new(config.gallery_limit);

        let orchestrator = CaptureOrchestrator::new(
            client.clone(),
            known_files.clone(),
            activity.clone(),
            config.countdown_tick,
        );
        let gallery = Arc::new(Gallery::new(
            client.clone(),
            known_files.clone(),
            activity.clone(),
        ));
        let status = Arc::new(StatusMonitor::new(client.clone(), activity.clone()));

        Self {
            client,
            config,
            activity,
            known_files,
            mqtt_log: MqttLogView::default(),
            registry: RwLock::new(Arc::new(CameraRegistry::default())),
            active: RwLock::new(None),
            orchestrator,
            gallery,
            status,
            background: Mutex::new(Background::default()),
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> SessionResult<Self> {
        let client = BackendClient::from_env()?;
        Ok(Self::new(client, SessionConfig::from_env()))
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn known_files(&self) -> &KnownFiles {
        &self.known_files
    }

    pub fn mqtt_log(&self) -> &MqttLogView {
        &self.mqtt_log
    }

    pub fn orchestrator(&self) -> &CaptureOrchestrator {
        &self.orchestrator
    }

    pub fn gallery(&self) -> &Arc<Gallery> {
        &self.gallery
    }

    pub fn status(&self) -> &Arc<StatusMonitor> {
        &self.status
    }

    // =========================================================================
    // Cameras
    // =========================================================================

    /// Load the multi-camera grid.
    ///
    /// Resets the backend's active camera context, then discovers cameras
    /// and their capabilities.
    pub async fn load_cameras(&self) -> SessionResult<Arc<CameraRegistry>> {
        if let Err(e) = self.client.set_active_camera(None).await {
            warn!("Could not reset active camera: {}", e);
        }
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = None;

        let registry = match CameraRegistry::load(&self.client, &self.activity).await {
            Ok(registry) => Arc::new(registry),
            Err(e) => {
                self.activity
                    .error(format!("Error loading cameras: {}", e.user_message()));
                return Err(e.into());
            }
        };

        *self.registry.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&registry);
        Ok(registry)
    }

    pub fn registry(&self) -> Arc<CameraRegistry> {
        Arc::clone(&self.registry.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Look up a camera by path or friendly name.
    pub fn camera(&self, key: &str) -> SessionResult<CameraControl> {
        self.registry()
            .find(key)
            .map(|c| c.control.clone())
            .ok_or_else(|| SessionError::UnknownCamera(CameraPath::from(key)))
    }

    /// Capture actions are available with cameras present and no capture running.
    pub fn can_capture(&self) -> bool {
        !self.registry().is_empty() && self.orchestrator.is_idle()
    }

    // =========================================================================
    // Capture
    // =========================================================================

    /// Capture from every registered camera, optionally after a countdown.
    pub async fn capture_all(&self, prefix: &str, delay_secs: u32) -> SessionResult<CaptureSummary> {
        let cameras = self.registry().controls();
        self.orchestrator
            .capture_all(&cameras, prefix, delay_secs)
            .await
    }

    /// Capture from one camera, optionally after a countdown.
    pub async fn capture_one(
        &self,
        key: &str,
        subfolder: Option<&str>,
        prefix: Option<&str>,
        delay_secs: u32,
    ) -> SessionResult<SingleCaptureSummary> {
        let camera = self.camera(key)?;
        self.orchestrator
            .capture_one(&camera, subfolder, prefix, delay_secs)
            .await
    }

    // =========================================================================
    // Single-camera view
    // =========================================================================

    /// Focus the single-camera view on a camera, or clear it with `None`.
    ///
    /// Capabilities are re-fetched in order and the backend is told which
    /// camera is active. A failed capability fetch degrades the camera.
    /// The shared control keeps the camera's real capabilities; the view
    /// applies its own autofocus restriction.
    pub async fn select_camera(&self, key: Option<&str>) -> SessionResult<Option<SingleCameraView>> {
        let Some(key) = key else {
            self.client.set_active_camera(None).await?;
            *self.active.write().unwrap_or_else(PoisonError::into_inner) = None;
            return Ok(None);
        };

        let control = self.camera(key)?;
        let path = control.camera_path().clone();

        let capabilities = match fetch_capabilities(&self.client, &path).await {
            Ok(caps) => Capabilities::Known(caps),
            Err(e) => {
                warn!(camera_path = %path, "Capability fetch failed, degrading: {}", e);
                self.activity.error(format!(
                    "Could not read capabilities of {}: {}",
                    control.friendly_name(),
                    e.user_message()
                ));
                Capabilities::Unknown
            }
        };
        control.apply_capabilities(capabilities);
        control.refresh_preview();

        if let Err(e) = self.client.set_active_camera(Some(&path)).await {
            self.activity.error(format!(
                "Could not activate {}: {}",
                control.friendly_name(),
                e.user_message()
            ));
        }

        info!(camera_path = %path, "Selected camera");
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Some(path);
        Ok(Some(SingleCameraView { control }))
    }

    pub fn active_camera(&self) -> Option<CameraPath> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Persist the selected camera's settings on the backend.
    pub async fn save_settings(&self) -> SessionResult<()> {
        let path = self
            .active_camera()
            .ok_or_else(|| SessionError::validation("No camera selected"))?;
        let control = self.camera(path.as_str())?;
        let state = control.snapshot();

        let request = SaveCameraSettingsRequest {
            camera_path: path,
            resolution: (!state.resolution.is_empty()).then_some(state.resolution),
            shutter_speed: Some(state.shutter_speed.to_string()),
            autofocus: Some(state.autofocus_enabled),
            prefix: (!state.prefix.is_empty()).then_some(state.prefix),
        };

        match self.client.save_camera_settings(&request).await {
            Ok(_) => {
                self.activity
                    .info(format!("Settings saved for {}", control.friendly_name()));
                Ok(())
            }
            Err(e) => {
                self.activity
                    .error(format!("Saving settings failed: {}", e.user_message()));
                Err(e.into())
            }
        }
    }

    // =========================================================================
    // Directories
    // =========================================================================

    pub fn browser(&self) -> DirectoryBrowser {
        DirectoryBrowser::new(self.client.clone(), self.activity.clone())
    }

    // =========================================================================
    // Background tasks
    // =========================================================================

    /// Start the event channel, status observer, gallery poll and status
    /// pollers. Calling it again restarts them.
    pub fn start_background(&self) -> SessionResult<()> {
        let ws_url = self.client.ws_url()?;
        let mut background = self.background.lock().unwrap_or_else(PoisonError::into_inner);
        background.stop();

        let dispatcher = EventDispatcher::new(
            self.known_files.clone(),
            self.activity.clone(),
            self.mqtt_log.clone(),
        );
        background.events = Some(EventChannel::spawn(
            ws_url.clone(),
            self.config.ws_backoff,
            dispatcher,
        ));
        background.observer = Some(EventChannel::observer(ws_url, self.config.status_ws_backoff));

        if let Some(every) = self.config.gallery_poll {
            background
                .tasks
                .push(Arc::clone(&self.gallery).spawn_poller(every));
        }
        background.tasks.extend(
            Arc::clone(&self.status).spawn(self.config.status_poll, self.config.stats_interval()),
        );

        info!("Session background tasks started");
        Ok(())
    }

    /// Stop all background tasks.
    pub fn shutdown(&self) {
        self.background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stop();
    }

    /// State of the live event channel, if started.
    pub fn events_state(&self) -> Option<ConnectionState> {
        self.background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .as_ref()
            .map(EventChannel::state)
    }

    /// State of the status-only WebSocket observer, if started.
    pub fn status_ws_state(&self) -> Option<ConnectionState> {
        self.background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .observer
            .as_ref()
            .map(EventChannel::state)
    }

    /// Receiver for the live event channel's state, if started.
    pub fn subscribe_events_state(
        &self,
    ) -> Option<tokio::sync::watch::Receiver<ConnectionState>> {
        self.background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .as_ref()
            .map(EventChannel::subscribe)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The single-camera view: a thin composition over the shared control.
#[derive(Debug, Clone)]
pub struct SingleCameraView {
    control: CameraControl,
}

impl SingleCameraView {
    pub fn control(&self) -> &CameraControl {
        &self.control
    }

    /// Focus control in this view is only wired for Pi cameras.
    pub fn autofocus_available(&self) -> bool {
        matches!(
            self.control.capabilities(),
            Capabilities::Known(caps) if caps.has_autofocus && caps.is_pi()
        )
    }

    pub fn focus_status(&self) -> FocusStatus {
        if self.autofocus_available() {
            self.control.focus_status()
        } else {
            FocusStatus::Unsupported
        }
    }

    pub async fn set_autofocus(&self, enabled: bool) -> SessionResult<()> {
        if !self.autofocus_available() {
            return Err(SessionError::validation(format!(
                "Autofocus is not available for {} in this view",
                self.control.friendly_name()
            )));
        }
        self.control.set_autofocus(enabled).await
    }
}

//! Capture orchestration.
//!
//! `Idle -> CountingDown -> Capturing -> Idle`. The return to `Idle` is
//! tied to a scope guard, so it happens on success, failure and when the
//! capture future is dropped mid-countdown.

use std::fmt;
use std::time::Duration;

use camrig_client::BackendClient;
use camrig_models::{
    CaptureAllRequest, SingleCaptureRequest, DEFAULT_PREFIX, DEFAULT_SUBFOLDER, LOCAL_UI_SOURCE,
};
use tokio::sync::watch;
use tracing::info;

use crate::activity::ActivityLog;
use crate::control::CameraControl;
use crate::error::{SessionError, SessionResult};
use crate::known_files::KnownFiles;
use crate::metrics::record_capture;

/// Where the orchestrator is in a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapturePhase {
    #[default]
    Idle,
    /// Seconds left before the capture fires
    CountingDown { remaining: u32 },
    Capturing,
}

impl fmt::Display for CapturePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapturePhase::Idle => write!(f, "idle"),
            CapturePhase::CountingDown { remaining } => write!(f, "counting down, {}s left", remaining),
            CapturePhase::Capturing => write!(f, "capturing"),
        }
    }
}

/// Outcome of a capture-all.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSummary {
    pub message: String,
    pub captured_files: Vec<String>,
    /// Files not already known to the session
    pub newly_surfaced: Vec<String>,
}

/// Outcome of a single-camera capture.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleCaptureSummary {
    pub filename: Option<String>,
    pub capture_count: Option<u64>,
    pub newly_surfaced: bool,
}

pub struct CaptureOrchestrator {
    client: BackendClient,
    known_files: KnownFiles,
    activity: ActivityLog,
    phase: watch::Sender<CapturePhase>,
    tick: Duration,
}

impl CaptureOrchestrator {
    /// `tick` is the length of one countdown step.
    pub fn new(
        client: BackendClient,
        known_files: KnownFiles,
        activity: ActivityLog,
        tick: Duration,
    ) -> Self {
        let (phase, _) = watch::channel(CapturePhase::Idle);
        Self {
            client,
            known_files,
            activity,
            phase,
            tick,
        }
    }

    pub fn phase(&self) -> CapturePhase {
        *self.phase.borrow()
    }

    pub fn is_idle(&self) -> bool {
        self.phase() == CapturePhase::Idle
    }

    /// Observe phase changes, including every countdown step.
    pub fn subscribe(&self) -> watch::Receiver<CapturePhase> {
        self.phase.subscribe()
    }

    /// Capture from every given camera with one batched request.
    ///
    /// Camera states are snapshotted when this is called; edits made during
    /// the countdown do not affect the capture. A `delay_secs` of zero fires
    /// immediately.
    pub async fn capture_all(
        &self,
        cameras: &[CameraControl],
        prefix: &str,
        delay_secs: u32,
    ) -> SessionResult<CaptureSummary> {
        if cameras.is_empty() {
            return Err(SessionError::NoCameras);
        }

        let captures = cameras
            .iter()
            .map(CameraControl::capture_request)
            .collect::<Vec<_>>();

        self.begin(first_phase(delay_secs))?;
        let _idle = scopeguard::guard(&self.phase, |phase| {
            phase.send_replace(CapturePhase::Idle);
        });
        self.count_down(delay_secs).await;

        self.activity
            .info("Capturing images from all active cameras...");
        let request = CaptureAllRequest {
            prefix: prefix_or_default(prefix),
            captures,
        };

        match self.client.capture_all(&request).await {
            Ok(response) => {
                record_capture("all", true);
                let newly_surfaced = response
                    .captured_files
                    .iter()
                    .filter(|f| self.known_files.surface(f, LOCAL_UI_SOURCE))
                    .cloned()
                    .collect::<Vec<_>>();

                let message = if response.message.is_empty() {
                    format!("Captured {} images", response.captured_files.len())
                } else {
                    response.message
                };
                info!(
                    files = response.captured_files.len(),
                    new = newly_surfaced.len(),
                    "Capture-all complete"
                );
                self.activity.info(message.clone());

                Ok(CaptureSummary {
                    message,
                    captured_files: response.captured_files,
                    newly_surfaced,
                })
            }
            Err(e) => {
                record_capture("all", false);
                self.activity
                    .error(format!("Capture failed: {}", e.user_message()));
                Err(e.into())
            }
        }
    }

    /// Capture one image from one camera, optionally after a countdown.
    ///
    /// Blank subfolder and prefix fall back to `default` and `IMG`. The
    /// camera state is snapshotted when this is called.
    pub async fn capture_one(
        &self,
        camera: &CameraControl,
        subfolder: Option<&str>,
        prefix: Option<&str>,
        delay_secs: u32,
    ) -> SessionResult<SingleCaptureSummary> {
        let state = camera.snapshot();
        let request = SingleCaptureRequest {
            camera_path: camera.camera_path().clone(),
            subfolder: non_blank(subfolder).unwrap_or(DEFAULT_SUBFOLDER).to_string(),
            prefix: prefix_or_default(prefix.unwrap_or("")),
            resolution: state.resolution,
            shutter_speed: state.shutter_speed,
            autofocus: state.autofocus_enabled,
            manual_focus: state.manual_focus,
        };

        self.begin(first_phase(delay_secs))?;
        let _idle = scopeguard::guard(&self.phase, |phase| {
            phase.send_replace(CapturePhase::Idle);
        });
        self.count_down(delay_secs).await;

        match self.client.capture(&request).await {
            Ok(response) => {
                record_capture("single", true);
                let newly_surfaced = response
                    .filename
                    .as_deref()
                    .map(|f| self.known_files.surface(f, LOCAL_UI_SOURCE))
                    .unwrap_or(false);
                self.activity.info(format!(
                    "Captured {} from {}",
                    response.filename.as_deref().unwrap_or("image"),
                    camera.friendly_name()
                ));
                Ok(SingleCaptureSummary {
                    filename: response.filename,
                    capture_count: response.capture_count,
                    newly_surfaced,
                })
            }
            Err(e) => {
                record_capture("single", false);
                self.activity.error(format!(
                    "Capture failed for {}: {}",
                    camera.friendly_name(),
                    e.user_message()
                ));
                Err(e.into())
            }
        }
    }

    /// Publish `delay_secs..=1` one tick apart, then `Capturing`.
    async fn count_down(&self, delay_secs: u32) {
        if delay_secs == 0 {
            return;
        }
        self.activity
            .info(format!("Starting capture in {} seconds...", delay_secs));
        for remaining in (1..=delay_secs).rev() {
            self.phase
                .send_replace(CapturePhase::CountingDown { remaining });
            tokio::time::sleep(self.tick).await;
        }
        self.phase.send_replace(CapturePhase::Capturing);
    }

    /// Leave `Idle`, or reject the trigger if a capture is under way.
    fn begin(&self, next: CapturePhase) -> SessionResult<()> {
        let mut current = CapturePhase::Idle;
        let started = self.phase.send_if_modified(|phase| {
            current = *phase;
            if *phase == CapturePhase::Idle {
                *phase = next;
                true
            } else {
                false
            }
        });
        if started {
            Ok(())
        } else {
            Err(SessionError::CaptureBusy(current))
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn first_phase(delay_secs: u32) -> CapturePhase {
    if delay_secs > 0 {
        CapturePhase::CountingDown {
            remaining: delay_secs,
        }
    } else {
        CapturePhase::Capturing
    }
}

fn prefix_or_default(prefix: &str) -> String {
    non_blank(Some(prefix)).unwrap_or(DEFAULT_PREFIX).to_string()
}

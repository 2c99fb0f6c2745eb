//! Session error types.

use camrig_client::ClientError;
use camrig_models::CameraPath;
use thiserror::Error;

use crate::orchestrator::CapturePhase;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Operator input rejected locally
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown camera: {0}")]
    UnknownCamera(CameraPath),

    #[error("Capture already in progress ({0})")]
    CaptureBusy(CapturePhase),

    #[error("No cameras detected")]
    NoCameras,
}

impl SessionError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether the failure came from the backend being unreachable.
    pub fn is_network(&self) -> bool {
        matches!(self, SessionError::Client(e) if e.is_network())
    }

    /// Operator facing message.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Client(e) => e.user_message(),
            SessionError::Validation(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

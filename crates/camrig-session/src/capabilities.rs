//! Per-camera capabilities and their fetch sequence.

use camrig_client::{BackendClient, ClientResult};
use camrig_models::{default_resolution, shutter_options, CameraPath, ShutterOptions};
use tracing::debug;

/// What one camera supports, fetched once per session.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraCapabilities {
    pub has_autofocus: bool,
    /// Backend driver kind ("pi", "usb")
    pub kind: Option<String>,
    pub shutter: ShutterOptions,
    pub resolutions: Vec<String>,
}

impl CameraCapabilities {
    pub fn is_pi(&self) -> bool {
        self.kind.as_deref() == Some("pi")
    }

    pub fn default_resolution(&self) -> &str {
        default_resolution(&self.resolutions).unwrap_or("")
    }
}

/// Capability lookup outcome for a camera.
#[derive(Debug, Clone, PartialEq)]
pub enum Capabilities {
    Known(CameraCapabilities),
    /// The fetch failed; controls fall back to safe defaults
    Unknown,
}

impl Capabilities {
    pub fn has_autofocus(&self) -> bool {
        matches!(self, Capabilities::Known(c) if c.has_autofocus)
    }

    /// Shutter control, defaulting to the fixed option list when unknown.
    pub fn shutter(&self) -> ShutterOptions {
        match self {
            Capabilities::Known(c) => c.shutter.clone(),
            Capabilities::Unknown => ShutterOptions::fallback(),
        }
    }

    pub fn resolutions(&self) -> &[String] {
        match self {
            Capabilities::Known(c) => &c.resolutions,
            Capabilities::Unknown => &[],
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Capabilities::Known(_))
    }
}

/// Fetch one camera's capabilities.
///
/// Resolutions, camera info and shutter range are requested in that order;
/// the first failure aborts the sequence.
pub async fn fetch_capabilities(
    client: &BackendClient,
    camera_path: &CameraPath,
) -> ClientResult<CameraCapabilities> {
    let resolutions = client.resolutions(camera_path).await?;
    let info = client.camera_info(camera_path).await?;
    let range = client.shutter_speed_range(camera_path).await?;

    debug!(
        camera_path = %camera_path,
        resolutions = resolutions.len(),
        has_autofocus = info.has_autofocus,
        "Fetched camera capabilities"
    );

    Ok(CameraCapabilities {
        has_autofocus: info.has_autofocus,
        kind: info.kind,
        shutter: shutter_options(range),
        resolutions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use camrig_models::{ShutterSpeed, ShutterSpeedRange};

    #[test]
    fn test_unknown_capabilities_degrade() {
        let caps = Capabilities::Unknown;
        assert!(!caps.has_autofocus());
        assert!(caps.shutter().is_enabled());
        assert_eq!(caps.shutter().options().len(), 7);
        assert!(caps.resolutions().is_empty());
    }

    #[test]
    fn test_default_resolution_prefers_720p() {
        let caps = CameraCapabilities {
            has_autofocus: true,
            kind: Some("pi".into()),
            shutter: shutter_options(ShutterSpeedRange::Range { min: 60, max: 500 }),
            resolutions: vec!["640x480".into(), "1280x720".into()],
        };
        assert_eq!(caps.default_resolution(), "1280x720");
        assert!(caps.is_pi());
        assert!(caps.shutter.contains(ShutterSpeed::Fraction(500)));
        assert!(!caps.shutter.contains(ShutterSpeed::Fraction(1000)));
    }
}

//! Camera identity and capability models.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Opaque, stable identifier for one camera device.
///
/// Used as the key across every backend endpoint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CameraPath(pub String);

impl CameraPath {
    /// Create from an existing string.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CameraPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CameraPath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CameraPath {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for CameraPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One entry of the camera registry (`GET /api/cameras`).
///
/// The backend returns its whole per-camera config block; only
/// `friendly_name` is required, the rest is kept when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CameraDescriptor {
    /// Human readable camera name
    pub friendly_name: String,
    /// Backend driver kind ("pi", "usb")
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Supported resolutions, if the registry already carries them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolutions: Option<Vec<String>>,
    /// Autofocus support, if the registry already carries it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_autofocus: Option<bool>,
}

impl CameraDescriptor {
    /// Create a descriptor with only a friendly name.
    pub fn named(friendly_name: impl Into<String>) -> Self {
        Self {
            friendly_name: friendly_name.into(),
            kind: None,
            resolutions: None,
            has_autofocus: None,
        }
    }
}

/// The full camera registry keyed by camera path.
pub type CameraMap = BTreeMap<CameraPath, CameraDescriptor>;

/// Response of `GET /api/camera_info/{camera_path}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CameraInfo {
    #[serde(default)]
    pub camera_path: Option<CameraPath>,
    #[serde(default)]
    pub friendly_name: Option<String>,
    /// Backend driver kind ("pi", "usb")
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub has_autofocus: bool,
    #[serde(default)]
    pub autofocus_enabled: Option<bool>,
    #[serde(default)]
    pub manual_focus_value: Option<f64>,
}

impl CameraInfo {
    /// Whether this camera is driven by the Pi camera stack.
    pub fn is_pi(&self) -> bool {
        self.kind.as_deref() == Some("pi")
    }
}

// =============================================================================
// Shutter speed
// =============================================================================

/// Common shutter denominators offered when the camera reports a range.
pub const COMMON_DENOMINATORS: [u32; 9] = [30, 60, 125, 250, 500, 1000, 2000, 4000, 8000];

/// Options offered when the camera reports a `(0, 0)` range.
pub const DEFAULT_DENOMINATORS: [u32; 6] = [30, 60, 125, 250, 500, 1000];

/// A shutter speed setting: automatic exposure or `1/{n}s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShutterSpeed {
    #[default]
    Auto,
    /// Exposure of `1/denominator` seconds
    Fraction(u32),
}

impl fmt::Display for ShutterSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutterSpeed::Auto => write!(f, "Auto"),
            ShutterSpeed::Fraction(den) => write!(f, "1/{}s", den),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid shutter speed: {0:?}")]
pub struct ParseShutterSpeedError(pub String);

impl FromStr for ShutterSpeed {
    type Err = ParseShutterSpeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(ShutterSpeed::Auto);
        }

        trimmed
            .strip_prefix("1/")
            .map(|rest| rest.strip_suffix('s').unwrap_or(rest))
            .and_then(|den| den.parse::<u32>().ok())
            .filter(|den| *den > 0)
            .map(ShutterSpeed::Fraction)
            .ok_or_else(|| ParseShutterSpeedError(s.to_string()))
    }
}

impl Serialize for ShutterSpeed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ShutterSpeed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Response of `GET /api/shutter_speed_range/{camera_path}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutterSpeedRange {
    /// Supported denominators, inclusive
    Range { min: u32, max: u32 },
    /// The camera exposes no shutter control
    Unavailable,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawShutterRange {
    Pair(u32, u32),
    Label(String),
}

impl Serialize for ShutterSpeedRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            ShutterSpeedRange::Range { min, max } => RawShutterRange::Pair(min, max),
            ShutterSpeedRange::Unavailable => RawShutterRange::Label("unavailable".into()),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ShutterSpeedRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawShutterRange::deserialize(deserializer)? {
            RawShutterRange::Pair(min, max) => Ok(ShutterSpeedRange::Range { min, max }),
            RawShutterRange::Label(label) if label == "unavailable" => {
                Ok(ShutterSpeedRange::Unavailable)
            }
            RawShutterRange::Label(other) => Err(serde::de::Error::custom(format!(
                "unexpected shutter range label: {}",
                other
            ))),
        }
    }
}

/// Shutter control derived from a camera's capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutterOptions {
    /// Selectable options, `Auto` first
    Selectable(Vec<ShutterSpeed>),
    /// Control disabled; only the placeholder is shown
    Disabled,
}

impl ShutterOptions {
    /// Options offered when capabilities are unknown.
    pub fn fallback() -> Self {
        shutter_options(ShutterSpeedRange::Range { min: 0, max: 0 })
    }

    /// Whether the control can be edited.
    pub fn is_enabled(&self) -> bool {
        matches!(self, ShutterOptions::Selectable(_))
    }

    /// The selectable options, empty when disabled.
    pub fn options(&self) -> &[ShutterSpeed] {
        match self {
            ShutterOptions::Selectable(opts) => opts,
            ShutterOptions::Disabled => &[],
        }
    }

    /// Whether `speed` may be selected.
    pub fn contains(&self, speed: ShutterSpeed) -> bool {
        match self {
            ShutterOptions::Selectable(opts) => opts.contains(&speed),
            ShutterOptions::Disabled => speed == ShutterSpeed::Auto,
        }
    }

    /// Option labels as the backend expects them.
    pub fn labels(&self) -> Vec<String> {
        self.options().iter().map(ToString::to_string).collect()
    }
}

/// Derive the selectable shutter options for a reported range.
///
/// `Auto` is always first. A `(0, 0)` range yields the fixed default list;
/// any other range keeps the common denominators within `min..=max`.
pub fn shutter_options(range: ShutterSpeedRange) -> ShutterOptions {
    let (min, max) = match range {
        ShutterSpeedRange::Unavailable => return ShutterOptions::Disabled,
        ShutterSpeedRange::Range { min, max } => (min, max),
    };

    let mut options = vec![ShutterSpeed::Auto];
    if min == 0 && max == 0 {
        options.extend(DEFAULT_DENOMINATORS.iter().copied().map(ShutterSpeed::Fraction));
    } else {
        options.extend(
            COMMON_DENOMINATORS
                .iter()
                .copied()
                .filter(|den| (min..=max).contains(den))
                .map(ShutterSpeed::Fraction),
        );
    }
    ShutterOptions::Selectable(options)
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolution preferred when a camera offers it.
pub const PREFERRED_RESOLUTION: &str = "1280x720";

/// Pick the default resolution from the offered list.
pub fn default_resolution(resolutions: &[String]) -> Option<&str> {
    resolutions
        .iter()
        .find(|r| r.as_str() == PREFERRED_RESOLUTION)
        .or_else(|| resolutions.first())
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(range: ShutterSpeedRange) -> Vec<String> {
        shutter_options(range).labels()
    }

    #[test]
    fn test_zero_range_uses_default_list() {
        assert_eq!(
            labels(ShutterSpeedRange::Range { min: 0, max: 0 }),
            vec!["Auto", "1/30s", "1/60s", "1/125s", "1/250s", "1/500s", "1/1000s"]
        );
    }

    #[test]
    fn test_range_filters_common_denominators() {
        assert_eq!(
            labels(ShutterSpeedRange::Range { min: 60, max: 500 }),
            vec!["Auto", "1/60s", "1/125s", "1/250s", "1/500s"]
        );
    }

    #[test]
    fn test_range_options_are_bounded_and_ascending() {
        let ranges = [(1, 10), (30, 30), (31, 8000), (100, 5000), (0, 100_000), (9000, 9999)];
        for (min, max) in ranges {
            let opts = shutter_options(ShutterSpeedRange::Range { min, max });
            let opts = opts.options();
            assert_eq!(opts[0], ShutterSpeed::Auto);

            let dens: Vec<u32> = opts[1..]
                .iter()
                .map(|s| match s {
                    ShutterSpeed::Fraction(d) => *d,
                    ShutterSpeed::Auto => panic!("Auto must only appear first"),
                })
                .collect();
            assert!(dens.iter().all(|d| *d >= min && *d <= max), "{:?}", dens);
            assert!(dens.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_unavailable_disables_control() {
        let opts = shutter_options(ShutterSpeedRange::Unavailable);
        assert!(!opts.is_enabled());
        assert!(opts.options().is_empty());
        assert!(opts.contains(ShutterSpeed::Auto));
    }

    #[test]
    fn test_shutter_range_deserialization() {
        let range: ShutterSpeedRange = serde_json::from_str("[60, 500]").unwrap();
        assert_eq!(range, ShutterSpeedRange::Range { min: 60, max: 500 });

        let range: ShutterSpeedRange = serde_json::from_str("\"unavailable\"").unwrap();
        assert_eq!(range, ShutterSpeedRange::Unavailable);

        assert!(serde_json::from_str::<ShutterSpeedRange>("\"sometimes\"").is_err());
    }

    #[test]
    fn test_shutter_speed_parse_and_display() {
        assert_eq!("Auto".parse::<ShutterSpeed>().unwrap(), ShutterSpeed::Auto);
        assert_eq!("1/250s".parse::<ShutterSpeed>().unwrap(), ShutterSpeed::Fraction(250));
        assert_eq!("1/250".parse::<ShutterSpeed>().unwrap(), ShutterSpeed::Fraction(250));
        assert!("1/0s".parse::<ShutterSpeed>().is_err());
        assert!("fast".parse::<ShutterSpeed>().is_err());
        assert_eq!(ShutterSpeed::Fraction(1000).to_string(), "1/1000s");

        let json = serde_json::to_string(&ShutterSpeed::Fraction(60)).unwrap();
        assert_eq!(json, "\"1/60s\"");
    }

    #[test]
    fn test_default_resolution_prefers_720p() {
        let offered = vec!["640x480".to_string(), "1280x720".to_string()];
        assert_eq!(default_resolution(&offered), Some("1280x720"));

        let offered = vec!["640x480".to_string(), "1920x1080".to_string()];
        assert_eq!(default_resolution(&offered), Some("640x480"));

        assert_eq!(default_resolution(&[]), None);
    }

    #[test]
    fn test_registry_tolerates_extra_fields() {
        let json = r#"{
            "pi_0": {"friendly_name": "Front", "type": "pi", "path": 0, "has_autofocus": true},
            "usb_1": {"friendly_name": "Side"}
        }"#;
        let map: CameraMap = serde_json::from_str(json).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&CameraPath::from("pi_0")].kind.as_deref(), Some("pi"));
        assert_eq!(map[&CameraPath::from("usb_1")].friendly_name, "Side");
    }
}

//! Small helpers shared by the session and the CLI.

/// Folder-safe form of a camera's friendly name.
///
/// Every character outside `[A-Za-z0-9_.-]` becomes `_`.
pub fn safe_folder_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Map the 0..=1000 focus slider onto the 0.0-10.0 lens domain.
pub fn slider_to_focus(slider: u16) -> f64 {
    f64::from(slider.min(1000)) / 100.0
}

/// Clamp a focus value into 0.0-10.0 and round to one decimal.
pub fn normalize_focus(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    (value.clamp(0.0, 10.0) * 10.0).round() / 10.0
}

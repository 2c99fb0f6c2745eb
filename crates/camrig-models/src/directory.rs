//! Storage directory requests and relative path helpers.
//!
//! Directory paths are slash-joined and relative to the backend's image
//! root; the root itself is the empty string.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/create_directory`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CreateDirectoryRequest {
    pub parent_path: String,
    pub new_folder_name: String,
}

/// Body of `POST /api/delete_directory`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeleteDirectoryRequest {
    pub path: String,
}

/// Join a child segment onto a relative directory path.
pub fn join_path(parent: &str, name: &str) -> String {
    let parent = parent.trim_matches('/');
    let name = name.trim_matches('/');
    match (parent.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => parent.to_string(),
        (false, false) => format!("{}/{}", parent, name),
    }
}

/// Parent of a relative directory path, `None` at the root.
pub fn parent_path(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return None;
    }
    Some(segments[..segments.len() - 1].join("/"))
}

/// Display form of a relative path (`/` for the root).
pub fn display_path(path: &str) -> String {
    format!("/{}", path.trim_matches('/'))
}

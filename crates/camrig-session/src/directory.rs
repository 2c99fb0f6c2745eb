//! Remote directory browser for choosing a save location.

use camrig_client::BackendClient;
use camrig_models::{display_path, join_path, parent_path, DEFAULT_SUBFOLDER};
use tracing::{debug, info, warn};

use crate::activity::ActivityLog;
use crate::control::CameraControl;
use crate::error::{SessionError, SessionResult};

/// Browses the backend's storage tree.
///
/// Holds only the current path and its children; every navigation
/// re-fetches. Failed operations leave both untouched.
pub struct DirectoryBrowser {
    client: BackendClient,
    activity: ActivityLog,
    current_path: String,
    entries: Vec<String>,
}

impl DirectoryBrowser {
    pub fn new(client: BackendClient, activity: ActivityLog) -> Self {
        Self {
            client,
            activity,
            current_path: String::new(),
            entries: Vec::new(),
        }
    }

    /// Relative path being shown; the root is `""`.
    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn can_go_up(&self) -> bool {
        parent_path(&self.current_path).is_some()
    }

    /// List `path` and make it current.
    pub async fn list(&mut self, path: &str) -> SessionResult<&[String]> {
        let path = path.trim_matches('/');
        let entries = self.client.list_directories(path).await.map_err(|e| {
            self.activity
                .error(format!("Failed to list {}: {}", display_path(path), e.user_message()));
            SessionError::from(e)
        })?;

        debug!(path = %path, count = entries.len(), "Listed directories");
        self.current_path = path.to_string();
        self.entries = entries;
        Ok(&self.entries)
    }

    /// Re-list the current path.
    pub async fn refresh(&mut self) -> SessionResult<&[String]> {
        let path = self.current_path.clone();
        self.list(&path).await
    }

    pub async fn navigate_into(&mut self, name: &str) -> SessionResult<&[String]> {
        let target = join_path(&self.current_path, name);
        self.list(&target).await
    }

    pub async fn navigate_up(&mut self) -> SessionResult<&[String]> {
        let parent = parent_path(&self.current_path)
            .ok_or_else(|| SessionError::validation("Already at the storage root"))?;
        self.list(&parent).await
    }

    /// Create a folder under the current path, then re-list.
    pub async fn create_directory(&mut self, name: &str) -> SessionResult<&[String]> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::validation("Folder name must not be empty"));
        }

        if let Err(e) = self.client.create_directory(&self.current_path, name).await {
            self.activity
                .error(format!("Could not create folder {}: {}", name, e.user_message()));
            return Err(e.into());
        }

        info!(parent = %self.current_path, name = %name, "Created directory");
        self.activity.info(format!(
            "Created folder {}",
            display_path(&join_path(&self.current_path, name))
        ));
        self.refresh().await
    }

    /// Delete `path` after `confirm` approves it.
    ///
    /// Returns `Ok(false)` when the operator declines. On success the
    /// browser moves to the deleted folder's parent and re-lists it; if that
    /// listing fails the delete still reports `Ok(true)`.
    pub async fn delete_directory<F>(&mut self, path: &str, confirm: F) -> SessionResult<bool>
    where
        F: FnOnce(&str) -> bool,
    {
        let path = path.trim_matches('/');
        let Some(parent) = parent_path(path) else {
            return Err(SessionError::validation("The storage root cannot be deleted"));
        };
        if !confirm(path) {
            return Ok(false);
        }

        if let Err(e) = self.client.delete_directory(path).await {
            self.activity
                .error(format!("Could not delete folder {}: {}", path, e.user_message()));
            return Err(e.into());
        }

        info!(path = %path, "Deleted directory");
        self.activity.info(format!("Deleted folder {}", display_path(path)));
        // The folder is gone either way; a stale listing is not a failed delete
        if let Err(e) = self.list(&parent).await {
            warn!(parent = %parent, "Re-listing after delete failed: {}", e);
        }
        Ok(true)
    }

    /// Chosen save location: the current path, or `default` at the root.
    pub fn selection(&self) -> String {
        if self.current_path.is_empty() {
            DEFAULT_SUBFOLDER.to_string()
        } else {
            self.current_path.clone()
        }
    }

    /// Write the selection into the requesting camera's save location.
    pub fn commit_selection(&self, camera: &CameraControl) -> String {
        let selection = self.selection();
        camera.set_save_location(&selection);
        selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Capabilities;
    use camrig_client::ClientConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn browser(server: &MockServer) -> DirectoryBrowser {
        let client = BackendClient::new(ClientConfig::with_base_url(server.uri())).unwrap();
        DirectoryBrowser::new(client, ActivityLog::default())
    }

    async fn mount_listing(server: &MockServer, dir: &str, children: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api/list_directories"))
            .and(query_param("path", dir))
            .respond_with(ResponseTemplate::new(200).set_body_json(children))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_navigate_into_then_up_round_trips() {
        let server = MockServer::start().await;
        mount_listing(&server, "", json!(["a", "b"])).await;
        mount_listing(&server, "a", json!(["c"])).await;

        let mut browser = browser(&server).await;
        browser.list("").await.unwrap();
        assert!(!browser.can_go_up());

        browser.navigate_into("a").await.unwrap();
        assert_eq!(browser.current_path(), "a");
        assert_eq!(browser.entries(), ["c"]);

        browser.navigate_up().await.unwrap();
        assert_eq!(browser.current_path(), "");
        assert_eq!(browser.entries(), ["a", "b"]);
        assert!(browser.navigate_up().await.is_err());
    }

    #[tokio::test]
    async fn test_failed_list_keeps_previous_path() {
        let server = MockServer::start().await;
        mount_listing(&server, "", json!(["a"])).await;
        Mock::given(method("GET"))
            .and(path("/api/list_directories"))
            .and(query_param("path", "a"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found"})))
            .mount(&server)
            .await;

        let mut browser = browser(&server).await;
        browser.list("").await.unwrap();
        assert!(browser.navigate_into("a").await.is_err());
        assert_eq!(browser.current_path(), "");
        assert_eq!(browser.entries(), ["a"]);
    }

    #[tokio::test]
    async fn test_create_failure_surfaces_detail() {
        let server = MockServer::start().await;
        mount_listing(&server, "", json!(["a"])).await;
        Mock::given(method("POST"))
            .and(path("/api/create_directory"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"detail": "Directory already exists."})),
            )
            .mount(&server)
            .await;

        let mut browser = browser(&server).await;
        browser.list("").await.unwrap();
        let err = browser.create_directory("a").await.unwrap_err();
        assert_eq!(err.user_message(), "Directory already exists.");
        assert_eq!(browser.current_path(), "");

        let err = browser.create_directory("  ").await.unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let server = MockServer::start().await;
        mount_listing(&server, "a", json!([])).await;
        Mock::given(method("POST"))
            .and(path("/api/delete_directory"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut browser = browser(&server).await;
        assert!(!browser.delete_directory("a/b", |_| false).await.unwrap());
        assert!(browser.delete_directory("a/b", |p| p == "a/b").await.unwrap());
        assert_eq!(browser.current_path(), "a");
    }

    #[tokio::test]
    async fn test_delete_succeeds_when_relist_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/delete_directory"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/list_directories"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "disk busy"})))
            .mount(&server)
            .await;

        let mut browser = browser(&server).await;
        assert!(browser.delete_directory("sets/old", |_| true).await.unwrap());
        assert_eq!(browser.current_path(), "");

        let messages: Vec<String> = browser.activity.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages[0], "Deleted folder /sets/old");
        assert!(messages[1].starts_with("Failed to list /sets"));
    }

    #[tokio::test]
    async fn test_commit_selection_sets_camera_subfolder() {
        let server = MockServer::start().await;
        mount_listing(&server, "", json!(["sets"])).await;
        mount_listing(&server, "sets", json!(["day1"])).await;
        mount_listing(&server, "sets/day1", json!([])).await;

        let mut browser = browser(&server).await;
        let camera = CameraControl::new(
            "pi_0".into(),
            "Front",
            Capabilities::Unknown,
            browser.client.clone(),
            ActivityLog::default(),
        );
        assert_eq!(camera.capture_request().subfolder, "Front");

        browser.list("").await.unwrap();
        assert_eq!(browser.commit_selection(&camera), "default");
        assert_eq!(camera.capture_request().subfolder, "default");

        browser.navigate_into("sets").await.unwrap();
        browser.navigate_into("day1").await.unwrap();
        assert_eq!(browser.commit_selection(&camera), "sets/day1");
        assert_eq!(camera.capture_request().subfolder, "sets/day1");
        assert_eq!(camera.snapshot().save_subfolder, "sets/day1");
    }

    #[tokio::test]
    async fn test_selection_sentinel() {
        let server = MockServer::start().await;
        mount_listing(&server, "sets", json!([])).await;
        let mut browser = browser(&server).await;
        assert_eq!(browser.selection(), "default");
        browser.list("sets").await.unwrap();
        assert_eq!(browser.selection(), "sets");
    }
}

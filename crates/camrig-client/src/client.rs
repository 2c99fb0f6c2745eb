//! Capture backend HTTP client.

use std::time::{Duration, Instant};

use camrig_models::{
    normalize_focus, Ack, ActiveCameraRequest, AutofocusRequest, CameraInfo, CameraMap,
    CameraPath, CaptureAllRequest, CaptureAllResponse, CreateDirectoryRequest,
    DeleteDirectoryRequest, DeleteImagesRequest, DeleteImagesResponse, ManualFocusRequest,
    MqttConfig, MqttStatus, MqttTestResult, SaveCameraSettingsRequest, ShutterSpeed,
    ShutterSpeedRange, SingleCaptureRequest, SingleCaptureResponse, SystemStats,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::config::ClientConfig;
use crate::error::{detail_from_body, ClientError, ClientResult};
use crate::metrics::record_request;
use crate::retry::with_retry;

/// Typed client for the capture backend's REST surface.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    config: ClientConfig,
}

impl BackendClient {
    /// Create a new backend client.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(ClientError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// URL of the live event WebSocket.
    pub fn ws_url(&self) -> ClientResult<url::Url> {
        Ok(self.config.ws_url()?)
    }

    /// Preview stream URL for a camera's current settings.
    ///
    /// `cache_bust` appends a token so a refreshed preview is re-fetched.
    pub fn video_feed_url(
        &self,
        camera_path: &CameraPath,
        resolution: &str,
        shutter_speed: ShutterSpeed,
        cache_bust: Option<u64>,
    ) -> String {
        let mut url = format!(
            "{}/video_feed?camera_path={}&resolution={}&shutter_speed={}",
            self.config.base_url,
            urlencoding::encode(camera_path.as_str()),
            urlencoding::encode(resolution),
            urlencoding::encode(&shutter_speed.to_string()),
        );
        if let Some(token) = cache_bust {
            url.push_str(&format!("&t={}", token));
        }
        url
    }

    // =========================================================================
    // Camera registry
    // =========================================================================

    /// List all cameras known to the backend.
    pub async fn list_cameras(&self) -> ClientResult<CameraMap> {
        let url = format!("{}/api/cameras", self.config.base_url);
        self.get_json("list_cameras", &url, &[]).await
    }

    pub async fn camera_info(&self, camera_path: &CameraPath) -> ClientResult<CameraInfo> {
        let url = format!(
            "{}/api/camera_info/{}",
            self.config.base_url,
            urlencoding::encode(camera_path.as_str())
        );
        self.get_json("camera_info", &url, &[]).await
    }

    /// Resolutions offered by a camera, in backend order.
    pub async fn resolutions(&self, camera_path: &CameraPath) -> ClientResult<Vec<String>> {
        let url = format!("{}/api/resolutions", self.config.base_url);
        self.get_json("resolutions", &url, &[("camera_path", camera_path.as_str())])
            .await
    }

    pub async fn shutter_speed_range(
        &self,
        camera_path: &CameraPath,
    ) -> ClientResult<ShutterSpeedRange> {
        let url = format!(
            "{}/api/shutter_speed_range/{}",
            self.config.base_url,
            urlencoding::encode(camera_path.as_str())
        );
        self.get_json("shutter_speed_range", &url, &[]).await
    }

    // =========================================================================
    // Camera control
    // =========================================================================

    pub async fn set_autofocus(&self, camera_path: &CameraPath, enable: bool) -> ClientResult<Ack> {
        let body = AutofocusRequest {
            camera_path: camera_path.clone(),
            enable,
        };
        self.post_ack("autofocus", "/api/autofocus", &body).await
    }

    /// Send a manual focus position, clamped into the 0.0-10.0 lens domain.
    pub async fn set_manual_focus(
        &self,
        camera_path: &CameraPath,
        focus_value: f64,
    ) -> ClientResult<Ack> {
        let body = ManualFocusRequest {
            camera_path: camera_path.clone(),
            focus_value: normalize_focus(focus_value),
        };
        self.post_ack("manual_focus", "/api/manual_focus", &body).await
    }

    /// Tell the backend which camera the single-camera view targets.
    pub async fn set_active_camera(&self, camera_path: Option<&CameraPath>) -> ClientResult<Ack> {
        let body = ActiveCameraRequest {
            camera_path: camera_path.cloned(),
        };
        self.post_ack("set_active_camera", "/api/set_active_camera", &body)
            .await
    }

    pub async fn save_camera_settings(&self, request: &SaveCameraSettingsRequest) -> ClientResult<Ack> {
        self.post_ack("save_camera_settings", "/api/save_camera_settings", request)
            .await
    }

    // =========================================================================
    // Capture
    // =========================================================================

    /// Capture one image from one camera.
    pub async fn capture(&self, request: &SingleCaptureRequest) -> ClientResult<SingleCaptureResponse> {
        info!(camera_path = %request.camera_path, "Requesting single capture");

        let url = format!("{}/api/capture", self.config.base_url);
        let (status, body) = self
            .send(
                "capture",
                self.http.post(&url).json(request),
                self.config.capture_timeout,
            )
            .await?;

        let response: SingleCaptureResponse = decode("capture", &body)?;
        if response.status != "success" {
            let detail = response
                .detail
                .or(response.message)
                .unwrap_or_else(|| "Capture failed".to_string());
            return Err(ClientError::from_http_status(status, detail));
        }
        Ok(response)
    }

    /// Capture from every camera in the batch with one request.
    pub async fn capture_all(&self, request: &CaptureAllRequest) -> ClientResult<CaptureAllResponse> {
        info!(
            cameras = request.captures.len(),
            prefix = %request.prefix,
            "Requesting capture-all"
        );

        let url = format!("{}/api/capture_all", self.config.base_url);
        let (status, body) = self
            .send(
                "capture_all",
                self.http.post(&url).json(request),
                self.config.capture_timeout,
            )
            .await?;

        let response: CaptureAllResponse = decode("capture_all", &body)?;
        if response.status != "success" {
            let detail = response
                .detail
                .unwrap_or_else(|| "Capture failed".to_string());
            return Err(ClientError::from_http_status(status, detail));
        }
        Ok(response)
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// Recent capture filenames, most recent first.
    pub async fn list_captures(&self) -> ClientResult<Vec<String>> {
        let url = format!("{}/api/captures", self.config.base_url);
        self.get_json("list_captures", &url, &[]).await
    }

    /// Delete images by relative filename.
    ///
    /// Partial success (HTTP 207) is returned as `Ok`; callers inspect
    /// [`DeleteImagesResponse::is_partial`].
    pub async fn delete_images(&self, filenames: &[String]) -> ClientResult<DeleteImagesResponse> {
        let url = format!("{}/api/delete_images", self.config.base_url);
        let body = DeleteImagesRequest {
            filenames: filenames.to_vec(),
        };
        let (status, text) = self
            .send(
                "delete_images",
                self.http.post(&url).json(&body),
                self.config.timeout,
            )
            .await?;

        let response: DeleteImagesResponse = decode("delete_images", &text)?;
        match response.status.as_str() {
            "success" | "partial_success" => Ok(response),
            _ => {
                let detail = if response.errors.is_empty() {
                    "Delete failed".to_string()
                } else {
                    response.errors.join("; ")
                };
                Err(ClientError::from_http_status(status, detail))
            }
        }
    }

    // =========================================================================
    // Directories
    // =========================================================================

    /// Child directory names of a storage path (root is `""`).
    pub async fn list_directories(&self, path: &str) -> ClientResult<Vec<String>> {
        let url = format!("{}/api/list_directories", self.config.base_url);
        self.get_json("list_directories", &url, &[("path", path)])
            .await
    }

    pub async fn create_directory(&self, parent_path: &str, name: &str) -> ClientResult<Ack> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::validation("Folder name must not be empty"));
        }
        let body = CreateDirectoryRequest {
            parent_path: parent_path.to_string(),
            new_folder_name: name.to_string(),
        };
        self.post_ack("create_directory", "/api/create_directory", &body)
            .await
    }

    pub async fn delete_directory(&self, path: &str) -> ClientResult<Ack> {
        if path.trim_matches('/').is_empty() {
            return Err(ClientError::validation("The storage root cannot be deleted"));
        }
        let body = DeleteDirectoryRequest {
            path: path.to_string(),
        };
        self.post_ack("delete_directory", "/api/delete_directory", &body)
            .await
    }

    // =========================================================================
    // Status and MQTT
    // =========================================================================

    pub async fn system_stats(&self) -> ClientResult<SystemStats> {
        let url = format!("{}/api/system_stats", self.config.base_url);
        self.get_json("system_stats", &url, &[]).await
    }

    pub async fn mqtt_status(&self) -> ClientResult<MqttStatus> {
        let url = format!("{}/api/mqtt_status", self.config.base_url);
        self.get_json("mqtt_status", &url, &[]).await
    }

    pub async fn mqtt_config(&self) -> ClientResult<MqttConfig> {
        let url = format!("{}/api/mqtt_config", self.config.base_url);
        self.get_json("mqtt_config", &url, &[]).await
    }

    /// Validate and persist MQTT bridge settings.
    pub async fn save_mqtt_config(&self, config: &MqttConfig) -> ClientResult<Ack> {
        config
            .validate()
            .map_err(|e| ClientError::validation(e.to_string()))?;
        self.post_ack("save_mqtt_config", "/api/mqtt_config", config)
            .await
    }

    /// Ask the backend to test its MQTT broker connection.
    pub async fn test_mqtt(&self) -> ClientResult<MqttTestResult> {
        let url = format!("{}/api/mqtt/test", self.config.base_url);
        let (_, body) = self
            .send("test_mqtt", self.http.get(&url), self.config.timeout)
            .await?;
        decode("test_mqtt", &body)
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// GET a JSON document, retrying transient failures.
    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> ClientResult<T> {
        with_retry(&self.config.retry, operation, move || async move {
            let (_, body) = self
                .send(
                    operation,
                    self.http.get(url).query(query),
                    self.config.timeout,
                )
                .await?;
            decode(operation, &body)
        })
        .await
    }

    /// POST a JSON body and require a successful acknowledgement.
    async fn post_ack<B: Serialize + ?Sized>(
        &self,
        operation: &str,
        path: &str,
        body: &B,
    ) -> ClientResult<Ack> {
        let url = format!("{}{}", self.config.base_url, path);
        let (status, text) = self
            .send(operation, self.http.post(&url).json(body), self.config.timeout)
            .await?;

        let ack: Ack = if text.trim().is_empty() {
            Ack::default()
        } else {
            decode(operation, &text)?
        };

        if !ack.is_success() {
            let detail = ack.text().unwrap_or("Request failed").to_string();
            warn!(operation = %operation, detail = %detail, "Backend rejected request");
            return Err(ClientError::from_http_status(status, detail));
        }
        Ok(ack)
    }

    /// Send a request and return the status and body of a 2xx response.
    async fn send(
        &self,
        operation: &str,
        request: RequestBuilder,
        timeout: Duration,
    ) -> ClientResult<(u16, String)> {
        let start = Instant::now();

        let response = match request.timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                record_request(operation, 0, start.elapsed().as_secs_f64() * 1000.0);
                return Err(ClientError::from_transport(e, timeout));
            }
        };

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::from_transport(e, timeout))?;

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        record_request(operation, status, latency_ms);
        debug!(operation = %operation, status, latency_ms, "Backend response");

        if !(200..300).contains(&status) {
            return Err(ClientError::from_http_status(status, detail_from_body(&body)));
        }
        Ok((status, body))
    }
}

fn decode<T: DeserializeOwned>(operation: &str, body: &str) -> ClientResult<T> {
    serde_json::from_str(body)
        .map_err(|e| ClientError::invalid_response(format!("{}: {}", operation, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryConfig;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> BackendClient {
        let config = ClientConfig {
            retry: RetryConfig {
                max_retries: 1,
                base_delay_ms: 1,
                max_delay_ms: 5,
            },
            ..ClientConfig::with_base_url(server.uri())
        };
        BackendClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_list_cameras_tolerates_extra_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cameras"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pi_1": {"friendly_name": "Side", "type": "pi", "path": "/base/soc", "has_autofocus": true},
                "pi_0": {"friendly_name": "Front"}
            })))
            .mount(&server)
            .await;

        let cameras = client_for(&server).list_cameras().await.unwrap();
        let keys: Vec<&str> = cameras.keys().map(CameraPath::as_str).collect();
        assert_eq!(keys, vec!["pi_0", "pi_1"]);
        assert_eq!(cameras[&CameraPath::from("pi_1")].kind.as_deref(), Some("pi"));
    }

    #[tokio::test]
    async fn test_camera_path_is_encoded_in_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/shutter_speed_range/%2Fdev%2Fvideo0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!("unavailable")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/resolutions"))
            .and(query_param("camera_path", "/dev/video0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["640x480"])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let cam = CameraPath::from("/dev/video0");
        assert_eq!(
            client.shutter_speed_range(&cam).await.unwrap(),
            ShutterSpeedRange::Unavailable
        );
        assert_eq!(client.resolutions(&cam).await.unwrap(), vec!["640x480"]);
    }

    #[tokio::test]
    async fn test_backend_detail_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/create_directory"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"detail": "Directory already exists."})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_directory("", "sets")
            .await
            .unwrap_err();
        match err {
            ClientError::Backend { status, detail } => {
                assert_eq!(status, 400);
                assert_eq!(detail, "Directory already exists.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blank_folder_rejected_without_request() {
        let server = MockServer::start().await;
        let err = client_for(&server)
            .create_directory("a", "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_manual_focus_sent_in_lens_domain() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/manual_focus"))
            .and(body_json(json!({"camera_path": "pi_0", "focus_value": 10.0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .set_manual_focus(&"pi_0".into(), 650.0)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_error_status_in_ok_body_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/autofocus"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "error", "detail": "AF not supported"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .set_autofocus(&"usb_0".into(), true)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "AF not supported");
    }

    #[tokio::test]
    async fn test_delete_partial_success_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/delete_images"))
            .respond_with(ResponseTemplate::new(207).set_body_json(json!({
                "status": "partial_success",
                "deleted_count": 1,
                "errors": ["File not found: images/default/b.jpg"]
            })))
            .mount(&server)
            .await;

        let files = vec![
            "images/default/a.jpg".to_string(),
            "images/default/b.jpg".to_string(),
        ];
        let resp = client_for(&server).delete_images(&files).await.unwrap();
        assert!(resp.is_partial());
        assert_eq!(resp.deleted_count, 1);
    }

    #[tokio::test]
    async fn test_reads_are_retried_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/captures"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/captures"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["images/x.jpg"])))
            .mount(&server)
            .await;

        let files = client_for(&server).list_captures().await.unwrap();
        assert_eq!(files, vec!["images/x.jpg"]);
    }

    #[tokio::test]
    async fn test_capture_all_failure_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/capture_all"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "camera busy"})))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .capture_all(&CaptureAllRequest {
                prefix: "IMG".into(),
                captures: vec![],
            })
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), Some(500));
    }

    #[tokio::test]
    async fn test_invalid_mqtt_config_not_sent() {
        let server = MockServer::start().await;
        let config = MqttConfig {
            topic: String::new(),
            ..Default::default()
        };
        let err = client_for(&server).save_mqtt_config(&config).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let config = ClientConfig {
            retry: RetryConfig::none(),
            connect_timeout: Duration::from_millis(200),
            ..ClientConfig::with_base_url("http://127.0.0.1:9")
        };
        let err = BackendClient::new(config)
            .unwrap()
            .mqtt_status()
            .await
            .unwrap_err();
        assert!(err.is_network());
    }

    #[test]
    fn test_video_feed_url() {
        let client = BackendClient::new(ClientConfig::with_base_url("http://rig:8000")).unwrap();
        let url = client.video_feed_url(
            &"pi_0".into(),
            "1280x720",
            ShutterSpeed::Fraction(250),
            Some(42),
        );
        assert_eq!(
            url,
            "http://rig:8000/video_feed?camera_path=pi_0&resolution=1280x720&shutter_speed=1%2F250s&t=42"
        );
    }
}

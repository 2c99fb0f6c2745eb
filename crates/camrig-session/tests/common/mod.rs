//! Shared fixtures for session integration tests.

#![allow(dead_code)]

use std::time::Duration;

use camrig_client::{BackendClient, ClientConfig, RetryConfig};
use camrig_session::{Session, SessionConfig};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Session against `server` with fast timings and no background tasks.
pub fn session_for(server: &MockServer) -> Session {
    let client = BackendClient::new(ClientConfig {
        retry: RetryConfig::none(),
        ..ClientConfig::with_base_url(server.uri())
    })
    .expect("client");

    Session::new(
        client,
        SessionConfig {
            ws_backoff: Duration::from_millis(50),
            status_ws_backoff: Duration::from_millis(50),
            gallery_poll: None,
            countdown_tick: Duration::from_millis(50),
            ..SessionConfig::default()
        },
    )
}

pub async fn mount_active_camera(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/set_active_camera"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .mount(server)
        .await;
}

pub async fn mount_registry(server: &MockServer, cameras: Value) {
    Mock::given(method("GET"))
        .and(path("/api/cameras"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cameras))
        .mount(server)
        .await;
}

/// Mount the three capability endpoints for one camera.
pub async fn mount_camera(
    server: &MockServer,
    camera_path: &str,
    kind: &str,
    has_autofocus: bool,
    shutter_range: Value,
    resolutions: Value,
) {
    Mock::given(method("GET"))
        .and(path("/api/resolutions"))
        .and(query_param("camera_path", camera_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(resolutions))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/camera_info/{}", camera_path)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "camera_path": camera_path,
            "type": kind,
            "has_autofocus": has_autofocus
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/shutter_speed_range/{}", camera_path)))
        .respond_with(ResponseTemplate::new(200).set_body_json(shutter_range))
        .mount(server)
        .await;
}

/// Two Pi cameras and one USB camera.
pub async fn mount_rig(server: &MockServer) {
    mount_active_camera(server).await;
    mount_registry(
        server,
        json!({
            "pi_0": {"friendly_name": "Front", "type": "pi"},
            "pi_1": {"friendly_name": "Side Left", "type": "pi"},
            "usb_0": {"friendly_name": "Top", "type": "usb"}
        }),
    )
    .await;
    mount_camera(server, "pi_0", "pi", true, json!([60, 500]), json!(["640x480", "1280x720"])).await;
    mount_camera(server, "pi_1", "pi", true, json!([0, 0]), json!(["1920x1080", "1280x720"])).await;
    mount_camera(server, "usb_0", "usb", false, json!("unavailable"), json!(["640x480"])).await;
}

/// JSON bodies of every request with a body received on `route`.
pub async fn bodies(server: &MockServer, route: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r: &&Request| r.url.path() == route && !r.body.is_empty())
        .map(|r| serde_json::from_slice(&r.body).expect("json body"))
        .collect()
}

pub async fn count(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}

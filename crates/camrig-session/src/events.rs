//! Live event channel over the backend's `/ws` WebSocket.
//!
//! The channel reconnects forever with a fixed backoff. New-file events are
//! de-duplicated against [`KnownFiles`]; MQTT log lines go to an
//! [`MqttLogView`]. A status-only observer uses the same loop without a
//! dispatcher and only drives its connection indicator.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use camrig_models::WsEvent;
use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::activity::ActivityLog;
use crate::known_files::KnownFiles;
use crate::metrics::record_reconnect;

/// Connection indicator of a WebSocket channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        *self == ConnectionState::Open
    }
}

/// Placeholder shown before the first MQTT log line arrives.
pub const MQTT_LOG_PLACEHOLDER: &str = "Waiting for events...";

/// Secondary log view fed by `mqtt_log` events.
#[derive(Clone, Default)]
pub struct MqttLogView {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MqttLogView {
    pub fn push(&self, line: impl Into<String>) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.into());
    }

    /// Displayed lines; the placeholder until the first message.
    pub fn lines(&self) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.is_empty() {
            vec![MQTT_LOG_PLACEHOLDER.to_string()]
        } else {
            lines.clone()
        }
    }

    pub fn has_events(&self) -> bool {
        !self
            .lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

/// Applies backend events to session state.
#[derive(Clone)]
pub struct EventDispatcher {
    known_files: KnownFiles,
    activity: ActivityLog,
    mqtt_log: MqttLogView,
}

impl EventDispatcher {
    pub fn new(known_files: KnownFiles, activity: ActivityLog, mqtt_log: MqttLogView) -> Self {
        Self {
            known_files,
            activity,
            mqtt_log,
        }
    }

    /// Handle one text frame. Malformed frames are logged and skipped.
    pub fn handle_text(&self, text: &str) -> Option<WsEvent> {
        let event = match serde_json::from_str::<WsEvent>(text) {
            Ok(event) => event,
            Err(e) => {
                warn!("Ignoring malformed event: {}", e);
                return None;
            }
        };
        self.dispatch(&event);
        Some(event)
    }

    pub fn dispatch(&self, event: &WsEvent) {
        match event {
            WsEvent::NewFile { filename, .. } => {
                let source = event.source().unwrap_or_default();
                if !event.is_local() {
                    self.activity.info(format!("[{}] Saved: {}", source, filename));
                }
                self.known_files.surface(filename, source);
            }
            WsEvent::MqttLog { message } => {
                self.mqtt_log.push(message.clone());
            }
            WsEvent::Unknown => debug!("Ignoring unknown event type"),
        }
    }
}

/// Handle to a running channel. Dropping it stops the channel.
pub struct EventChannel {
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl EventChannel {
    /// Start the data channel.
    pub fn spawn(url: url::Url, backoff: Duration, dispatcher: EventDispatcher) -> Self {
        Self::start("events", url, backoff, Some(dispatcher))
    }

    /// Start a channel that only tracks connectivity.
    pub fn observer(url: url::Url, backoff: Duration) -> Self {
        Self::start("status", url, backoff, None)
    }

    fn start(
        name: &'static str,
        url: url::Url,
        backoff: Duration,
        dispatcher: Option<EventDispatcher>,
    ) -> Self {
        let (tx, rx) = watch::channel(ConnectionState::Connecting);
        let task = tokio::spawn(run_channel(name, url, backoff, dispatcher, tx));
        Self { state: rx, task }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Wait until the channel reaches `target`.
    pub async fn wait_for(&self, target: ConnectionState) -> bool {
        let mut rx = self.state.clone();
        let reached = rx.wait_for(|s| *s == target).await.is_ok();
        reached
    }
}

impl Drop for EventChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_channel(
    name: &'static str,
    url: url::Url,
    backoff: Duration,
    dispatcher: Option<EventDispatcher>,
    state: watch::Sender<ConnectionState>,
) {
    info!(channel = name, url = %url, "Starting WebSocket channel");

    loop {
        state.send_replace(ConnectionState::Connecting);

        match connect_async(url.as_str()).await {
            Ok((mut stream, _)) => {
                info!(channel = name, "WebSocket connected");
                state.send_replace(ConnectionState::Open);

                while let Some(frame) = stream.next().await {
                    match frame {
                        Ok(Message::Text(text)) => {
                            if let Some(dispatcher) = &dispatcher {
                                dispatcher.handle_text(&text);
                            }
                        }
                        Ok(Message::Close(_)) => break,
                        Ok(_) => {}
                        Err(e) => {
                            warn!(channel = name, "WebSocket error: {}", e);
                            break;
                        }
                    }
                }
                info!(channel = name, "WebSocket disconnected, retrying in {:?}", backoff);
            }
            Err(e) => {
                debug!(channel = name, "WebSocket connect failed: {}", e);
            }
        }

        state.send_replace(ConnectionState::Closed);
        record_reconnect(name);
        tokio::time::sleep(backoff).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher() -> (EventDispatcher, KnownFiles, ActivityLog, MqttLogView) {
        let known = KnownFiles::new(20);
        let activity = ActivityLog::default();
        let log = MqttLogView::default();
        (
            EventDispatcher::new(known.clone(), activity.clone(), log.clone()),
            known,
            activity,
            log,
        )
    }

    #[test]
    fn test_new_file_surfaces_once() {
        let (d, known, _, _) = dispatcher();
        let frame = r#"{"type":"new_file","filename":"images/default/a.jpg"}"#;
        d.handle_text(frame);
        d.handle_text(frame);
        assert_eq!(known.recent(), vec!["images/default/a.jpg"]);
    }

    #[test]
    fn test_external_sources_are_logged() {
        let (d, _, activity, _) = dispatcher();
        d.handle_text(r#"{"type":"new_file","filename":"a.jpg","source":"WebUI"}"#);
        assert!(activity.entries().is_empty());

        d.handle_text(r#"{"type":"new_file","filename":"b.jpg","source":"MQTT"}"#);
        d.handle_text(r#"{"type":"new_file","filename":"c.jpg"}"#);
        let messages: Vec<String> = activity.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["[MQTT] Saved: b.jpg", "[WS] Saved: c.jpg"]);
    }

    #[test]
    fn test_mqtt_log_replaces_placeholder() {
        let (d, _, _, log) = dispatcher();
        assert_eq!(log.lines(), vec![MQTT_LOG_PLACEHOLDER]);
        d.handle_text(r#"{"type":"mqtt_log","message":"trigger received"}"#);
        assert_eq!(log.lines(), vec!["trigger received"]);
        assert!(log.has_events());
    }

    #[test]
    fn test_unknown_and_malformed_frames_are_ignored() {
        let (d, known, activity, log) = dispatcher();
        assert_eq!(d.handle_text(r#"{"type":"heartbeat"}"#), Some(WsEvent::Unknown));
        assert_eq!(d.handle_text("not json"), None);
        assert!(known.is_empty());
        assert!(activity.entries().is_empty());
        assert!(!log.has_events());
    }
}

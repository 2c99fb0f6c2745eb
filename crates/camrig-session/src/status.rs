//! Backend status monitor and MQTT bridge settings.

use std::sync::Arc;
use std::time::Duration;

use camrig_client::BackendClient;
use camrig_models::{MqttConfig, MqttStatus, MqttTestResult, SystemStats};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::activity::ActivityLog;
use crate::error::SessionResult;

/// Latest MQTT link and host statistics, published through watch channels.
///
/// A failed poll publishes `None` so indicators fall back to "unknown".
pub struct StatusMonitor {
    client: BackendClient,
    activity: ActivityLog,
    mqtt: watch::Sender<Option<MqttStatus>>,
    stats: watch::Sender<Option<SystemStats>>,
}

impl StatusMonitor {
    pub fn new(client: BackendClient, activity: ActivityLog) -> Self {
        let (mqtt, _) = watch::channel(None);
        let (stats, _) = watch::channel(None);
        Self {
            client,
            activity,
            mqtt,
            stats,
        }
    }

    pub fn mqtt_status(&self) -> Option<MqttStatus> {
        self.mqtt.borrow().clone()
    }

    pub fn system_stats(&self) -> Option<SystemStats> {
        self.stats.borrow().clone()
    }

    pub fn subscribe_mqtt(&self) -> watch::Receiver<Option<MqttStatus>> {
        self.mqtt.subscribe()
    }

    pub fn subscribe_stats(&self) -> watch::Receiver<Option<SystemStats>> {
        self.stats.subscribe()
    }

    /// Whether the grid view should be offered, from the latest stats.
    pub fn offers_grid(&self) -> bool {
        self.stats
            .borrow()
            .as_ref()
            .map_or(true, SystemStats::offers_grid)
    }

    pub async fn poll_mqtt(&self) -> Option<MqttStatus> {
        let status = match self.client.mqtt_status().await {
            Ok(status) => Some(status),
            Err(e) => {
                debug!("MQTT status poll failed: {}", e);
                None
            }
        };
        self.mqtt.send_replace(status.clone());
        status
    }

    pub async fn poll_stats(&self) -> Option<SystemStats> {
        let stats = match self.client.system_stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                debug!("System stats poll failed: {}", e);
                None
            }
        };
        self.stats.send_replace(stats.clone());
        stats
    }

    /// Start the MQTT and statistics pollers.
    pub fn spawn(self: Arc<Self>, mqtt_every: Duration, stats_every: Duration) -> [JoinHandle<()>; 2] {
        info!(
            "Starting status monitor (mqtt: {:?}, stats: {:?})",
            mqtt_every, stats_every
        );

        let monitor = Arc::clone(&self);
        let mqtt = tokio::spawn(async move {
            let mut ticker = interval(mqtt_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                monitor.poll_mqtt().await;
            }
        });

        let stats = tokio::spawn(async move {
            let mut ticker = interval(stats_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.poll_stats().await;
            }
        });

        [mqtt, stats]
    }

    // =========================================================================
    // MQTT configuration
    // =========================================================================

    pub async fn mqtt_config(&self) -> SessionResult<MqttConfig> {
        Ok(self.client.mqtt_config().await?)
    }

    /// Validate and save MQTT settings.
    pub async fn save_mqtt_config(&self, config: &MqttConfig) -> SessionResult<()> {
        match self.client.save_mqtt_config(config).await {
            Ok(ack) => {
                self.activity.info(
                    ack.text()
                        .map(str::to_string)
                        .unwrap_or_else(|| "MQTT settings saved".to_string()),
                );
                Ok(())
            }
            Err(e) => {
                self.activity
                    .error(format!("Saving MQTT settings failed: {}", e.user_message()));
                Err(e.into())
            }
        }
    }

    /// Ask the backend to test its broker connection.
    pub async fn test_mqtt(&self) -> SessionResult<MqttTestResult> {
        let result = self.client.test_mqtt().await?;
        if result.is_connected() {
            self.activity.info("MQTT connection test succeeded");
        } else {
            self.activity
                .error(format!("MQTT connection test failed: {}", result.detail));
        }
        Ok(result)
    }
}

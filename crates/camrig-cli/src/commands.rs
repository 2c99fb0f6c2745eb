//! Subcommand handlers.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use camrig_client::{BackendClient, ClientConfig};
use camrig_models::{display_path, MqttConfig, StatLevel, SystemStats};
use camrig_session::{
    CapturePhase, ConnectionState, EventChannel, Session, SessionConfig,
};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cli::{Cli, Commands, DirsCommands, MqttCommands};

/// How long `status` waits for the WebSocket observer to connect.
const WS_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Build a session from the environment, with CLI flags taking precedence.
pub fn build_session(backend_url: Option<&str>) -> Result<Session> {
    let mut config = ClientConfig::from_env();
    if let Some(url) = backend_url {
        config.base_url = url.trim_end_matches('/').to_string();
    }
    info!("Backend: {}", config.base_url);

    let client = BackendClient::new(config).context("Failed to create backend client")?;
    Ok(Session::new(client, SessionConfig::from_env()))
}

pub async fn run(cli: Cli) -> Result<()> {
    let session = build_session(cli.backend_url.as_deref())?;
    let json = cli.json;

    match cli.command {
        Commands::Cameras => cameras(&session, json).await,
        Commands::CaptureAll { prefix, delay } => capture_all(&session, &prefix, delay).await,
        Commands::Capture {
            camera,
            subfolder,
            prefix,
            delay,
        } => {
            capture(
                &session,
                &camera,
                subfolder.as_deref(),
                prefix.as_deref(),
                delay,
            )
            .await
        }
        Commands::Watch => watch(&session).await,
        Commands::Gallery => gallery(&session, json).await,
        Commands::Delete { files, yes } => delete(&session, &files, yes).await,
        Commands::Dirs(cmd) => dirs(&session, cmd, json).await,
        Commands::Status => status(&session, json).await,
        Commands::Mqtt(cmd) => mqtt(&session, cmd, json).await,
        Commands::SaveSettings {
            camera,
            resolution,
            shutter,
            autofocus,
            prefix,
        } => {
            load_cameras(&session).await?;
            let view = session
                .select_camera(Some(&camera))
                .await?
                .context("No camera selected")?;
            let control = view.control();

            if let Some(resolution) = resolution {
                control.set_resolution(&resolution)?;
            }
            if let Some(shutter) = shutter {
                control.set_shutter_speed(shutter)?;
            }
            if let Some(prefix) = prefix {
                control.set_prefix(&prefix);
            }
            if let Some(enabled) = autofocus {
                view.set_autofocus(enabled).await?;
            }

            session.save_settings().await?;
            println!("Settings saved for {}", control.friendly_name());
            Ok(())
        }
    }
}

async fn load_cameras(session: &Session) -> Result<()> {
    session
        .load_cameras()
        .await
        .context("Failed to load cameras")?;
    Ok(())
}

async fn cameras(session: &Session, json: bool) -> Result<()> {
    let registry = session
        .load_cameras()
        .await
        .context("Failed to load cameras")?;

    if json {
        let cameras = registry
            .iter()
            .map(|(path, camera)| {
                let state = camera.control.snapshot();
                let caps = camera.control.capabilities();
                json!({
                    "camera_path": path.as_str(),
                    "friendly_name": camera.descriptor.friendly_name,
                    "type": camera.descriptor.kind,
                    "capabilities_known": caps.is_known(),
                    "has_autofocus": caps.has_autofocus(),
                    "resolutions": caps.resolutions(),
                    "shutter_options": caps.shutter().options().iter().map(|s| s.to_string()).collect::<Vec<_>>(),
                    "resolution": state.resolution,
                    "save_subfolder": state.save_subfolder,
                    "focus": camera.control.focus_status().to_string(),
                })
            })
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&cameras)?);
        return Ok(());
    }

    if registry.is_empty() {
        println!("No cameras detected");
        return Ok(());
    }

    for (path, camera) in registry.iter() {
        let state = camera.control.snapshot();
        let caps = camera.control.capabilities();
        let resolution = if state.resolution.is_empty() {
            "-"
        } else {
            state.resolution.as_str()
        };
        println!(
            "{:<12} {:<20} {:<10} {:<8} save to {}",
            path.as_str(),
            camera.descriptor.friendly_name,
            resolution,
            camera.control.focus_status(),
            state.save_subfolder
        );
        if !caps.is_known() {
            println!("{:<12} capabilities unavailable", "");
        }
    }
    Ok(())
}

async fn capture_all(session: &Session, prefix: &str, delay: u32) -> Result<()> {
    load_cameras(session).await?;

    let progress = print_progress(session);
    let result = session.capture_all(prefix, delay).await;
    progress.abort();

    let summary = result?;
    println!("{}", summary.message);
    for file in &summary.captured_files {
        println!("  {}", file);
    }
    Ok(())
}

async fn capture(
    session: &Session,
    camera: &str,
    subfolder: Option<&str>,
    prefix: Option<&str>,
    delay: u32,
) -> Result<()> {
    load_cameras(session).await?;

    let progress = print_progress(session);
    let result = session.capture_one(camera, subfolder, prefix, delay).await;
    progress.abort();

    let summary = result?;

    match &summary.filename {
        Some(filename) => println!("Saved {}", filename),
        None => println!("Capture complete"),
    }
    if let Some(count) = summary.capture_count {
        println!("Captures this session: {}", count);
    }
    Ok(())
}

/// Echo countdown and capture phases until aborted.
fn print_progress(session: &Session) -> JoinHandle<()> {
    let mut phase = session.orchestrator().subscribe();
    tokio::spawn(async move {
        while phase.changed().await.is_ok() {
            let current = *phase.borrow_and_update();
            match current {
                CapturePhase::CountingDown { remaining } => println!("{}...", remaining),
                CapturePhase::Capturing => println!("Capturing..."),
                CapturePhase::Idle => {}
            }
        }
    })
}

async fn watch(session: &Session) -> Result<()> {
    let mut activity = session.activity().subscribe();
    let mut files = session.known_files().subscribe();

    session.start_background()?;
    let mut state = session
        .subscribe_events_state()
        .context("Event channel did not start")?;

    println!("Watching for events (Ctrl+C to stop)");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                println!("[ws] {}", connection_label(current));
            }
            entry = activity.recv() => match entry {
                Ok(entry) => println!("{}", entry),
                Err(RecvError::Lagged(n)) => debug!("Skipped {} activity entries", n),
                Err(RecvError::Closed) => break,
            },
            file = files.recv() => match file {
                Ok(file) => println!("[{}] {}", file.source, file.filename),
                Err(RecvError::Lagged(n)) => debug!("Skipped {} file notifications", n),
                Err(RecvError::Closed) => break,
            },
        }
    }

    session.shutdown();
    Ok(())
}

async fn gallery(session: &Session, json: bool) -> Result<()> {
    session
        .gallery()
        .refresh()
        .await
        .context("Failed to load captures")?;
    let files = session.gallery().files();

    if json {
        println!("{}", serde_json::to_string_pretty(&files)?);
    } else if files.is_empty() {
        println!("No images yet");
    } else {
        for file in files {
            println!("{}", file);
        }
    }
    Ok(())
}

async fn delete(session: &Session, files: &[String], yes: bool) -> Result<()> {
    let gallery = session.gallery();
    for file in files {
        if !gallery.is_selected(file) {
            gallery.toggle(file);
        }
    }

    let report = gallery
        .delete_selected(|n| yes || confirm(&format!("Delete {} selected images?", n)))
        .await?;
    let Some(report) = report else {
        println!("Cancelled");
        return Ok(());
    };

    println!("Deleted {} images.", report.deleted_count);
    for error in &report.errors {
        eprintln!("  {}", error);
    }
    report.into_result()?;
    Ok(())
}

async fn dirs(session: &Session, cmd: DirsCommands, json: bool) -> Result<()> {
    let mut browser = session.browser();

    match cmd {
        DirsCommands::Ls { path } => {
            let entries = browser.list(&path).await?.to_vec();
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }
            println!("{}", display_path(browser.current_path()));
            for entry in entries {
                println!("  {}/", entry);
            }
        }
        DirsCommands::Mkdir { path } => {
            let path = path.trim_matches('/');
            let (parent, name) = path.rsplit_once('/').unwrap_or(("", path));
            browser.list(parent).await?;
            browser.create_directory(name).await?;
            println!("Created {}", display_path(path));
        }
        DirsCommands::Rm { path, yes } => {
            let deleted = browser
                .delete_directory(&path, |p| {
                    yes || confirm(&format!("Delete folder {} and everything in it?", display_path(p)))
                })
                .await?;
            if deleted {
                println!("Deleted {}", display_path(&path));
            } else {
                println!("Cancelled");
            }
        }
    }
    Ok(())
}

async fn status(session: &Session, json: bool) -> Result<()> {
    let monitor = session.status();
    let (stats, mqtt) = tokio::join!(monitor.poll_stats(), monitor.poll_mqtt());

    let ws_url = session.client().ws_url()?;
    let observer = EventChannel::observer(ws_url, session.config().status_ws_backoff);
    let ws_connected = tokio::time::timeout(WS_CONNECT_TIMEOUT, observer.wait_for(ConnectionState::Open))
        .await
        .unwrap_or(false);
    drop(observer);

    if json {
        let value = json!({
            "system": stats,
            "mqtt": mqtt,
            "websocket": ws_connected,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match &stats {
        Some(stats) => print_stats(stats),
        None => println!("System: unavailable"),
    }
    match &mqtt {
        Some(m) if m.connected => println!(
            "MQTT:   connected to {} ({})",
            m.broker.as_deref().unwrap_or("?"),
            m.topic.as_deref().unwrap_or("?")
        ),
        Some(_) => println!("MQTT:   disconnected"),
        None => println!("MQTT:   unknown"),
    }
    println!(
        "WS:     {}",
        if ws_connected { "connected" } else { "unreachable" }
    );
    Ok(())
}

fn print_stats(stats: &SystemStats) {
    println!("CPU:    {:.1}% [{}]", stats.cpu, stats.cpu_level());
    println!("RAM:    {:.1}% [{}]", stats.ram.percent, stats.ram_level());
    match stats.temp {
        Some(temp) => println!("Temp:   {:.1}C [{}]", temp, stats.temp_level()),
        None => println!("Temp:   {}", StatLevel::Unknown),
    }
    if let Some(count) = stats.camera_count {
        println!("Cameras: {}", count);
    }
    if !stats.offers_grid() {
        println!("Single camera host; grid view not offered");
    }
}

async fn mqtt(session: &Session, cmd: MqttCommands, json: bool) -> Result<()> {
    let monitor = session.status();

    match cmd {
        MqttCommands::Show => {
            let config = monitor.mqtt_config().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&redacted(&config))?);
            } else {
                println!("Broker:   {}:{}", config.broker, config.port);
                println!("Topic:    {}", config.topic);
                println!(
                    "Username: {}",
                    config.username.as_deref().unwrap_or("(none)")
                );
            }
        }
        MqttCommands::Set {
            broker,
            port,
            topic,
            username,
            password,
        } => {
            if broker.is_none()
                && port.is_none()
                && topic.is_none()
                && username.is_none()
                && password.is_none()
            {
                bail!("Nothing to change; pass at least one setting");
            }

            let mut config = monitor.mqtt_config().await?;
            if let Some(broker) = broker {
                config.broker = broker;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(topic) = topic {
                config.topic = topic;
            }
            if username.is_some() {
                config.username = username;
            }
            if password.is_some() {
                config.password = password;
            }

            monitor.save_mqtt_config(&config).await?;
            if let Some(entry) = session.activity().last() {
                println!("{}", entry.message);
            }
        }
        MqttCommands::Test => {
            let result = monitor.test_mqtt().await?;
            if result.is_connected() {
                println!("Connected");
            } else {
                bail!("Disconnected: {}", result.detail);
            }
        }
    }
    Ok(())
}

fn redacted(config: &MqttConfig) -> MqttConfig {
    MqttConfig {
        password: config.password.as_ref().map(|_| "********".to_string()),
        ..config.clone()
    }
}

fn connection_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Connecting => "connecting",
        ConnectionState::Open => "connected",
        ConnectionState::Closed => "disconnected",
    }
}

/// Ask a yes/no question on stdin. Anything but `y`/`yes` declines.
fn confirm(question: &str) -> bool {
    print!("{} [y/N] ", question);
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    is_yes(&answer)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
    }

    #[test]
    fn test_redacted_hides_password_only() {
        let config = MqttConfig {
            username: Some("rig".into()),
            password: Some("secret".into()),
            ..MqttConfig::default()
        };
        let shown = redacted(&config);
        assert_eq!(shown.username.as_deref(), Some("rig"));
        assert_eq!(shown.password.as_deref(), Some("********"));
        assert_eq!(redacted(&MqttConfig::default()).password, None);
    }

    #[test]
    fn test_backend_flag_overrides_env() {
        let session = build_session(Some("http://rig.local:8000/")).unwrap();
        assert_eq!(session.client().base_url(), "http://rig.local:8000");
    }
}

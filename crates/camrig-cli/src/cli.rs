//! Command-line arguments.

use camrig_models::ShutterSpeed;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "camrig")]
#[command(about = "Coordinate capture sessions across a multi-camera rig", long_about = None)]
pub struct Cli {
    /// Backend base URL (overrides CAMRIG_BACKEND_URL)
    #[arg(long, global = true, env = "CAMRIG_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered cameras and their capabilities
    Cameras,

    /// Capture from every camera at once
    CaptureAll {
        /// Filename prefix
        #[arg(long, default_value = "IMG")]
        prefix: String,

        /// Countdown in seconds before the shutter fires
        #[arg(long, default_value_t = 0)]
        delay: u32,
    },

    /// Capture from one camera
    Capture {
        /// Camera path or friendly name
        camera: String,

        /// Save location relative to the storage root
        #[arg(long)]
        subfolder: Option<String>,

        /// Filename prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Countdown in seconds before the shutter fires
        #[arg(long, default_value_t = 0)]
        delay: u32,
    },

    /// Follow live events until interrupted
    Watch,

    /// Show the most recent captures
    Gallery,

    /// Delete captured images
    Delete {
        /// Filenames as listed by `gallery`
        #[arg(required = true)]
        files: Vec<String>,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Browse and manage storage folders
    #[command(subcommand)]
    Dirs(DirsCommands),

    /// Show MQTT link and host statistics
    Status,

    /// Inspect and change the MQTT bridge
    #[command(subcommand)]
    Mqtt(MqttCommands),

    /// Persist a camera's settings on the backend
    SaveSettings {
        /// Camera path or friendly name
        camera: String,

        #[arg(long)]
        resolution: Option<String>,

        /// "Auto" or a fraction such as 1/250
        #[arg(long)]
        shutter: Option<ShutterSpeed>,

        #[arg(long)]
        autofocus: Option<bool>,

        #[arg(long)]
        prefix: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum DirsCommands {
    /// List the folders under a path
    Ls {
        #[arg(default_value = "")]
        path: String,
    },

    /// Create a folder; the last path segment is the new folder's name
    Mkdir { path: String },

    /// Delete a folder and its contents
    Rm {
        path: String,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum MqttCommands {
    /// Show the current bridge settings
    Show,

    /// Change bridge settings; omitted fields keep their value
    Set {
        #[arg(long)]
        broker: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        #[arg(long)]
        topic: Option<String>,

        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        password: Option<String>,
    },

    /// Ask the backend to test its broker connection
    Test,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_capture_all_defaults() {
        let cli = Cli::try_parse_from(["camrig", "capture-all"]).unwrap();
        match cli.command {
            Commands::CaptureAll { prefix, delay } => {
                assert_eq!(prefix, "IMG");
                assert_eq!(delay, 0);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_save_settings_parses_shutter() {
        let cli = Cli::try_parse_from([
            "camrig",
            "save-settings",
            "Front",
            "--shutter",
            "1/250",
            "--autofocus",
            "false",
        ])
        .unwrap();
        match cli.command {
            Commands::SaveSettings {
                camera,
                shutter,
                autofocus,
                ..
            } => {
                assert_eq!(camera, "Front");
                assert_eq!(shutter, Some(ShutterSpeed::Fraction(250)));
                assert_eq!(autofocus, Some(false));
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(Cli::try_parse_from(["camrig", "save-settings", "Front", "--shutter", "fast"]).is_err());
    }

    #[test]
    fn test_capture_delay() {
        let cli = Cli::try_parse_from(["camrig", "capture", "Top", "--delay", "3"]).unwrap();
        assert!(matches!(cli.command, Commands::Capture { delay: 3, .. }));
        let cli = Cli::try_parse_from(["camrig", "capture", "Top"]).unwrap();
        assert!(matches!(cli.command, Commands::Capture { delay: 0, .. }));
    }

    #[test]
    fn test_delete_requires_files() {
        assert!(Cli::try_parse_from(["camrig", "delete"]).is_err());
        let cli = Cli::try_parse_from(["camrig", "delete", "a.jpg", "b.jpg", "-y"]).unwrap();
        assert!(matches!(cli.command, Commands::Delete { ref files, yes: true } if files.len() == 2));
    }

    #[test]
    fn test_global_backend_url() {
        let cli = Cli::try_parse_from(["camrig", "dirs", "ls", "--backend-url", "http://rig:8000"]).unwrap();
        assert_eq!(cli.backend_url.as_deref(), Some("http://rig:8000"));
        assert!(matches!(cli.command, Commands::Dirs(DirsCommands::Ls { ref path }) if path.is_empty()));
    }
}

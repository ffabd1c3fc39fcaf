//! Command-line arguments. Flags override the config file.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use skelstream_networking::{ConfigError, ServerConfig, SourceConfig};

/// `pose_server` arguments.
#[derive(Parser, Debug, Default)]
#[command(name = "pose_server")]
#[command(about = "Stream skeletal poses to every connected client")]
#[command(version)]
pub struct ServerArgs {
    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listening address
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,

    /// Frames per second per client
    #[arg(long)]
    pub fps: Option<u32>,

    /// Stream the procedural source with this many bones
    #[arg(long, conflicts_with = "clip")]
    pub bones: Option<usize>,

    /// Stream a JSON motion clip
    #[arg(long)]
    pub clip: Option<PathBuf>,

    /// Hold the last frame instead of looping
    #[arg(long)]
    pub no_loop: bool,

    /// Prefix frames with the 12-byte header
    #[arg(long)]
    pub frame_header: bool,
}

impl ServerArgs {
    /// Reads the config file (or defaults) and applies the flags.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is unreadable or the merged
    /// configuration is out of range.
    pub fn resolve(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(fps) = self.fps {
            config.frame_rate = fps;
        }
        if let Some(bones) = self.bones {
            config.source = SourceConfig::Procedural { bones };
        }
        if let Some(path) = &self.clip {
            config.source = SourceConfig::Clip { path: path.clone() };
        }
        if self.no_loop {
            config.looping = false;
        }
        if self.frame_header {
            config.frame_header = true;
        }

        config.validate()?;
        Ok(config)
    }
}

/// `pose_probe` arguments.
#[derive(Parser, Debug)]
#[command(name = "pose_probe")]
#[command(about = "Connect to a pose server and report what arrives")]
#[command(version)]
pub struct ProbeArgs {
    /// Server address
    #[arg(default_value = "127.0.0.1:8000")]
    pub addr: SocketAddr,

    /// Frames to receive before reporting
    #[arg(short = 'n', long, default_value_t = 90)]
    pub frames: u32,
}

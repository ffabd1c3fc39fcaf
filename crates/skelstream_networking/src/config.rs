//! # Server Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file is a valid configuration.
//!
//! ```toml
//! bind = "0.0.0.0:8000"
//! frame_rate = 30
//! max_clients = 64
//! send_timeout_ms = 50
//!
//! [source]
//! kind = "clip"
//! path = "clips/walk.json"
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pacing::PacingConfig;
use crate::streaming::StreamConfig;
use crate::{COARSE_SLEEP_THRESHOLD, DEFAULT_FRAME_RATE, DEFAULT_PORT, DEFAULT_SEND_TIMEOUT, SLEEP_MARGIN};

/// Bone count of the default procedural source.
pub const DEFAULT_PROCEDURAL_BONES: usize = 50;

/// Where poses come from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Endless synthesized motion.
    Procedural {
        /// Number of bones.
        #[serde(default = "default_bones")]
        bones: usize,
    },
    /// Keyframed motion clip loaded from a JSON document.
    Clip {
        /// Clip document path.
        path: PathBuf,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Procedural {
            bones: DEFAULT_PROCEDURAL_BONES,
        }
    }
}

const fn default_bones() -> usize {
    DEFAULT_PROCEDURAL_BONES
}

/// Server configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listening address.
    pub bind: SocketAddr,
    /// Frames per second per connection.
    pub frame_rate: u32,
    /// Concurrent connection cap; extra connections are refused.
    pub max_clients: usize,
    /// Per-frame send bound in milliseconds; a slower send drops the frame.
    pub send_timeout_ms: u64,
    /// Remaining time above which the pacer sleeps, in microseconds.
    pub coarse_sleep_threshold_us: u64,
    /// How early the coarse sleep wakes, in microseconds.
    pub sleep_margin_us: u64,
    /// Whether finite sources restart at the end.
    pub looping: bool,
    /// Prefix each frame with a [`FrameHeader`](crate::FrameHeader).
    pub frame_header: bool,
    /// Interval of the per-connection stats log line, in milliseconds.
    pub stats_interval_ms: u64,
    /// Pose source shared by every connection.
    pub source: SourceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            frame_rate: DEFAULT_FRAME_RATE,
            max_clients: 64,
            send_timeout_ms: duration_ms(DEFAULT_SEND_TIMEOUT),
            coarse_sleep_threshold_us: duration_us(COARSE_SLEEP_THRESHOLD),
            sleep_margin_us: duration_us(SLEEP_MARGIN),
            looping: true,
            frame_header: false,
            stats_interval_ms: 1_000,
            source: SourceConfig::default(),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn duration_ms(d: Duration) -> u64 {
    d.as_millis() as u64
}

#[allow(clippy::cast_possible_truncation)]
const fn duration_us(d: Duration) -> u64 {
    d.as_micros() as u64
}

impl ServerConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on bad syntax or unknown keys, and
    /// [`ConfigError::Invalid`] when a value is out of range.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// A relative clip path is taken relative to the file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, otherwise as
    /// [`ServerConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;

        // Clip paths in a file are relative to that file.
        if let SourceConfig::Clip { path: clip } = &mut config.source {
            if clip.is_relative() {
                if let Some(dir) = path.parent() {
                    *clip = dir.join(&*clip);
                }
            }
        }

        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_rate == 0 {
            return Err(ConfigError::Invalid("frame_rate must be at least 1".into()));
        }
        if self.max_clients == 0 {
            return Err(ConfigError::Invalid("max_clients must be at least 1".into()));
        }
        if self.send_timeout_ms == 0 {
            return Err(ConfigError::Invalid("send_timeout_ms must be at least 1".into()));
        }
        if self.sleep_margin_us >= self.coarse_sleep_threshold_us {
            return Err(ConfigError::Invalid(format!(
                "sleep_margin_us ({}) must be below coarse_sleep_threshold_us ({})",
                self.sleep_margin_us, self.coarse_sleep_threshold_us
            )));
        }
        if let SourceConfig::Procedural { bones: 0 } = self.source {
            return Err(ConfigError::Invalid("procedural source needs at least one bone".into()));
        }
        Ok(())
    }

    /// Frame period derived from `frame_rate`.
    #[must_use]
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }

    /// Pacing parameters for one connection.
    #[must_use]
    pub fn pacing(&self) -> PacingConfig {
        PacingConfig {
            period: self.frame_period(),
            coarse_threshold: Duration::from_micros(self.coarse_sleep_threshold_us),
            sleep_margin: Duration::from_micros(self.sleep_margin_us),
        }
    }

    /// Streaming loop parameters for one connection.
    #[must_use]
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            pacing: self.pacing(),
            send_timeout: Duration::from_millis(self.send_timeout_ms),
            stats_interval: Duration::from_millis(self.stats_interval_ms),
        }
    }
}

//! # Networking Error Types
//!
//! Transport errors stay local to one connection. Server errors are fatal to
//! startup.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use skelstream_core::{AnimatorError, InitError};
use thiserror::Error;

/// Failure delivering bytes to one client.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The peer went away or the transport was closed.
    #[error("transport disconnected")]
    Disconnected,

    /// A frame larger than the slot sized at connect time.
    #[error("frame of {len} bytes exceeds transport slot of {capacity}")]
    FrameTooLarge {
        /// Offered frame length.
        len: usize,
        /// Slot capacity.
        capacity: usize,
    },

    /// Handshake could not be encoded or decoded.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Socket error.
    #[error("transport I/O: {0}")]
    Io(#[from] io::Error),
}

/// Failure inside one streaming loop.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Send failed or connection reset.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The Animator rejected a frame write.
    #[error("animator failure: {0}")]
    Animator(#[from] AnimatorError),

    /// Anything else, including a panicked stream task.
    #[error("unexpected stream failure: {0}")]
    Unexpected(String),
}

/// Failure loading the server configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {path}: {source}")]
    Read {
        /// Config path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The file is not valid TOML for [`ServerConfig`](crate::ServerConfig).
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Startup failure of the server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Bad configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The motion source could not be attached.
    #[error("motion source failed to load: {0}")]
    Init(#[from] InitError),

    /// The prototype Animator is unusable.
    #[error("animator rejected: {0}")]
    Animator(#[from] AnimatorError),

    /// The listening socket could not be bound.
    #[error("cannot bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying error.
        source: io::Error,
    },

    /// Accept loop I/O failure.
    #[error("server I/O: {0}")]
    Io(#[from] io::Error),
}

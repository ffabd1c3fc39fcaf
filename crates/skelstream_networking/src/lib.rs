//! # SKELSTREAM Networking
//!
//! Streams per-frame skeletal poses to every connected client at a fixed
//! rate.
//!
//! ## Architecture
//!
//! ```text
//!                 PoseServer (accept loop)
//!                        │ one task per client
//!        ┌───────────────┼───────────────┐
//!        ▼               ▼               ▼
//!  StreamingLoop   StreamingLoop   StreamingLoop
//!   ├ Player        ├ Player        ├ Player
//!   │  └ FrameBuffer│  └ FrameBuffer│  └ FrameBuffer
//!   └ Transport     └ Transport     └ Transport
//!        ▲               ▲               ▲
//!        └─────── Arc<Skeleton / MotionClip> (read-only) ───────┘
//! ```
//!
//! ## Per-Tick Contract
//!
//! 1. Measure wall-clock `dt` since the previous tick
//! 2. `Player::update(dt)` writes the frame in place
//! 3. The frame view goes to the transport as one binary message
//! 4. Wait for the next anchor-based target: coarse sleep, then spin
//!
//! ## Wire Format
//!
//! ```text
//! SERVER                                   CLIENT
//!   |--- u32 len + JSON handshake -------->|  skeleton, frame_bytes, rate
//!   |--- frame (num_bones × 64 bytes) ---->|
//!   |--- frame ---------------------------->|
//!   |              ...                     |
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use skelstream_core::{Animator, ProceduralAnimator};
//! use skelstream_networking::{PoseServer, ServerConfig};
//!
//! let mut animator = ProceduralAnimator::new(50);
//! animator.initialize("procedural")?;
//!
//! let server = Arc::new(PoseServer::new(ServerConfig::default(), animator)?);
//! let listener = server.bind().await?;
//! server.serve(listener).await?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod cancel;
pub mod config;
pub mod error;
pub mod pacing;
pub mod protocol;
pub mod server;
pub mod streaming;
pub mod transport;

use std::time::Duration;

// Re-exports for convenience
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use config::{ServerConfig, SourceConfig};
pub use error::{ConfigError, ServerError, StreamError, TransportError};
pub use pacing::{FramePacer, PacingConfig, PacingStats, WaitOutcome};
pub use protocol::{FrameHeader, Handshake, FRAME_MAGIC, SCHEMA_VERSION};
pub use server::{ConnectionId, ConnectionRegistry, ConnectionState, PoseServer};
pub use streaming::{StreamConfig, StreamExit, StreamReport, StreamingLoop};
pub use transport::{FrameMailbox, FrameTransport, TcpFrameTransport, TransportStats};

/// Reference stream rate (frames per second).
///
/// At 30Hz, each frame is ~33.33ms.
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Remaining time above which the pacer suspends instead of spinning.
pub const COARSE_SLEEP_THRESHOLD: Duration = Duration::from_micros(2_000);

/// How much earlier than the target the coarse sleep wakes up.
pub const SLEEP_MARGIN: Duration = Duration::from_micros(1_500);

/// Upper bound on one frame send before the frame is dropped.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(50);

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8000;

//! # SKELSTREAM
//!
//! Entry points behind the `pose_server` and `pose_probe` binaries.
//!
//! ## Usage
//!
//! ```bash
//! pose_server --config skelstream.toml
//! pose_server --bind 127.0.0.1:8000 --fps 60 --bones 24
//! pose_server --clip clips/walk.json --no-loop
//! pose_probe 127.0.0.1:8000 --frames 90
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cli;
pub mod probe;

use std::sync::Arc;

use skelstream_core::{Animator, ClipAnimator, MotionClip, ProceduralAnimator};
use skelstream_networking::{PoseServer, ServerConfig, ServerError, SourceConfig};

/// Installs the `tracing` subscriber, honouring `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Loads the configured source and serves until Ctrl-C.
///
/// # Errors
///
/// Returns [`ServerError`] if the source cannot be loaded or the address
/// cannot be bound. Nothing is served in that case.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    match config.source.clone() {
        SourceConfig::Procedural { bones } => {
            let mut animator = ProceduralAnimator::new(bones);
            animator.initialize("procedural")?;
            serve(config, animator).await
        }
        SourceConfig::Clip { path } => {
            let clip = MotionClip::load(&path)?;
            serve(config, ClipAnimator::from_clip(Arc::new(clip))).await
        }
    }
}

async fn serve<A: Animator + Clone>(config: ServerConfig, prototype: A) -> Result<(), ServerError> {
    let server = Arc::new(PoseServer::new(config, prototype)?);
    let listener = server.bind().await?;

    let stopper = Arc::clone(&server);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received");
                stopper.shutdown();
            }
            Err(e) => tracing::warn!(error = %e, "cannot listen for interrupt"),
        }
    });

    server.serve(listener).await
}

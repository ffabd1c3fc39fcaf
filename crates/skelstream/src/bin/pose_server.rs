//! # Pose Server
//!
//! Loads the motion source once and streams poses to every client.
//!
//! ## Usage
//!
//! ```bash
//! pose_server --config skelstream.toml
//! pose_server --bind 0.0.0.0:8000 --fps 30 --bones 50
//! RUST_LOG=skelstream_networking=debug pose_server --clip clips/walk.json
//! ```

use std::process::ExitCode;

use clap::Parser;
use skelstream::cli::ServerArgs;

#[tokio::main]
async fn main() -> ExitCode {
    skelstream::init_tracing();
    let args = ServerArgs::parse();

    let config = match args.resolve() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match skelstream::run_server(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server failed to start");
            ExitCode::FAILURE
        }
    }
}

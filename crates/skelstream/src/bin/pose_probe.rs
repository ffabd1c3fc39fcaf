//! # Pose Probe
//!
//! Connects to a pose server, receives a burst of frames and reports the
//! received rate.
//!
//! ```bash
//! pose_probe 127.0.0.1:8000 --frames 300
//! ```

use std::process::ExitCode;

use clap::Parser;
use skelstream::cli::ProbeArgs;
use skelstream::probe::probe;

#[tokio::main]
async fn main() -> ExitCode {
    skelstream::init_tracing();
    let args = ProbeArgs::parse();

    match probe(args.addr, args.frames).await {
        Ok(report) => {
            println!("┌─ POSE PROBE ──────────────────────────────────────┐");
            println!("│ Server:        {}", args.addr);
            println!("│ Bones:         {}", report.handshake.skeleton.bone_count());
            println!("│ Frame bytes:   {}", report.handshake.skeleton.frame_bytes);
            println!("│ Frames:        {}", report.frames);
            println!(
                "│ Rate:          {:.2} fps (nominal {})",
                report.frame_rate(),
                report.handshake.frame_rate
            );
            if let Some([x, y, z]) = report.root_translation {
                println!("│ Bone 0:        ({x:.4}, {y:.4}, {z:.4})");
            }
            println!("└───────────────────────────────────────────────────┘");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(addr = %args.addr, error = %e, "probe failed");
            ExitCode::FAILURE
        }
    }
}

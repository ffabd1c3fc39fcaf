//! Diagnostic client.
//!
//! Reads the handshake, then `frames` messages, and reports the received
//! rate and the root bone's last translation.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use skelstream_core::{BoneTransform, BONE_STRIDE};
use skelstream_networking::{FrameHeader, Handshake, TransportError};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

/// What one probe observed.
#[derive(Clone, Debug)]
pub struct ProbeReport {
    /// Handshake sent by the server.
    pub handshake: Handshake,
    /// Frames received.
    pub frames: u32,
    /// Time from the first to the last frame.
    pub span: Duration,
    /// Bone 0 translation in the last frame, if the skeleton has bones.
    pub root_translation: Option<[f32; 3]>,
}

impl ProbeReport {
    /// Frames per second between the first and last frame.
    #[must_use]
    pub fn frame_rate(&self) -> f64 {
        let secs = self.span.as_secs_f64();
        if self.frames < 2 || secs <= 0.0 {
            return 0.0;
        }
        f64::from(self.frames - 1) / secs
    }
}

/// Connects to `addr` and receives `frames` frames.
///
/// # Errors
///
/// Returns [`TransportError::Disconnected`] if the server closes early,
/// [`TransportError::Handshake`] on a malformed handshake or frame header,
/// and [`TransportError::Io`] on socket errors.
pub async fn probe(addr: SocketAddr, frames: u32) -> Result<ProbeReport, TransportError> {
    let mut stream = TcpStream::connect(addr).await?;
    let handshake = Handshake::read_from(&mut stream).await?;
    tracing::info!(
        %addr,
        bones = handshake.skeleton.bone_count(),
        frame_bytes = handshake.skeleton.frame_bytes,
        frame_rate = handshake.frame_rate,
        "handshake received"
    );

    let header_len = if handshake.frame_header { FrameHeader::SIZE } else { 0 };
    let mut message = vec![0u8; handshake.message_len()];
    let mut first_at = None;
    let mut last_at = Instant::now();

    for _ in 0..frames {
        match stream.read_exact(&mut message).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(TransportError::Disconnected),
            Err(e) => return Err(e.into()),
        }
        last_at = Instant::now();
        first_at.get_or_insert(last_at);

        if header_len > 0 && FrameHeader::from_bytes(&message).is_none() {
            return Err(TransportError::Handshake("frame header magic mismatch".into()));
        }
    }

    let payload = &message[header_len..];
    let root_translation = (frames > 0 && payload.len() >= BONE_STRIDE)
        .then(|| BoneTransform::read_from(payload).translation());

    Ok(ProbeReport {
        handshake,
        frames,
        span: first_at.map_or(Duration::ZERO, |first| last_at.duration_since(first)),
        root_translation,
    })
}

//! # Wire Protocol
//!
//! ## Handshake
//!
//! Sent once, right after accept:
//!
//! ```text
//! ┌──────────────┬──────────────────────────────┐
//! │ len: u32 LE  │ JSON Handshake (len bytes)   │
//! └──────────────┴──────────────────────────────┘
//! ```
//!
//! ## Frames
//!
//! Every following message is exactly `skeleton.frame_bytes` bytes of raw
//! little-endian `f32` matrices, optionally preceded by a [`FrameHeader`]
//! when the handshake says so.
//!
//! ```text
//! ┌─────────────┬───────────────┬────────────────┐
//! │ magic: u32  │ bone_count:u32│ schema: u32    │  12 bytes, LE
//! └─────────────┴───────────────┴────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use skelstream_core::SkeletonDescriptor;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::TransportError;

/// Frame header magic number.
pub const FRAME_MAGIC: u32 = 0xBADD_F00D;

/// Version of the frame layout.
pub const SCHEMA_VERSION: u32 = 1;

/// Largest handshake a client will accept.
pub const MAX_HANDSHAKE_LEN: usize = 1 << 20;

/// Optional per-frame header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// Always [`FRAME_MAGIC`].
    pub magic: u32,
    /// Bones in the following payload.
    pub bone_count: u32,
    /// Frame layout version.
    pub schema_version: u32,
}

impl FrameHeader {
    /// Encoded size in bytes.
    pub const SIZE: usize = 12;

    /// Header for a frame of `bone_count` bones.
    #[must_use]
    pub const fn new(bone_count: u32) -> Self {
        Self {
            magic: FRAME_MAGIC,
            bone_count,
            schema_version: SCHEMA_VERSION,
        }
    }

    /// Encodes as little-endian bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.bone_count.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.schema_version.to_le_bytes());
        bytes
    }

    /// Decodes from the first [`FrameHeader::SIZE`] bytes.
    ///
    /// Returns `None` if too short or the magic does not match.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let word = |i: usize| -> Option<u32> {
            let chunk: [u8; 4] = bytes.get(i..i + 4)?.try_into().ok()?;
            Some(u32::from_le_bytes(chunk))
        };

        let header = Self {
            magic: word(0)?,
            bone_count: word(4)?,
            schema_version: word(8)?,
        };
        (header.magic == FRAME_MAGIC).then_some(header)
    }
}

/// First message on every connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    /// Skeleton layout of every following frame.
    pub skeleton: SkeletonDescriptor,
    /// Nominal frames per second.
    pub frame_rate: u32,
    /// Whether frames carry a [`FrameHeader`].
    pub frame_header: bool,
    /// Frame layout version.
    pub schema_version: u32,
}

impl Handshake {
    /// Handshake for the given skeleton.
    #[must_use]
    pub fn new(skeleton: SkeletonDescriptor, frame_rate: u32, frame_header: bool) -> Self {
        Self {
            skeleton,
            frame_rate,
            frame_header,
            schema_version: SCHEMA_VERSION,
        }
    }

    /// Size of each frame message on the wire, header included.
    #[must_use]
    pub fn message_len(&self) -> usize {
        self.skeleton.frame_bytes + if self.frame_header { FrameHeader::SIZE } else { 0 }
    }

    /// Length-prefixed JSON encoding.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Handshake`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, TransportError> {
        let json = serde_json::to_vec(self).map_err(|e| TransportError::Handshake(e.to_string()))?;
        let len = u32::try_from(json.len())
            .map_err(|_| TransportError::Handshake(format!("handshake of {} bytes", json.len())))?;

        let mut message = Vec::with_capacity(4 + json.len());
        message.extend_from_slice(&len.to_le_bytes());
        message.extend_from_slice(&json);
        Ok(message)
    }

    /// Decodes a complete length-prefixed message.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Handshake`] on truncation or bad JSON.
    pub fn decode(message: &[u8]) -> Result<Self, TransportError> {
        let prefix: [u8; 4] = message
            .get(..4)
            .and_then(|p| p.try_into().ok())
            .ok_or_else(|| TransportError::Handshake("missing length prefix".into()))?;
        let len = u32::from_le_bytes(prefix) as usize;
        let body = message
            .get(4..4 + len)
            .ok_or_else(|| TransportError::Handshake(format!("truncated: need {len} bytes")))?;
        Self::from_json(body)
    }

    /// Reads one handshake from a stream.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Disconnected`] on EOF,
    /// [`TransportError::Io`] on socket errors, and
    /// [`TransportError::Handshake`] on an oversized or malformed message.
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self, TransportError> {
        let mut prefix = [0u8; 4];
        read_exact(reader, &mut prefix).await?;
        let len = u32::from_le_bytes(prefix) as usize;
        if len > MAX_HANDSHAKE_LEN {
            return Err(TransportError::Handshake(format!("{len} bytes exceeds limit")));
        }

        let mut body = vec![0u8; len];
        read_exact(reader, &mut body).await?;
        Self::from_json(&body)
    }

    fn from_json(body: &[u8]) -> Result<Self, TransportError> {
        let handshake: Self = serde_json::from_slice(body).map_err(|e| TransportError::Handshake(e.to_string()))?;
        if handshake.schema_version != SCHEMA_VERSION {
            return Err(TransportError::Handshake(format!(
                "unsupported schema version {}",
                handshake.schema_version
            )));
        }
        Ok(handshake)
    }
}

/// `read_exact` mapping EOF to [`TransportError::Disconnected`].
pub(crate) async fn read_exact<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Result<(), TransportError> {
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(TransportError::Disconnected),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skelstream_core::Skeleton;

    fn handshake() -> Handshake {
        Handshake::new(Skeleton::flat(3).descriptor(), 30, true)
    }

    #[test]
    fn test_header_layout() {
        let bytes = FrameHeader::new(50).to_bytes();
        assert_eq!(&bytes[0..4], &[0x0D, 0xF0, 0xDD, 0xBA]);
        assert_eq!(&bytes[4..8], &50u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &1u32.to_le_bytes());
        assert_eq!(FrameHeader::from_bytes(&bytes), Some(FrameHeader::new(50)));
    }

    #[test]
    fn test_header_rejects_garbage() {
        assert_eq!(FrameHeader::from_bytes(&[0u8; 12]), None);
        assert_eq!(FrameHeader::from_bytes(&FrameHeader::new(1).to_bytes()[..8]), None);
    }

    #[test]
    fn test_handshake_message() {
        let message = handshake().encode().unwrap();
        let len = u32::from_le_bytes(message[..4].try_into().unwrap()) as usize;
        assert_eq!(message.len(), 4 + len);

        let decoded = Handshake::decode(&message).unwrap();
        assert_eq!(decoded, handshake());
        assert_eq!(decoded.message_len(), 3 * 64 + FrameHeader::SIZE);
    }

    #[test]
    fn test_handshake_truncated() {
        let message = handshake().encode().unwrap();
        assert!(matches!(
            Handshake::decode(&message[..message.len() - 1]),
            Err(TransportError::Handshake(_))
        ));
        assert!(Handshake::decode(&message[..2]).is_err());
    }

    #[tokio::test]
    async fn test_read_from_stream() {
        let message = handshake().encode().unwrap();
        let mut reader = message.as_slice();
        assert_eq!(Handshake::read_from(&mut reader).await.unwrap(), handshake());

        let mut short = &message[..10];
        assert!(matches!(
            Handshake::read_from(&mut short).await,
            Err(TransportError::Disconnected)
        ));
    }
}

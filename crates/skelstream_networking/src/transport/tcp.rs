//! TCP frame transport.
//!
//! After the handshake the socket is split: a writer task drains the
//! mailbox, a reader task watches for the peer closing. Inbound bytes are
//! discarded.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use super::{FrameMailbox, FrameTransport, TransportCounters, TransportStats};
use crate::cancel::CancelHandle;
use crate::error::TransportError;
use crate::protocol::{FrameHeader, Handshake};

/// How long `close` lets the writer flush before aborting it.
const CLOSE_GRACE: Duration = Duration::from_millis(100);

/// Frame transport over one accepted TCP stream.
#[derive(Debug)]
pub struct TcpFrameTransport {
    mailbox: Arc<FrameMailbox>,
    counters: Arc<TransportCounters>,
    writer: Option<JoinHandle<()>>,
    reader: JoinHandle<()>,
}

impl TcpFrameTransport {
    /// Sends the handshake and starts the writer and reader tasks.
    ///
    /// `disconnect` is cancelled when the peer closes or a write fails.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the handshake cannot be written.
    pub async fn accept(
        stream: TcpStream,
        handshake: &Handshake,
        disconnect: CancelHandle,
    ) -> Result<Self, TransportError> {
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        let (read_half, mut write_half) = stream.into_split();

        write_half.write_all(&handshake.encode()?).await?;

        let prefix = if handshake.frame_header {
            let bone_count = u32::try_from(handshake.skeleton.bone_count())
                .map_err(|_| TransportError::Handshake("bone count exceeds u32".into()))?;
            FrameHeader::new(bone_count).to_bytes().to_vec()
        } else {
            Vec::new()
        };

        let mailbox = Arc::new(FrameMailbox::new(handshake.skeleton.frame_bytes, &prefix));
        let counters = Arc::new(TransportCounters::default());

        let writer = tokio::spawn(write_frames(
            write_half,
            Arc::clone(&mailbox),
            Arc::clone(&counters),
            disconnect.clone(),
        ));
        let reader = tokio::spawn(watch_peer(read_half, Arc::clone(&mailbox), disconnect));

        tracing::debug!(%peer, "transport established");
        Ok(Self {
            mailbox,
            counters,
            writer: Some(writer),
            reader,
        })
    }
}

async fn write_frames(
    mut socket: OwnedWriteHalf,
    mailbox: Arc<FrameMailbox>,
    counters: Arc<TransportCounters>,
    disconnect: CancelHandle,
) {
    let mut frame = mailbox.spare_buffer();
    while let Some(len) = mailbox.take(&mut frame).await {
        if let Err(e) = socket.write_all(&frame[..len]).await {
            counters.record_error();
            tracing::debug!(error = %e, "frame write failed");
            break;
        }
        counters.record_sent(len);
    }

    mailbox.close();
    disconnect.cancel();
    // Best effort FIN; the peer may already be gone.
    let _ = socket.shutdown().await;
}

async fn watch_peer(mut socket: OwnedReadHalf, mailbox: Arc<FrameMailbox>, disconnect: CancelHandle) {
    let mut scratch = [0u8; 256];
    loop {
        match socket.read(&mut scratch).await {
            Ok(0) => break,
            Ok(n) => tracing::trace!(bytes = n, "ignoring inbound bytes"),
            Err(e) => {
                tracing::debug!(error = %e, "peer read failed");
                break;
            }
        }
    }
    mailbox.close();
    disconnect.cancel();
}

impl FrameTransport for TcpFrameTransport {
    async fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if self.mailbox.post(frame)? {
            self.counters.record_dropped();
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.mailbox.is_closed()
    }

    async fn close(&mut self) {
        self.mailbox.close();
        self.reader.abort();

        if let Some(mut writer) = self.writer.take() {
            if tokio::time::timeout(CLOSE_GRACE, &mut writer).await.is_err() {
                writer.abort();
            }
        }
    }

    fn stats(&self) -> TransportStats {
        self.counters.snapshot()
    }
}

impl Drop for TcpFrameTransport {
    fn drop(&mut self) {
        self.mailbox.close();
        self.reader.abort();
        if let Some(writer) = &self.writer {
            writer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancel_pair;
    use skelstream_core::Skeleton;
    use tokio::net::TcpListener;

    async fn connected(frame_header: bool) -> (TcpFrameTransport, TcpStream, crate::CancelSignal) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server_side, _) = listener.accept().await.unwrap();

        let (handle, signal) = cancel_pair();
        let handshake = Handshake::new(Skeleton::flat(2).descriptor(), 30, frame_header);
        let transport = TcpFrameTransport::accept(server_side, &handshake, handle).await.unwrap();
        (transport, client, signal)
    }

    #[tokio::test]
    async fn test_handshake_then_frame() {
        let (mut transport, mut client, _signal) = connected(false).await;

        let handshake = Handshake::read_from(&mut client).await.unwrap();
        assert_eq!(handshake.skeleton.frame_bytes, 128);
        assert!(transport.is_open());

        transport.send_frame(&[7u8; 128]).await.unwrap();
        let mut frame = [0u8; 128];
        client.read_exact(&mut frame).await.unwrap();
        assert!(frame.iter().all(|&b| b == 7));
    }

    #[tokio::test]
    async fn test_frame_header_prefix() {
        let (mut transport, mut client, _signal) = connected(true).await;
        let handshake = Handshake::read_from(&mut client).await.unwrap();
        assert_eq!(handshake.message_len(), 140);

        transport.send_frame(&[1u8; 128]).await.unwrap();
        let mut message = [0u8; 140];
        client.read_exact(&mut message).await.unwrap();
        assert_eq!(FrameHeader::from_bytes(&message), Some(FrameHeader::new(2)));
        assert!(message[12..].iter().all(|&b| b == 1));
    }

    #[tokio::test]
    async fn test_peer_close_signals_disconnect() {
        let (mut transport, client, mut signal) = connected(false).await;
        drop(client);

        tokio::time::timeout(Duration::from_secs(2), signal.cancelled())
            .await
            .expect("disconnect observed");
        assert!(!transport.is_open());
        assert!(matches!(
            transport.send_frame(&[0u8; 128]).await,
            Err(TransportError::Disconnected)
        ));
        transport.close().await;
    }
}

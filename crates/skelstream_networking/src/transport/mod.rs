//! # Transport Layer
//!
//! Delivers one binary message per frame to one client.
//!
//! ## Design
//!
//! - `send_frame` never waits on the peer: the frame is copied into a
//!   single-slot [`FrameMailbox`] and a writer task drains it
//! - A newer frame replaces an unsent one (drop-oldest)
//! - Peer close is reported through the connection's cancel handle so the
//!   streaming loop's pacing wait wakes up

mod mailbox;
mod tcp;

pub use mailbox::FrameMailbox;
pub use tcp::TcpFrameTransport;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::TransportError;

/// One-way frame channel to a single client.
pub trait FrameTransport: Send {
    /// Hands one complete frame to the transport.
    ///
    /// Must not block on the peer for longer than it takes to copy the
    /// frame. The bytes are copied before this resolves, so the caller may
    /// overwrite its buffer right after.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Disconnected`] once the peer is gone; any
    /// other error is a transport failure.
    fn send_frame(&mut self, frame: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Whether the peer is still reachable.
    fn is_open(&self) -> bool;

    /// Closes the channel. Idempotent.
    fn close(&mut self) -> impl Future<Output = ()> + Send;

    /// Delivery counters.
    fn stats(&self) -> TransportStats;
}

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Frames written to the socket.
    pub frames_sent: u64,
    /// Bytes written to the socket.
    pub bytes_sent: u64,
    /// Frames replaced before they were written.
    pub frames_dropped: u64,
    /// Failed socket writes.
    pub send_errors: u64,
}

/// Lock-free counters shared between a transport and its writer task.
#[derive(Debug, Default)]
pub(crate) struct TransportCounters {
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
    frames_dropped: AtomicU64,
    send_errors: AtomicU64,
}

impl TransportCounters {
    pub(crate) fn record_sent(&self, bytes: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> TransportStats {
        TransportStats {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
        }
    }
}

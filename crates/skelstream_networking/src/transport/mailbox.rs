//! Single-slot, drop-oldest frame hand-off.
//!
//! The producer copies into a preallocated slot; the consumer swaps the slot
//! with its own spare buffer. Neither side allocates after construction.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::TransportError;

#[derive(Debug)]
struct Slot {
    /// `prefix` followed by room for one frame.
    frame: Vec<u8>,
    len: usize,
    full: bool,
}

/// Holds at most one pending frame.
#[derive(Debug)]
pub struct FrameMailbox {
    slot: Mutex<Slot>,
    ready: Notify,
    closed: AtomicBool,
    prefix: Vec<u8>,
    capacity: usize,
}

impl FrameMailbox {
    /// Mailbox for frames of up to `capacity` bytes, each delivered behind
    /// the fixed `prefix`.
    #[must_use]
    pub fn new(capacity: usize, prefix: &[u8]) -> Self {
        let prefix = prefix.to_vec();
        Self {
            slot: Mutex::new(Slot {
                frame: Self::buffer(&prefix, capacity),
                len: 0,
                full: false,
            }),
            ready: Notify::new(),
            closed: AtomicBool::new(false),
            prefix,
            capacity,
        }
    }

    fn buffer(prefix: &[u8], capacity: usize) -> Vec<u8> {
        let mut buffer = vec![0u8; prefix.len() + capacity];
        buffer[..prefix.len()].copy_from_slice(prefix);
        buffer
    }

    /// Consumer-side buffer to pass to [`FrameMailbox::take`].
    #[must_use]
    pub fn spare_buffer(&self) -> Vec<u8> {
        Self::buffer(&self.prefix, self.capacity)
    }

    /// Stores a copy of `frame`, replacing any unsent one.
    ///
    /// Returns `true` if an unsent frame was replaced.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Disconnected`] after `close`, and
    /// [`TransportError::FrameTooLarge`] if `frame` exceeds the capacity.
    pub fn post(&self, frame: &[u8]) -> Result<bool, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Disconnected);
        }
        if frame.len() > self.capacity {
            return Err(TransportError::FrameTooLarge {
                len: frame.len(),
                capacity: self.capacity,
            });
        }

        let start = self.prefix.len();
        let superseded = {
            let mut slot = self.slot.lock();
            slot.frame[start..start + frame.len()].copy_from_slice(frame);
            slot.len = start + frame.len();
            std::mem::replace(&mut slot.full, true)
        };
        self.ready.notify_one();
        Ok(superseded)
    }

    /// Waits for the next frame and swaps it into `spare`.
    ///
    /// `spare` must come from [`FrameMailbox::spare_buffer`]. Returns the
    /// message length (prefix included), or `None` once closed.
    pub async fn take(&self, spare: &mut Vec<u8>) -> Option<usize> {
        loop {
            if self.is_closed() {
                return None;
            }
            {
                let mut slot = self.slot.lock();
                if slot.full {
                    slot.full = false;
                    std::mem::swap(&mut slot.frame, spare);
                    return Some(slot.len);
                }
            }
            self.ready.notified().await;
        }
    }

    /// Closes the mailbox and wakes the consumer. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.ready.notify_one();
        }
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
